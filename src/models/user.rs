use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::timestamp;

pub const SUBSCRIPTION_ACTIVE: &str = "active";
pub const SUBSCRIPTION_INACTIVE: &str = "inactive";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Display name, falling back to a short id when the profile has none.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("User {}", &self.id.simple().to_string()[..8]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSubscription {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub plan_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub billing_cycle: Option<String>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserSubscription {
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case(SUBSCRIPTION_ACTIVE))
    }
}

/// Row of the `session` table: one visitor conversation owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub last_active: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Crawled website for a user's chatbot; the newest one is the user's site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRecord {
    pub id: i64,
    pub user_id: Uuid,
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_name_falls_back_to_short_id() {
        let user: User = serde_json::from_value(json!({
            "id": "3f2b8c1e-0000-4000-8000-000000000000",
            "name": "  ",
        }))
        .unwrap();
        assert_eq!(user.display_name(), "User 3f2b8c1e");
    }

    #[test]
    fn subscription_status_is_case_insensitive() {
        let sub: UserSubscription = serde_json::from_value(json!({
            "id": "00000000-0000-4000-8000-000000000001",
            "user_id": "00000000-0000-4000-8000-000000000002",
            "status": "Active",
            "created_at": null,
        }))
        .unwrap();
        assert!(sub.is_active());
        assert!(sub.plan_id.is_none());
    }

    #[test]
    fn unowned_rows_still_decode() {
        let session: Session = serde_json::from_value(json!({
            "id": "00000000-0000-4000-8000-0000000000f1",
            "user_id": null,
        }))
        .unwrap();
        assert!(session.user_id.is_none());

        let sub: UserSubscription = serde_json::from_value(json!({
            "id": "00000000-0000-4000-8000-000000000001",
            "user_id": null,
            "status": null,
        }))
        .unwrap();
        assert!(sub.user_id.is_none());
        assert!(!sub.is_active());
    }
}
