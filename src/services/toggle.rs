use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    database::{DataStore, Filter, Table},
    error::StoreError,
    models::{SUBSCRIPTION_ACTIVE, SUBSCRIPTION_INACTIVE},
    services::{
        fetchers,
        stats::{AccountStatus, SubscriberRow, UserStats},
    },
};

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("no session found for user")]
    NoSession,

    #[error("no subscription found for user")]
    NoSubscription,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Flips a subscriber's confirmation flag, stored on one of the user's sessions.
pub async fn toggle_confirmation(db: &dyn DataStore, row: &SubscriberRow) -> Result<AccountStatus, ToggleError> {
    let session = fetchers::fetch_session_for_user(db, row.id)
        .await?
        .ok_or(ToggleError::NoSession)?;
    let next = row.status.toggled();

    db.upsert(
        Table::LeadConfirmations,
        vec![json!({
            "session_id": session.id,
            "potential_name": row.name,
            "confirmed": next.is_active(),
        })],
        "session_id",
    )
    .await?;

    log::info!("Subscriber {} is now {}", row.id, next.label());
    Ok(next)
}

/// Sets every subscription of the user to active or inactive; returns the new state.
pub async fn toggle_subscription(db: &dyn DataStore, user_id: Uuid, currently_active: bool) -> Result<bool, ToggleError> {
    let status = if currently_active {
        SUBSCRIPTION_INACTIVE
    } else {
        SUBSCRIPTION_ACTIVE
    };
    let touched = db
        .update(
            Table::UserSubscriptions,
            json!({ "status": status }),
            &[Filter::Eq("user_id".to_string(), user_id.to_string())],
        )
        .await?;
    if touched == 0 {
        return Err(ToggleError::NoSubscription);
    }

    log::info!("Subscription for user {} set to {}", user_id, status);
    Ok(!currently_active)
}

/// Rows that carry an on/off state keyed by user.
pub trait HasStatus {
    fn user_id(&self) -> Uuid;
    fn set_active(&mut self, active: bool);
}

impl HasStatus for SubscriberRow {
    fn user_id(&self) -> Uuid {
        self.id
    }

    fn set_active(&mut self, active: bool) {
        self.status = if active {
            AccountStatus::Active
        } else {
            AccountStatus::Disabled
        };
    }
}

impl HasStatus for UserStats {
    fn user_id(&self) -> Uuid {
        self.user_id
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

/// Updates only the row for `user_id`; returns whether one was found.
pub fn apply_status<T: HasStatus>(rows: &mut [T], user_id: Uuid, active: bool) -> bool {
    match rows.iter_mut().find(|row| row.user_id() == user_id) {
        Some(row) => {
            row.set_active(active);
            true
        }
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient message shown above a table after a toggle.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: "Success".to_string(),
            description: description.into(),
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: "Error".to_string(),
            description: description.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::services::stats::{subscriber_rows, SubscriberSnapshot};
    use crate::models::User;

    const ALICE: &str = "00000000-0000-4000-8000-000000000001";
    const BOB: &str = "00000000-0000-4000-8000-000000000002";
    const ALICE_SESSION: &str = "00000000-0000-4000-8000-0000000000a1";

    fn rows() -> Vec<SubscriberRow> {
        let users: Vec<User> = serde_json::from_value(json!([
            {"id": ALICE, "name": "Alice"},
            {"id": BOB, "name": "Bob"},
        ]))
        .unwrap();
        subscriber_rows(&SubscriberSnapshot {
            users,
            ..Default::default()
        })
    }

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_rows(Table::Session, vec![json!({"id": ALICE_SESSION, "user_id": ALICE})])
            .with_rows(
                Table::UserSubscriptions,
                vec![json!({"id": "00000000-0000-4000-8000-0000000000b1", "user_id": ALICE, "status": "active"})],
            )
    }

    #[tokio::test]
    async fn confirmation_toggle_flips_only_that_row() {
        let store = store();
        let mut rows = rows();
        assert_eq!(rows[0].status, AccountStatus::Disabled);

        let next = toggle_confirmation(&store, &rows[0]).await.unwrap();
        assert_eq!(next, AccountStatus::Active);
        let alice = rows[0].id;
        assert!(apply_status(&mut rows, alice, next.is_active()));

        assert_eq!(rows[0].status, AccountStatus::Active);
        assert_eq!(rows[1].status, AccountStatus::Disabled);

        let saved = store.rows(Table::LeadConfirmations).await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0]["session_id"], ALICE_SESSION);
        assert_eq!(saved[0]["confirmed"], true);

        // Toggling back rewrites the same confirmation row.
        let back = toggle_confirmation(&store, &rows[0]).await.unwrap();
        assert_eq!(back, AccountStatus::Disabled);
        let saved = store.rows(Table::LeadConfirmations).await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0]["confirmed"], false);
    }

    #[tokio::test]
    async fn user_without_session_cannot_be_toggled() {
        let store = store();
        let rows = rows();
        let err = toggle_confirmation(&store, &rows[1]).await.unwrap_err();
        assert!(matches!(err, ToggleError::NoSession));
        assert_eq!(rows[1].status, AccountStatus::Disabled);
    }

    #[tokio::test]
    async fn failed_write_leaves_status_unchanged() {
        let store = store().failing_on(Table::LeadConfirmations);
        let rows = rows();
        let before: Vec<AccountStatus> = rows.iter().map(|r| r.status).collect();

        assert!(matches!(
            toggle_confirmation(&store, &rows[0]).await,
            Err(ToggleError::Store(_))
        ));
        let after: Vec<AccountStatus> = rows.iter().map(|r| r.status).collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn subscription_toggle_updates_status_column() {
        let store = store();
        let alice = Uuid::parse_str(ALICE).unwrap();

        assert!(!toggle_subscription(&store, alice, true).await.unwrap());
        assert_eq!(store.rows(Table::UserSubscriptions).await[0]["status"], "inactive");

        assert!(toggle_subscription(&store, alice, false).await.unwrap());
        assert_eq!(store.rows(Table::UserSubscriptions).await[0]["status"], "active");

        let bob = Uuid::parse_str(BOB).unwrap();
        assert!(matches!(
            toggle_subscription(&store, bob, true).await,
            Err(ToggleError::NoSubscription)
        ));
    }

    #[test]
    fn apply_status_ignores_unknown_users() {
        let mut rows = rows();
        assert!(!apply_status(&mut rows, Uuid::nil(), true));
        assert!(rows.iter().all(|r| r.status == AccountStatus::Disabled));
    }
}
