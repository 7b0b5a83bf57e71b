use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub how_can_we_help: Option<String>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

// Template-friendly display version
#[derive(Debug, Clone, Serialize)]
pub struct ContactSubmissionDisplay {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone_number: String,
    pub message: String,
    pub submitted_at: String,
    pub updated_at: String,
}

fn long_date(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|d| d.format("%B %d, %Y at %I:%M %p").to_string())
        .unwrap_or_default()
}

impl From<ContactSubmission> for ContactSubmissionDisplay {
    fn from(submission: ContactSubmission) -> Self {
        Self {
            id: submission.id,
            name: submission.name.unwrap_or_default(),
            email: submission.email.unwrap_or_default(),
            company: submission.company.unwrap_or_default(),
            phone_number: submission.phone_number.unwrap_or_default(),
            message: submission.how_can_we_help.unwrap_or_default(),
            submitted_at: long_date(submission.created_at),
            updated_at: long_date(submission.updated_at),
        }
    }
}
