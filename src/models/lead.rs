use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub lead_score: Option<f64>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Lead {
    /// Score counted towards averages: present and non-zero.
    pub fn scored(&self) -> Option<f64> {
        self.lead_score.filter(|score| *score != 0.0 && score.is_finite())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadConfirmation {
    pub session_id: Uuid,
    #[serde(default)]
    pub potential_name: Option<String>,
    #[serde(default)]
    pub confirmed: bool,
}
