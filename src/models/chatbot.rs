use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotClient {
    pub id: Uuid,
    pub client_id: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub calendly_link: Option<String>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotUsage {
    pub id: Uuid,
    pub client_id: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub session_count: i64,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub last_active: Option<DateTime<Utc>>,
}

/// Widget conversation, keyed to a client through `chatbot_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    #[serde(default)]
    pub chatbot_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_bot: Option<bool>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
}
