use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp;

pub const PAYMENT_SUCCEEDED: &str = "succeeded";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    #[serde(default)]
    pub plan_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub monthly_price: Option<Decimal>,
    #[serde(default)]
    pub yearly_price: Option<Decimal>,
    #[serde(default)]
    pub message_limit: Option<i64>,
    #[serde(default)]
    pub document_limit: Option<i64>,
    #[serde(default)]
    pub lead_scoring_tier: Option<String>,
    #[serde(default)]
    pub report_frequency: Option<String>,
    #[serde(default)]
    pub support_tier: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub subscription_id: Option<Uuid>,
    #[serde(default)]
    pub stripe_invoice_id: Option<String>,
    #[serde(default)]
    pub amount: Decimal,
    pub status: String,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn succeeded(&self) -> bool {
        self.status == PAYMENT_SUCCEEDED
    }

    /// When the money moved; falls back to the row's creation time.
    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.payment_date.or(self.created_at)
    }
}
