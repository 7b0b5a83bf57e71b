mod memory;
mod postgres;
mod rest;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use rest::RestStore;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::Backend,
    error::{StoreError, StoreResult},
};

/// Shared handle to whichever remote store the service was configured with.
pub type Database = Arc<dyn DataStore>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    UserSubscriptions,
    SubscriptionPlans,
    Session,
    ChatSessions,
    Messages,
    Leads,
    LeadConfirmations,
    PaymentHistory,
    ContactForm,
    ChatbotClients,
    ChatbotUsage,
    CrawlRecords,
}

impl Table {
    pub const ALL: [Table; 13] = [
        Table::Users,
        Table::UserSubscriptions,
        Table::SubscriptionPlans,
        Table::Session,
        Table::ChatSessions,
        Table::Messages,
        Table::Leads,
        Table::LeadConfirmations,
        Table::PaymentHistory,
        Table::ContactForm,
        Table::ChatbotClients,
        Table::ChatbotUsage,
        Table::CrawlRecords,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::UserSubscriptions => "user_subscriptions",
            Table::SubscriptionPlans => "subscription_plans",
            Table::Session => "session",
            Table::ChatSessions => "chat_sessions",
            Table::Messages => "messages",
            Table::Leads => "leads",
            Table::LeadConfirmations => "lead_confirmations",
            Table::PaymentHistory => "payment_history",
            Table::ContactForm => "contact_form",
            Table::ChatbotClients => "chatbot_clients",
            Table::ChatbotUsage => "chatbot_usage",
            Table::CrawlRecords => "crawl_records",
        }
    }

    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    In(String, Vec<String>),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::In(column, _) => column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// A table-scoped read: projection, filters, ordering and an optional row cap.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: Table) -> Self {
        Self {
            table,
            columns: Vec::new(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty() && c != "*")
            .collect();
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.to_string()));
        self
    }

    pub fn is_in<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.filters.push(Filter::In(column.to_string(), values));
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait DataStore: Send + Sync {
    async fn select(&self, query: &Query) -> StoreResult<Vec<Value>>;

    /// Exact number of rows matching the query's filters.
    async fn count(&self, query: &Query) -> StoreResult<u64>;

    /// Sets `values` on every row matching `filters`, returning the rows touched.
    async fn update(&self, table: Table, values: Value, filters: &[Filter]) -> StoreResult<u64>;

    async fn upsert(&self, table: Table, rows: Vec<Value>, on_conflict: &str) -> StoreResult<()>;
}

pub async fn fetch_as<T: DeserializeOwned>(db: &dyn DataStore, query: &Query) -> StoreResult<Vec<T>> {
    db.select(query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(StoreError::from))
        .collect()
}

pub async fn connect(backend: &Backend) -> StoreResult<Database> {
    let db: Database = match backend {
        Backend::Rest { url, api_key } => Arc::new(RestStore::new(url, api_key)?),
        Backend::Postgres { database_url } => Arc::new(PgStore::connect(database_url).await?),
        Backend::Memory { seed_file } => match seed_file {
            Some(path) => Arc::new(MemoryStore::from_seed_file(path)?),
            None => Arc::new(MemoryStore::new()),
        },
    };
    Ok(db)
}

/// Identifiers are interpolated into URLs and SQL, so only plain names pass.
pub(crate) fn validate_identifier(name: &str) -> StoreResult<&str> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidQuery(format!("invalid identifier '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_star_means_all_columns() {
        let query = Query::table(Table::Users).select("*");
        assert!(query.columns.is_empty());

        let query = Query::table(Table::Users).select("id, name ,email");
        assert_eq!(query.columns, vec!["id", "name", "email"]);
    }

    #[test]
    fn table_names_round_trip() {
        for table in Table::ALL {
            assert_eq!(Table::from_name(table.as_str()), Some(table));
        }
        assert_eq!(Table::from_name("nope"), None);
    }

    #[test]
    fn identifiers_reject_injection() {
        assert!(validate_identifier("user_id").is_ok());
        assert!(validate_identifier("id; drop table users").is_err());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("").is_err());
    }
}
