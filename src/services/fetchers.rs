//! One fetcher per table. Every fetcher logs its failure and hands it back,
//! so callers can tell "no rows" apart from "could not load".

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{
    database::{fetch_as, DataStore, Direction, Query, Table},
    error::StoreResult,
    models::{
        ChatSession, ChatbotClient, ChatbotUsage, ContactSubmission, CrawlRecord, Lead,
        LeadConfirmation, Message, Payment, Session, SubscriptionPlan, User, UserSubscription,
    },
};

async fn load<T: DeserializeOwned>(db: &dyn DataStore, query: Query, what: &str) -> StoreResult<Vec<T>> {
    match fetch_as(db, &query).await {
        Ok(rows) => {
            log::debug!("{}: {} records found", what, rows.len());
            Ok(rows)
        }
        Err(e) => {
            log::error!("Error fetching {}: {}", what, e);
            Err(e)
        }
    }
}

pub async fn fetch_chatbot_clients(db: &dyn DataStore) -> StoreResult<Vec<ChatbotClient>> {
    let query = Query::table(Table::ChatbotClients).order("created_at", Direction::Desc);
    load(db, query, "clients").await
}

pub async fn fetch_chatbot_usage(db: &dyn DataStore) -> StoreResult<Vec<ChatbotUsage>> {
    let query = Query::table(Table::ChatbotUsage).order("last_active", Direction::Desc);
    load(db, query, "usage").await
}

pub async fn fetch_payment_history(db: &dyn DataStore) -> StoreResult<Vec<Payment>> {
    let query = Query::table(Table::PaymentHistory).order("payment_date", Direction::Desc);
    load(db, query, "payments").await
}

pub async fn fetch_subscription_plans(db: &dyn DataStore) -> StoreResult<Vec<SubscriptionPlan>> {
    let query = Query::table(Table::SubscriptionPlans).order("monthly_price", Direction::Asc);
    load(db, query, "plans").await
}

/// Newest chat sessions first; `limit` caps the feed, `None` loads everything.
pub async fn fetch_chat_sessions(db: &dyn DataStore, limit: Option<usize>) -> StoreResult<Vec<ChatSession>> {
    let mut query = Query::table(Table::ChatSessions).order("started_at", Direction::Desc);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    load(db, query, "chat sessions").await
}

pub async fn fetch_messages(db: &dyn DataStore, limit: Option<usize>) -> StoreResult<Vec<Message>> {
    let mut query = Query::table(Table::Messages).order("sent_at", Direction::Desc);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    load(db, query, "messages").await
}

pub async fn fetch_leads(db: &dyn DataStore) -> StoreResult<Vec<Lead>> {
    let query = Query::table(Table::Leads).order("created_at", Direction::Desc);
    load(db, query, "leads").await
}

pub async fn fetch_contact_forms(db: &dyn DataStore) -> StoreResult<Vec<ContactSubmission>> {
    let query = Query::table(Table::ContactForm).order("created_at", Direction::Desc);
    load(db, query, "contact forms").await
}

pub async fn fetch_users(db: &dyn DataStore) -> StoreResult<Vec<User>> {
    let query = Query::table(Table::Users).order("created_at", Direction::Desc);
    load(db, query, "users").await
}

pub async fn fetch_user_subscriptions(db: &dyn DataStore) -> StoreResult<Vec<UserSubscription>> {
    let query = Query::table(Table::UserSubscriptions).order("created_at", Direction::Desc);
    load(db, query, "subscriptions").await
}

pub async fn fetch_sessions(db: &dyn DataStore) -> StoreResult<Vec<Session>> {
    let query = Query::table(Table::Session).order("last_active", Direction::Desc);
    load(db, query, "sessions").await
}

pub async fn fetch_confirmed_leads(db: &dyn DataStore) -> StoreResult<Vec<LeadConfirmation>> {
    let query = Query::table(Table::LeadConfirmations)
        .select("session_id, potential_name, confirmed")
        .eq("confirmed", true);
    load(db, query, "lead confirmations").await
}

pub async fn fetch_crawl_records(db: &dyn DataStore, user_ids: &[Uuid]) -> StoreResult<Vec<CrawlRecord>> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }
    let query = Query::table(Table::CrawlRecords)
        .select("id, user_id, url")
        .is_in("user_id", user_ids);
    load(db, query, "crawl records").await
}

/// Any one session of the user; status toggles hang the confirmation off it.
pub async fn fetch_session_for_user(db: &dyn DataStore, user_id: Uuid) -> StoreResult<Option<Session>> {
    let query = Query::table(Table::Session).eq("user_id", user_id).limit(1);
    Ok(load(db, query, "user session").await?.into_iter().next())
}

pub async fn count_users(db: &dyn DataStore) -> StoreResult<u64> {
    db.count(&Query::table(Table::Users)).await.map_err(|e| {
        log::error!("Error counting users: {}", e);
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn plans_are_ordered_by_price() {
        let store = MemoryStore::new().with_rows(
            Table::SubscriptionPlans,
            vec![
                json!({"id": "00000000-0000-4000-8000-000000000002", "name": "Pro", "monthly_price": 99}),
                json!({"id": "00000000-0000-4000-8000-000000000001", "name": "Starter", "monthly_price": 19.5}),
            ],
        );
        let plans = fetch_subscription_plans(&store).await.unwrap();
        let names: Vec<&str> = plans.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Starter", "Pro"]);
    }

    #[tokio::test]
    async fn recent_messages_respect_the_cap() {
        let rows = (0..5)
            .map(|i| {
                json!({
                    "id": format!("00000000-0000-4000-8000-00000000000{}", i),
                    "session_id": "00000000-0000-4000-8000-0000000000aa",
                    "sent_at": format!("2024-01-0{}T00:00:00Z", i + 1),
                })
            })
            .collect();
        let store = MemoryStore::new().with_rows(Table::Messages, rows);

        let recent = fetch_messages(&store, Some(2)).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id.to_string(), "00000000-0000-4000-8000-000000000004");
        assert_eq!(fetch_messages(&store, None).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn failure_is_reported_not_swallowed() {
        let store = MemoryStore::new().failing_on(Table::ContactForm);
        assert!(fetch_contact_forms(&store).await.is_err());
    }

    #[tokio::test]
    async fn missing_table_is_an_empty_success() {
        let store = MemoryStore::new();
        assert!(fetch_contact_forms(&store).await.unwrap().is_empty());
        assert_eq!(count_users(&store).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn only_confirmed_leads_are_loaded() {
        let store = MemoryStore::new().with_rows(
            Table::LeadConfirmations,
            vec![
                json!({"session_id": "00000000-0000-4000-8000-000000000001", "confirmed": true}),
                json!({"session_id": "00000000-0000-4000-8000-000000000002", "confirmed": false}),
            ],
        );
        let confirmed = fetch_confirmed_leads(&store).await.unwrap();
        assert_eq!(confirmed.len(), 1);
        assert!(confirmed[0].confirmed);
    }
}
