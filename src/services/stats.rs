//! Per-entity reports built by joining independently fetched table snapshots
//! in memory. Each dependent table is indexed by its foreign key once, so a
//! report costs O(entities + dependent rows).

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    database::DataStore,
    error::StoreResult,
    models::{
        ChatSession, ChatbotClient, ChatbotUsage, CrawlRecord, Lead, LeadConfirmation, Message,
        Payment, Session, SubscriptionPlan, User, UserSubscription,
    },
    services::fetchers,
    utils::Searchable,
};

/// Groups borrowed rows under their foreign key; rows without one are left out.
pub fn index_by<'a, K, T, F>(rows: &'a [T], key: F) -> HashMap<K, Vec<&'a T>>
where
    K: Eq + Hash,
    F: Fn(&T) -> Option<K>,
{
    let mut index: HashMap<K, Vec<&'a T>> = HashMap::new();
    for row in rows {
        if let Some(k) = key(row) {
            index.entry(k).or_default().push(row);
        }
    }
    index
}

fn rows_for<'i, 'a, K: Eq + Hash, T>(index: &'i HashMap<K, Vec<&'a T>>, key: Option<&K>) -> &'i [&'a T] {
    key.and_then(|k| index.get(k)).map(Vec::as_slice).unwrap_or(&[])
}

/// Sum of succeeded payment amounts; every other status is ignored.
pub fn total_revenue<'a>(payments: impl IntoIterator<Item = &'a Payment>) -> Decimal {
    payments
        .into_iter()
        .filter(|p| p.succeeded())
        .map(|p| p.amount)
        .sum()
}

/// Mean over scored leads only (null and zero scores don't count), 0 when none are scored.
pub fn average_lead_score<'a>(leads: impl IntoIterator<Item = &'a Lead>) -> f64 {
    let (sum, count) = leads
        .into_iter()
        .filter_map(Lead::scored)
        .fold((0.0, 0usize), |(sum, count), score| (sum + score, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub fn latest(timestamps: impl IntoIterator<Item = Option<DateTime<Utc>>>) -> Option<DateTime<Utc>> {
    timestamps.into_iter().flatten().max()
}

// ---------------------------------------------------------------------------
// Client stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ClientStats {
    pub client: ChatbotClient,
    pub usage: Vec<ChatbotUsage>,
    pub total_sessions: i64,
    pub payments: Vec<Payment>,
    pub total_revenue: Decimal,
    pub sessions: Vec<ChatSession>,
    pub message_count: usize,
    pub leads: usize,
    pub lead_score: f64,
    pub last_active: Option<DateTime<Utc>>,
}

impl Searchable for ClientStats {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.client.client_id.as_str(),
            self.client.namespace.as_deref().unwrap_or(""),
        ]
    }
}

pub fn client_stats(
    clients: &[ChatbotClient],
    usage: &[ChatbotUsage],
    payments: &[Payment],
    sessions: &[ChatSession],
    leads: &[Lead],
) -> Vec<ClientStats> {
    let usage_by_client = index_by(usage, |u| Some(u.client_id.clone()));
    let payments_by_user = index_by(payments, |p| p.user_id);
    let sessions_by_client = index_by(sessions, |s| s.chatbot_id.clone());
    let leads_by_user = index_by(leads, |l| l.user_id);

    clients
        .iter()
        .map(|client| {
            let client_usage = rows_for(&usage_by_client, Some(&client.client_id));
            let client_payments = rows_for(&payments_by_user, client.user_id.as_ref());
            let client_sessions = rows_for(&sessions_by_client, Some(&client.client_id));
            let client_leads = rows_for(&leads_by_user, client.user_id.as_ref());

            ClientStats {
                client: client.clone(),
                usage: client_usage.iter().map(|u| (*u).clone()).collect(),
                total_sessions: client_usage.iter().map(|u| u.session_count).sum(),
                payments: client_payments.iter().map(|p| (*p).clone()).collect(),
                total_revenue: total_revenue(client_payments.iter().copied()),
                sessions: client_sessions.iter().map(|s| (*s).clone()).collect(),
                message_count: client_sessions.len(),
                leads: client_leads.len(),
                lead_score: average_lead_score(client_leads.iter().copied()),
                last_active: latest(client_usage.iter().map(|u| u.last_active)),
            }
        })
        .collect()
}

pub async fn load_client_stats(db: &dyn DataStore) -> StoreResult<Vec<ClientStats>> {
    let (clients, usage, payments, sessions, leads) = tokio::try_join!(
        fetchers::fetch_chatbot_clients(db),
        fetchers::fetch_chatbot_usage(db),
        fetchers::fetch_payment_history(db),
        fetchers::fetch_chat_sessions(db, None),
        fetchers::fetch_leads(db),
    )?;
    let stats = client_stats(&clients, &usage, &payments, &sessions, &leads);
    log::info!("Client stats compiled for {} clients", stats.len());
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Paying-user stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserScope {
    /// Users holding at least one active subscription.
    ActiveSubscriptions,
    /// Users with any subscription row, so disabled ones can be re-enabled.
    AnySubscription,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub plan_name: Option<String>,
    pub active: bool,
    pub signed_up: Option<DateTime<Utc>>,
    pub session_count: usize,
    pub message_count: usize,
    pub total_revenue: Decimal,
    pub lead_count: usize,
    pub avg_lead_score: f64,
    pub last_active: Option<DateTime<Utc>>,
}

impl Searchable for UserStats {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.email.as_str(),
            self.plan_name.as_deref().unwrap_or(""),
        ]
    }
}

/// Maps a session id to its owning user; unowned sessions are left out.
fn session_owners(sessions: &[Session]) -> HashMap<Uuid, Uuid> {
    sessions
        .iter()
        .filter_map(|s| s.user_id.map(|owner| (s.id, owner)))
        .collect()
}

/// A lead belongs to its `user_id`, or else to the owner of its session.
fn lead_owner(lead: &Lead, owners: &HashMap<Uuid, Uuid>) -> Option<Uuid> {
    lead.user_id
        .or_else(|| lead.session_id.and_then(|sid| owners.get(&sid).copied()))
}

#[allow(clippy::too_many_arguments)]
pub fn user_stats(
    users: &[User],
    subscriptions: &[UserSubscription],
    plans: &[SubscriptionPlan],
    sessions: &[Session],
    messages: &[Message],
    payments: &[Payment],
    leads: &[Lead],
    scope: UserScope,
) -> Vec<UserStats> {
    let plan_names: HashMap<Uuid, &str> = plans.iter().map(|p| (p.id, p.name.as_str())).collect();
    let subs_by_user = index_by(subscriptions, |s| s.user_id);
    let sessions_by_user = index_by(sessions, |s| s.user_id);
    let payments_by_user = index_by(payments, |p| p.user_id);
    let owners = session_owners(sessions);
    let messages_by_user = index_by(messages, |m| owners.get(&m.session_id).copied());
    let leads_by_user = index_by(leads, |l| lead_owner(l, &owners));

    users
        .iter()
        .filter_map(|user| {
            let subs = rows_for(&subs_by_user, Some(&user.id));
            let active_sub = subs.iter().find(|s| s.is_active());
            let included = match scope {
                UserScope::ActiveSubscriptions => active_sub.is_some(),
                UserScope::AnySubscription => !subs.is_empty(),
            };
            if !included {
                return None;
            }

            let current = active_sub.or_else(|| subs.first());
            let plan_name = current
                .and_then(|s| s.plan_id)
                .and_then(|id| plan_names.get(&id))
                .map(|name| name.to_string());
            let user_sessions = rows_for(&sessions_by_user, Some(&user.id));
            let user_leads = rows_for(&leads_by_user, Some(&user.id));

            Some(UserStats {
                user_id: user.id,
                name: user.display_name(),
                email: user.email.clone().unwrap_or_default(),
                plan_name,
                active: active_sub.is_some(),
                signed_up: user.created_at,
                session_count: user_sessions.len(),
                message_count: rows_for(&messages_by_user, Some(&user.id)).len(),
                total_revenue: total_revenue(rows_for(&payments_by_user, Some(&user.id)).iter().copied()),
                lead_count: user_leads.len(),
                avg_lead_score: average_lead_score(user_leads.iter().copied()),
                last_active: latest(user_sessions.iter().map(|s| s.last_active)),
            })
        })
        .collect()
}

pub async fn load_user_stats(db: &dyn DataStore, scope: UserScope) -> StoreResult<Vec<UserStats>> {
    let (users, subscriptions, plans, sessions, messages, payments, leads) = tokio::try_join!(
        fetchers::fetch_users(db),
        fetchers::fetch_user_subscriptions(db),
        fetchers::fetch_subscription_plans(db),
        fetchers::fetch_sessions(db),
        fetchers::fetch_messages(db, None),
        fetchers::fetch_payment_history(db),
        fetchers::fetch_leads(db),
    )?;
    let stats = user_stats(
        &users,
        &subscriptions,
        &plans,
        &sessions,
        &messages,
        &payments,
        &leads,
        scope,
    );
    log::info!("User stats compiled for {} users", stats.len());
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Subscriber report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccountStatus {
    Active,
    Disabled,
}

impl AccountStatus {
    pub fn toggled(self) -> Self {
        match self {
            AccountStatus::Active => AccountStatus::Disabled,
            AccountStatus::Disabled => AccountStatus::Active,
        }
    }

    pub fn is_active(self) -> bool {
        self == AccountStatus::Active
    }

    pub fn label(self) -> &'static str {
        match self {
            AccountStatus::Active => "Active",
            AccountStatus::Disabled => "Disabled",
        }
    }
}

pub const FREE_PLAN: &str = "Free";

#[derive(Debug, Clone, Serialize)]
pub struct SubscriberRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub date_signed_up: Option<DateTime<Utc>>,
    pub plan_type: String,
    pub messages_count: usize,
    pub leads_count: usize,
    pub avg_lead_score: i64,
    pub status: AccountStatus,
}

impl Searchable for SubscriberRow {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str(), self.website.as_str()]
    }
}

/// Everything the subscriber report joins, fetched up front.
#[derive(Debug, Default)]
pub struct SubscriberSnapshot {
    pub users: Vec<User>,
    pub crawl_records: Vec<CrawlRecord>,
    pub plans: Vec<SubscriptionPlan>,
    pub subscriptions: Vec<UserSubscription>,
    pub sessions: Vec<Session>,
    pub messages: Vec<Message>,
    pub leads: Vec<Lead>,
    pub confirmations: Vec<LeadConfirmation>,
}

pub fn subscriber_rows(snapshot: &SubscriberSnapshot) -> Vec<SubscriberRow> {
    // Newest crawl record per user wins.
    let mut websites: HashMap<Uuid, &CrawlRecord> = HashMap::new();
    for record in &snapshot.crawl_records {
        let newer = websites.get(&record.user_id).map_or(true, |seen| record.id > seen.id);
        if newer {
            websites.insert(record.user_id, record);
        }
    }

    let plan_names: HashMap<Uuid, &str> = snapshot
        .plans
        .iter()
        .map(|p| (p.id, p.name.as_str()))
        .collect();
    let active_plan: HashMap<Uuid, Option<Uuid>> = snapshot
        .subscriptions
        .iter()
        .filter(|s| s.is_active())
        .fold(HashMap::new(), |mut map, s| {
            if let Some(owner) = s.user_id {
                map.entry(owner).or_insert(s.plan_id);
            }
            map
        });

    let owners = session_owners(&snapshot.sessions);
    let messages_by_user = index_by(&snapshot.messages, |m| owners.get(&m.session_id).copied());
    let leads_by_user = index_by(&snapshot.leads, |l| lead_owner(l, &owners));
    let confirmed: HashSet<Uuid> = snapshot
        .confirmations
        .iter()
        .filter(|c| c.confirmed)
        .filter_map(|c| owners.get(&c.session_id).copied())
        .collect();

    snapshot
        .users
        .iter()
        .map(|user| {
            let user_leads = rows_for(&leads_by_user, Some(&user.id));
            let plan_type = match active_plan.get(&user.id) {
                Some(plan_id) => plan_id
                    .and_then(|id| plan_names.get(&id).map(|n| n.to_string()))
                    .unwrap_or_else(|| FREE_PLAN.to_string()),
                None => FREE_PLAN.to_string(),
            };

            SubscriberRow {
                id: user.id,
                name: user.display_name(),
                email: user.email.clone().unwrap_or_default(),
                phone: user.phone.clone().unwrap_or_default(),
                website: websites
                    .get(&user.id)
                    .and_then(|r| r.url.clone())
                    .unwrap_or_default(),
                date_signed_up: user.created_at,
                plan_type,
                messages_count: rows_for(&messages_by_user, Some(&user.id)).len(),
                leads_count: user_leads.len(),
                avg_lead_score: average_lead_score(user_leads.iter().copied()).round() as i64,
                status: if confirmed.contains(&user.id) {
                    AccountStatus::Active
                } else {
                    AccountStatus::Disabled
                },
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubscriberSummary {
    pub active_users: usize,
    pub total_messages: usize,
    pub total_leads: usize,
}

pub fn summarize(rows: &[SubscriberRow]) -> SubscriberSummary {
    SubscriberSummary {
        active_users: rows.iter().filter(|r| r.status.is_active()).count(),
        total_messages: rows.iter().map(|r| r.messages_count).sum(),
        total_leads: rows.iter().map(|r| r.leads_count).sum(),
    }
}

pub async fn load_subscriber_snapshot(db: &dyn DataStore) -> StoreResult<SubscriberSnapshot> {
    let users = fetchers::fetch_users(db).await?;
    if users.is_empty() {
        log::info!("No users found");
        return Ok(SubscriberSnapshot::default());
    }
    let user_ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();

    let (crawl_records, plans, subscriptions, sessions, messages, leads, confirmations) = tokio::try_join!(
        fetchers::fetch_crawl_records(db, &user_ids),
        fetchers::fetch_subscription_plans(db),
        fetchers::fetch_user_subscriptions(db),
        fetchers::fetch_sessions(db),
        fetchers::fetch_messages(db, None),
        fetchers::fetch_leads(db),
        fetchers::fetch_confirmed_leads(db),
    )?;

    Ok(SubscriberSnapshot {
        users,
        crawl_records,
        plans,
        subscriptions,
        sessions,
        messages,
        leads,
        confirmations,
    })
}

pub async fn load_subscriber_rows(db: &dyn DataStore) -> StoreResult<Vec<SubscriberRow>> {
    let snapshot = load_subscriber_snapshot(db).await?;
    let rows = subscriber_rows(&snapshot);
    log::info!("Final dashboard data compiled for {} users", rows.len());
    Ok(rows)
}
