//! Summaries behind the overview, payments and analytics tabs.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    database::DataStore,
    error::StoreResult,
    models::{ChatSession, Lead, Message, Payment, Session, SubscriptionPlan, User, UserSubscription},
    services::{
        fetchers,
        stats::{average_lead_score, total_revenue},
    },
};

pub const TRAILING_MONTHS: usize = 12;
pub const TRAILING_DAYS: i64 = 14;
pub const RECENT_ITEMS: usize = 5;
const UNKNOWN_PLAN: &str = "Unknown";

/// One bar of a CSS bar chart; `percent` is relative to the tallest bar.
#[derive(Debug, Clone, Serialize)]
pub struct ChartBar {
    pub label: String,
    pub value: f64,
    pub display: String,
    pub percent: u32,
}

fn bars(points: Vec<(String, f64, String)>) -> Vec<ChartBar> {
    let max = points.iter().map(|(_, v, _)| *v).fold(0.0, f64::max);
    points
        .into_iter()
        .map(|(label, value, display)| ChartBar {
            percent: if max > 0.0 {
                (value / max * 100.0).round() as u32
            } else {
                0
            },
            label,
            value,
            display,
        })
        .collect()
}

fn money(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

/// First day of each of the last `count` months, oldest first.
fn trailing_months(now: DateTime<Utc>, count: usize) -> Vec<NaiveDate> {
    let (mut year, mut month) = (now.year(), now.month());
    let mut months = Vec::with_capacity(count);
    for _ in 0..count {
        if let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) {
            months.push(first);
        }
        if month == 1 {
            year -= 1;
            month = 12;
        } else {
            month -= 1;
        }
    }
    months.reverse();
    months
}

fn month_of(at: DateTime<Utc>) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(at.year(), at.month(), 1)
}

fn trailing_days(now: DateTime<Utc>, count: i64) -> Vec<NaiveDate> {
    let today = now.date_naive();
    (0..count).rev().map(|back| today - Duration::days(back)).collect()
}

/// "Just now", "5 minutes ago", "2 days ago", then a plain date.
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {} ago", unit)
        } else {
            format!("{} {}s ago", n, unit)
        }
    };

    if elapsed.num_seconds() < 60 {
        "Just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        plural(elapsed.num_minutes(), "minute")
    } else if elapsed.num_hours() < 24 {
        plural(elapsed.num_hours(), "hour")
    } else if elapsed.num_days() < 30 {
        plural(elapsed.num_days(), "day")
    } else {
        at.format("%b %d, %Y").to_string()
    }
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityKind {
    Signup,
    Payment,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub title: String,
    pub detail: String,
    pub at: DateTime<Utc>,
    pub ago: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub total_users: u64,
    pub active_subscriptions: usize,
    pub total_revenue: Decimal,
    pub monthly_signups: Vec<ChartBar>,
    pub monthly_revenue: Vec<ChartBar>,
    pub recent_activity: Vec<ActivityItem>,
}

pub fn overview(
    total_users: u64,
    users: &[User],
    subscriptions: &[UserSubscription],
    payments: &[Payment],
    now: DateTime<Utc>,
) -> Overview {
    let months = trailing_months(now, TRAILING_MONTHS);

    let mut signups: HashMap<NaiveDate, usize> = HashMap::new();
    for at in users.iter().filter_map(|u| u.created_at).filter_map(month_of) {
        *signups.entry(at).or_default() += 1;
    }
    let mut revenue: HashMap<NaiveDate, Decimal> = HashMap::new();
    for payment in payments.iter().filter(|p| p.succeeded()) {
        if let Some(month) = payment.paid_at().and_then(month_of) {
            *revenue.entry(month).or_default() += payment.amount;
        }
    }

    let monthly_signups = bars(
        months
            .iter()
            .map(|m| {
                let count = signups.get(m).copied().unwrap_or(0);
                (m.format("%b").to_string(), count as f64, count.to_string())
            })
            .collect(),
    );
    let monthly_revenue = bars(
        months
            .iter()
            .map(|m| {
                let amount = revenue.get(m).copied().unwrap_or_default();
                (m.format("%b").to_string(), amount.to_f64().unwrap_or(0.0), money(amount))
            })
            .collect(),
    );

    let emails: HashMap<Uuid, String> = users
        .iter()
        .map(|u| (u.id, u.email.clone().unwrap_or_else(|| u.display_name())))
        .collect();
    let mut recent_activity: Vec<ActivityItem> = users
        .iter()
        .filter_map(|u| {
            u.created_at.map(|at| ActivityItem {
                kind: ActivityKind::Signup,
                title: "New user signed up".to_string(),
                detail: u.email.clone().unwrap_or_else(|| u.display_name()),
                at,
                ago: relative_time(at, now),
            })
        })
        .chain(payments.iter().filter(|p| p.succeeded()).filter_map(|p| {
            p.paid_at().map(|at| ActivityItem {
                kind: ActivityKind::Payment,
                title: format!("Payment received: {}", money(p.amount)),
                detail: p.user_id.and_then(|id| emails.get(&id).cloned()).unwrap_or_default(),
                at,
                ago: relative_time(at, now),
            })
        }))
        .collect();
    recent_activity.sort_by(|a, b| b.at.cmp(&a.at));
    recent_activity.truncate(RECENT_ITEMS);

    Overview {
        total_users,
        active_subscriptions: subscriptions.iter().filter(|s| s.is_active()).count(),
        total_revenue: total_revenue(payments),
        monthly_signups,
        monthly_revenue,
        recent_activity,
    }
}

pub async fn load_overview(db: &dyn DataStore, now: DateTime<Utc>) -> StoreResult<Overview> {
    let (total_users, users, subscriptions, payments) = tokio::try_join!(
        fetchers::count_users(db),
        fetchers::fetch_users(db),
        fetchers::fetch_user_subscriptions(db),
        fetchers::fetch_payment_history(db),
    )?;
    Ok(overview(total_users, &users, &subscriptions, &payments, now))
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub email: String,
    pub plan: String,
    pub amount: Decimal,
    pub status: String,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusShare {
    pub status: String,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentsSummary {
    pub transactions: Vec<Transaction>,
    pub total_revenue: Decimal,
    pub revenue_by_plan: Vec<ChartBar>,
    pub statuses: Vec<StatusShare>,
}

pub fn payments_summary(
    payments: &[Payment],
    users: &[User],
    subscriptions: &[UserSubscription],
    plans: &[SubscriptionPlan],
) -> PaymentsSummary {
    let emails: HashMap<Uuid, &str> = users
        .iter()
        .filter_map(|u| u.email.as_deref().map(|e| (u.id, e)))
        .collect();
    let plan_names: HashMap<Uuid, &str> = plans.iter().map(|p| (p.id, p.name.as_str())).collect();
    let subscription_plan: HashMap<Uuid, Uuid> = subscriptions
        .iter()
        .filter_map(|s| s.plan_id.map(|plan| (s.id, plan)))
        .collect();
    let plan_for = |payment: &Payment| -> String {
        payment
            .subscription_id
            .and_then(|id| subscription_plan.get(&id))
            .and_then(|plan| plan_names.get(plan))
            .map(|name| name.to_string())
            .unwrap_or_else(|| UNKNOWN_PLAN.to_string())
    };

    let transactions: Vec<Transaction> = payments
        .iter()
        .map(|p| Transaction {
            id: p.id,
            email: p
                .user_id
                .and_then(|id| emails.get(&id))
                .map(|e| e.to_string())
                .unwrap_or_default(),
            plan: plan_for(p),
            amount: p.amount,
            status: p.status.clone(),
            date: p.paid_at(),
        })
        .collect();

    // Plans in price order, then anything unattributed.
    let mut per_plan: Vec<(String, Decimal)> = plans.iter().map(|p| (p.name.clone(), Decimal::ZERO)).collect();
    for tx in transactions.iter().filter(|t| t.status == crate::models::PAYMENT_SUCCEEDED) {
        match per_plan.iter_mut().find(|(name, _)| *name == tx.plan) {
            Some((_, total)) => *total += tx.amount,
            None => per_plan.push((tx.plan.clone(), tx.amount)),
        }
    }
    let revenue_by_plan = bars(
        per_plan
            .into_iter()
            .map(|(name, total)| (name, total.to_f64().unwrap_or(0.0), money(total)))
            .collect(),
    );

    let mut counts: Vec<(String, usize)> = Vec::new();
    for payment in payments {
        match counts.iter_mut().find(|(status, _)| *status == payment.status) {
            Some((_, count)) => *count += 1,
            None => counts.push((payment.status.clone(), 1)),
        }
    }
    let statuses = counts
        .into_iter()
        .map(|(status, count)| StatusShare {
            percent: count as f64 * 100.0 / payments.len() as f64,
            status,
            count,
        })
        .collect();

    PaymentsSummary {
        transactions,
        total_revenue: total_revenue(payments),
        revenue_by_plan,
        statuses,
    }
}

pub async fn load_payments_summary(db: &dyn DataStore) -> StoreResult<PaymentsSummary> {
    let (payments, users, subscriptions, plans) = tokio::try_join!(
        fetchers::fetch_payment_history(db),
        fetchers::fetch_users(db),
        fetchers::fetch_user_subscriptions(db),
        fetchers::fetch_subscription_plans(db),
    )?;
    Ok(payments_summary(&payments, &users, &subscriptions, &plans))
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Analytics {
    pub daily_messages: Vec<ChartBar>,
    pub daily_sessions: Vec<ChartBar>,
    pub daily_active_users: Vec<ChartBar>,
    pub total_messages: usize,
    pub total_sessions: usize,
    pub messages_per_session: f64,
    pub avg_lead_score: f64,
    pub scored_leads: usize,
}

fn daily_counts<I>(days: &[NaiveDate], stamps: I) -> Vec<ChartBar>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut counts: HashMap<NaiveDate, usize> = HashMap::new();
    for at in stamps {
        *counts.entry(at.date_naive()).or_default() += 1;
    }
    day_bars(days, |day| counts.get(day).copied().unwrap_or(0))
}

fn day_bars(days: &[NaiveDate], count: impl Fn(&NaiveDate) -> usize) -> Vec<ChartBar> {
    bars(
        days.iter()
            .map(|day| {
                let n = count(day);
                (day.format("%b %d").to_string(), n as f64, n.to_string())
            })
            .collect(),
    )
}

pub fn analytics(
    messages: &[Message],
    chat_sessions: &[ChatSession],
    sessions: &[Session],
    leads: &[Lead],
    now: DateTime<Utc>,
) -> Analytics {
    let days = trailing_days(now, TRAILING_DAYS);

    let daily_messages = daily_counts(&days, messages.iter().filter_map(|m| m.sent_at));
    let daily_sessions = daily_counts(
        &days,
        chat_sessions.iter().filter_map(|s| s.started_at.or(s.created_at)),
    );

    let mut active: HashMap<NaiveDate, HashSet<Uuid>> = HashMap::new();
    for session in sessions {
        if let (Some(at), Some(owner)) = (session.last_active, session.user_id) {
            active.entry(at.date_naive()).or_default().insert(owner);
        }
    }
    let daily_active_users = day_bars(&days, |day| active.get(day).map_or(0, HashSet::len));

    let messages_per_session = if sessions.is_empty() {
        0.0
    } else {
        messages.len() as f64 / sessions.len() as f64
    };

    Analytics {
        daily_messages,
        daily_sessions,
        daily_active_users,
        total_messages: messages.len(),
        total_sessions: sessions.len(),
        messages_per_session,
        avg_lead_score: average_lead_score(leads),
        scored_leads: leads.iter().filter(|l| l.scored().is_some()).count(),
    }
}

pub async fn load_analytics(db: &dyn DataStore, now: DateTime<Utc>) -> StoreResult<Analytics> {
    let (messages, chat_sessions, sessions, leads) = tokio::try_join!(
        fetchers::fetch_messages(db, None),
        fetchers::fetch_chat_sessions(db, None),
        fetchers::fetch_sessions(db),
        fetchers::fetch_leads(db),
    )?;
    Ok(analytics(&messages, &chat_sessions, &sessions, &leads, now))
}
