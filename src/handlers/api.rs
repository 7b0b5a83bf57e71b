use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    database::Database,
    middleware::CurrentAdmin,
    services::stats::{self, ClientStats, SubscriberRow, SubscriberSummary, UserScope, UserStats},
};

#[derive(Deserialize)]
pub struct UserStatsQuery {
    /// Include users whose subscriptions are all inactive.
    #[serde(default)]
    all: bool,
}

#[derive(Serialize)]
pub struct SubscribersResponse {
    pub summary: SubscriberSummary,
    pub rows: Vec<SubscriberRow>,
}

pub async fn client_stats(
    admin: Option<CurrentAdmin>,
    State(db): State<Database>,
) -> Result<Json<Vec<ClientStats>>, StatusCode> {
    admin.ok_or(StatusCode::UNAUTHORIZED)?;
    let stats = stats::load_client_stats(db.as_ref())
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(stats))
}

pub async fn user_stats(
    admin: Option<CurrentAdmin>,
    State(db): State<Database>,
    Query(query): Query<UserStatsQuery>,
) -> Result<Json<Vec<UserStats>>, StatusCode> {
    admin.ok_or(StatusCode::UNAUTHORIZED)?;
    let scope = if query.all {
        UserScope::AnySubscription
    } else {
        UserScope::ActiveSubscriptions
    };
    let stats = stats::load_user_stats(db.as_ref(), scope)
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(stats))
}

pub async fn subscribers(
    admin: Option<CurrentAdmin>,
    State(db): State<Database>,
) -> Result<Json<SubscribersResponse>, StatusCode> {
    admin.ok_or(StatusCode::UNAUTHORIZED)?;
    let rows = stats::load_subscriber_rows(db.as_ref())
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(SubscribersResponse {
        summary: stats::summarize(&rows),
        rows,
    }))
}
