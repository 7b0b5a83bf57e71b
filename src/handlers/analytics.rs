use axum::{extract::State, response::Html};
use askama::Template;
use chrono::Utc;

use crate::{
    error::AppError,
    filters,
    handlers::{shell, Tab},
    middleware::CurrentAdmin,
    models::Message,
    services::{
        dashboard::{self, Analytics},
        fetchers,
    },
    state::AppState,
};

#[derive(Template)]
#[template(path = "tabs/analytics.html")]
struct AnalyticsTemplate {
    analytics: Analytics,
    recent_messages: Vec<Message>,
}

pub async fn content(state: &AppState) -> Result<String, AppError> {
    let db = state.db.as_ref();
    let (analytics, recent_messages) = tokio::try_join!(
        dashboard::load_analytics(db, Utc::now()),
        fetchers::fetch_messages(db, Some(state.config.recent_limit)),
    )
    .map_err(AppError::load("analytics"))?;

    Ok(AnalyticsTemplate {
        analytics,
        recent_messages,
    }
    .render()?)
}

pub async fn analytics_page(admin: CurrentAdmin, State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let content = content(&state).await?;
    shell(&admin, Tab::Analytics, content)
}

#[cfg(test)]
mod tests {
    use crate::database::{MemoryStore, Table};
    use crate::handlers::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn recent_feed_is_capped_but_totals_are_not() {
        let messages = (0..120)
            .map(|i| {
                json!({
                    "id": format!("00000000-0000-4000-8000-{:012}", 1000 + i),
                    "session_id": ALICE_SESSION,
                    "content": format!("message {}", i),
                    "sent_at": "2024-03-01T00:00:00Z",
                })
            })
            .collect();
        let store = seeded().with_rows(Table::Messages, messages);

        let response = app(store).oneshot(get("/dashboard/analytics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("120 messages"));
        assert_eq!(body.matches("class=\"message-row\"").count(), 100);
    }

    #[tokio::test]
    async fn failed_load_shows_a_retry_page() {
        let store = MemoryStore::new().failing_on(Table::Messages);
        let response = app(store).oneshot(get("/dashboard/analytics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_text(response).await.contains("Retry"));
    }
}
