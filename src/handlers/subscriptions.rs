use axum::{
    extract::{Form, Path, Query, State},
    response::Html,
};
use askama::Template;
use uuid::Uuid;

use crate::{
    error::AppError,
    filters,
    handlers::{shell, ListQuery, ListView, Tab},
    middleware::CurrentAdmin,
    services::{
        stats::{self, SubscriberRow, SubscriberSummary},
        toggle::{self, apply_status, Notice, ToggleError},
    },
    state::AppState,
    utils::{paginate, search},
};

#[derive(Template)]
#[template(path = "tabs/subscriptions.html")]
struct SubscriptionsTemplate {
    summary: SubscriberSummary,
    rows: Vec<SubscriberRow>,
    list: ListView,
    notice: Option<Notice>,
}

async fn load(state: &AppState) -> Result<Vec<SubscriberRow>, AppError> {
    stats::load_subscriber_rows(state.db.as_ref())
        .await
        .map_err(AppError::load("dashboard data"))
}

fn render(
    state: &AppState,
    rows: Vec<SubscriberRow>,
    query: &ListQuery,
    notice: Option<Notice>,
) -> Result<String, AppError> {
    let summary = stats::summarize(&rows);
    let page = paginate(search(rows, query.term()), query.page(), state.config.page_size);
    let list = ListView::new("/dashboard/subscriptions", query, &page);
    Ok(SubscriptionsTemplate {
        summary,
        rows: page.rows,
        list,
        notice,
    }
    .render()?)
}

pub async fn content(state: &AppState, query: &ListQuery) -> Result<String, AppError> {
    let rows = load(state).await?;
    render(state, rows, query, None)
}

pub async fn subscriptions_page(
    admin: CurrentAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let content = content(&state, &query).await?;
    shell(&admin, Tab::Subscriptions, content)
}

pub async fn toggle_subscriber(
    admin: CurrentAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Form(query): Form<ListQuery>,
) -> Result<Html<String>, AppError> {
    let mut rows = load(&state).await?;
    let row = rows
        .iter()
        .find(|row| row.id == user_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;

    let notice = match toggle::toggle_confirmation(state.db.as_ref(), &row).await {
        Ok(status) => {
            apply_status(&mut rows, user_id, status.is_active());
            let verb = if status.is_active() { "enabled" } else { "disabled" };
            Notice::success(format!("Account {} successfully", verb))
        }
        Err(ToggleError::NoSession) => {
            log::warn!("No session found for user {}", user_id);
            Notice::error("No session found for this user")
        }
        Err(e) => {
            log::error!("Error toggling status for {}: {}", user_id, e);
            Notice::error(format!("Failed to update status: {}", e))
        }
    };

    let content = render(&state, rows, &query, Some(notice))?;
    shell(&admin, Tab::Subscriptions, content)
}

#[cfg(test)]
mod tests {
    use crate::database::{MemoryStore, Table};
    use crate::handlers::test_support::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn report_lists_every_user_with_summary() {
        let response = app(seeded()).oneshot(get("/dashboard/subscriptions")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Alice Acme"));
        assert!(body.contains("Bob Globex"));
        assert_eq!(body.matches("badge-disabled").count(), 2);
    }

    #[tokio::test]
    async fn enabling_flips_only_the_toggled_row() {
        let uri = format!("/dashboard/subscriptions/{}/toggle", ALICE);
        let response = app(seeded()).oneshot(post_form(&uri, "page=1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_text(response).await;
        assert!(body.contains("Account enabled successfully"));
        assert_eq!(body.matches("badge-active").count(), 1);
        assert_eq!(body.matches("badge-disabled").count(), 1);
    }

    #[tokio::test]
    async fn user_without_session_gets_an_error_notice() {
        let uri = format!("/dashboard/subscriptions/{}/toggle", BOB);
        let response = app(seeded()).oneshot(post_form(&uri, "page=1")).await.unwrap();
        let body = body_text(response).await;
        assert!(body.contains("No session found for this user"));
        assert_eq!(body.matches("badge-disabled").count(), 2);
    }

    #[tokio::test]
    async fn rejected_write_leaves_the_table_unchanged() {
        let store = seeded().read_only(Table::LeadConfirmations);
        let uri = format!("/dashboard/subscriptions/{}/toggle", ALICE);
        let response = app(store).oneshot(post_form(&uri, "page=1")).await.unwrap();
        let body = body_text(response).await;
        assert!(body.contains("Failed to update status"));
        assert_eq!(body.matches("badge-active").count(), 0);
    }

    #[tokio::test]
    async fn unowned_session_does_not_break_the_report() {
        let store = seeded().with_rows(
            Table::Session,
            vec![serde_json::json!({"id": "00000000-0000-4000-8000-0000000000f1", "user_id": null})],
        );
        let response = app(store).oneshot(get("/dashboard/subscriptions")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Alice Acme"));
        assert!(body.contains("Bob Globex"));
    }

    #[tokio::test]
    async fn load_failure_is_not_an_empty_table() {
        let store = MemoryStore::new().failing_on(Table::Users);
        let response = app(store).oneshot(get("/dashboard/subscriptions")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_text(response).await;
        assert!(body.contains("could not load dashboard data"));
        assert!(!body.contains("No subscribers found"));
    }
}
