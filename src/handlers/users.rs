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
        stats::{self, UserScope, UserStats},
        toggle::{self, apply_status, Notice},
    },
    state::AppState,
    utils::{paginate, search},
};

#[derive(Template)]
#[template(path = "tabs/users.html")]
struct UsersTemplate {
    rows: Vec<UserStats>,
    list: ListView,
    notice: Option<Notice>,
}

async fn load(state: &AppState) -> Result<Vec<UserStats>, AppError> {
    // Disabled users stay listed so they can be switched back on.
    stats::load_user_stats(state.db.as_ref(), UserScope::AnySubscription)
        .await
        .map_err(AppError::load("users"))
}

fn render(
    state: &AppState,
    rows: Vec<UserStats>,
    query: &ListQuery,
    notice: Option<Notice>,
) -> Result<String, AppError> {
    let page = paginate(search(rows, query.term()), query.page(), state.config.users_page_size);
    let list = ListView::new("/dashboard/users", query, &page);
    Ok(UsersTemplate {
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

pub async fn users_page(
    admin: CurrentAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let content = content(&state, &query).await?;
    shell(&admin, Tab::Users, content)
}

pub async fn toggle_user(
    admin: CurrentAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Form(query): Form<ListQuery>,
) -> Result<Html<String>, AppError> {
    let mut rows = load(&state).await?;
    let currently_active = rows
        .iter()
        .find(|row| row.user_id == user_id)
        .map(|row| row.active)
        .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;

    let notice = match toggle::toggle_subscription(state.db.as_ref(), user_id, currently_active).await {
        Ok(active) => {
            apply_status(&mut rows, user_id, active);
            let verb = if active { "enabled" } else { "disabled" };
            Notice::success(format!("User {} successfully", verb))
        }
        Err(e) => {
            log::error!("Error updating user status for {}: {}", user_id, e);
            Notice::error(format!("Failed to update user status: {}", e))
        }
    };

    let content = render(&state, rows, &query, Some(notice))?;
    shell(&admin, Tab::Users, content)
}
