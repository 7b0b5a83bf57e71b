use axum::{extract::State, response::Html};
use askama::Template;
use chrono::Utc;

use crate::{
    error::AppError,
    filters,
    handlers::{shell, Tab},
    middleware::CurrentAdmin,
    services::dashboard::{self, Overview},
    state::AppState,
};

#[derive(Template)]
#[template(path = "tabs/overview.html")]
struct OverviewTemplate {
    overview: Overview,
}

pub async fn content(state: &AppState) -> Result<String, AppError> {
    let overview = dashboard::load_overview(state.db.as_ref(), Utc::now())
        .await
        .map_err(AppError::load("overview"))?;
    Ok(OverviewTemplate { overview }.render()?)
}

pub async fn overview_page(admin: CurrentAdmin, State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let content = content(&state).await?;
    shell(&admin, Tab::Overview, content)
}
