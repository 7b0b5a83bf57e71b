use axum::{extract::State, response::Html};
use askama::Template;

use crate::{
    error::AppError,
    filters,
    handlers::{shell, Tab},
    middleware::CurrentAdmin,
    services::dashboard::{self, PaymentsSummary},
    state::AppState,
};

#[derive(Template)]
#[template(path = "tabs/payments.html")]
struct PaymentsTemplate {
    summary: PaymentsSummary,
}

pub async fn content(state: &AppState) -> Result<String, AppError> {
    let summary = dashboard::load_payments_summary(state.db.as_ref())
        .await
        .map_err(AppError::load("payments"))?;
    Ok(PaymentsTemplate { summary }.render()?)
}

pub async fn payments_page(admin: CurrentAdmin, State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let content = content(&state).await?;
    shell(&admin, Tab::Payments, content)
}
