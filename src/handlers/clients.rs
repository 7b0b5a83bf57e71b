use axum::{
    extract::{Query, State},
    response::Html,
};
use askama::Template;

use crate::{
    error::AppError,
    filters,
    handlers::{shell, ListQuery, ListView, Tab},
    middleware::CurrentAdmin,
    services::stats::{self, ClientStats},
    state::AppState,
    utils::{paginate, search},
};

#[derive(Template)]
#[template(path = "tabs/clients.html")]
struct ClientsTemplate {
    rows: Vec<ClientStats>,
    list: ListView,
}

pub async fn content(state: &AppState, query: &ListQuery) -> Result<String, AppError> {
    let stats = stats::load_client_stats(state.db.as_ref())
        .await
        .map_err(AppError::load("client stats"))?;

    let page = paginate(search(stats, query.term()), query.page(), state.config.page_size);
    let list = ListView::new("/dashboard/clients", query, &page);
    Ok(ClientsTemplate { rows: page.rows, list }.render()?)
}

pub async fn clients_page(
    admin: CurrentAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let content = content(&state, &query).await?;
    shell(&admin, Tab::Clients, content)
}

#[cfg(test)]
mod tests {
    use crate::database::Table;
    use crate::handlers::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn client_table_shows_joined_metrics() {
        let store = seeded()
            .with_rows(
                Table::ChatbotClients,
                vec![
                    json!({"id": "00000000-0000-4000-8000-0000000000d1", "client_id": "acme-bot", "user_id": ALICE, "domains": ["acme.test"]}),
                    json!({"id": "00000000-0000-4000-8000-0000000000d2", "client_id": "globex-bot", "user_id": BOB}),
                ],
            )
            .with_rows(
                Table::ChatbotUsage,
                vec![json!({"id": "00000000-0000-4000-8000-0000000000e1", "client_id": "acme-bot", "session_count": 12})],
            );

        let response = app(store).oneshot(get("/dashboard/clients?q=ACME")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("acme-bot"));
        assert!(!body.contains("globex-bot"));
        assert!(body.contains("$100.00"));
    }
}
