use axum::{
    extract::{Query, State},
    response::Html,
};
use askama::Template;

use crate::{
    error::AppError,
    handlers::{shell, ListQuery, ListView, Tab},
    middleware::CurrentAdmin,
    models::ContactSubmissionDisplay,
    services::fetchers,
    state::AppState,
    utils::{paginate, search, Searchable},
};

impl Searchable for ContactSubmissionDisplay {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str(), self.company.as_str()]
    }
}

#[derive(Template)]
#[template(path = "tabs/contacts.html")]
struct ContactsTemplate {
    rows: Vec<ContactSubmissionDisplay>,
    list: ListView,
}

pub async fn content(state: &AppState, query: &ListQuery) -> Result<String, AppError> {
    let submissions: Vec<ContactSubmissionDisplay> = fetchers::fetch_contact_forms(state.db.as_ref())
        .await
        .map_err(AppError::load("contact submissions"))?
        .into_iter()
        .map(ContactSubmissionDisplay::from)
        .collect();

    let page = paginate(search(submissions, query.term()), query.page(), state.config.page_size);
    let list = ListView::new("/contact-submissions", query, &page);
    Ok(ContactsTemplate { rows: page.rows, list }.render()?)
}

pub async fn contacts_page(
    admin: CurrentAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let content = content(&state, &query).await?;
    shell(&admin, Tab::Contacts, content)
}

#[cfg(test)]
mod tests {
    use crate::database::{MemoryStore, Table};
    use crate::handlers::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    fn submissions(n: usize) -> MemoryStore {
        let rows = (0..n)
            .map(|i| {
                json!({
                    "id": format!("00000000-0000-4000-8000-{:012}", 500 + i),
                    "name": format!("Contact {}", i),
                    "email": format!("contact{}@example.com", i),
                    "company": if i == 0 { "Acme Inc." } else { "Globex" },
                    "created_at": format!("2024-01-{:02}T10:00:00Z", i + 1),
                })
            })
            .collect();
        MemoryStore::new().with_rows(Table::ContactForm, rows)
    }

    #[tokio::test]
    async fn last_page_of_twenty_three() {
        let response = app(submissions(23)).oneshot(get("/contact-submissions?page=3")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Showing 21 to 23 of 23"));
        assert_eq!(body.matches("class=\"contact-row\"").count(), 3);
        assert!(body.contains("Page 3 of 3"));
        assert!(!body.contains("rel=\"next\""));
    }

    #[tokio::test]
    async fn search_matches_company_case_insensitively() {
        let response = app(submissions(3)).oneshot(get("/contact-submissions?q=acme")).await.unwrap();
        let body = body_text(response).await;
        assert_eq!(body.matches("class=\"contact-row\"").count(), 1);
        assert!(body.contains("Acme Inc."));
    }

    #[tokio::test]
    async fn empty_table_says_so() {
        let response = app(MemoryStore::new()).oneshot(get("/contact-submissions")).await.unwrap();
        assert!(body_text(response).await.contains("No contact submissions found"));
    }
}
