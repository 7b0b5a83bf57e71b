use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote store returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("could not load {what}: {source}")]
    Load {
        what: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("not signed in")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),
}

impl AppError {
    pub fn load(what: &'static str) -> impl FnOnce(StoreError) -> AppError {
        move |source| AppError::Load { what, source }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    status_code: u16,
    message: String,
    retry: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, retry) = match &self {
            AppError::Unauthorized => return Redirect::to("/login").into_response(),
            AppError::Load { .. } => (StatusCode::SERVICE_UNAVAILABLE, true),
            AppError::Template(_) | AppError::Token(_) => (StatusCode::INTERNAL_SERVER_ERROR, false),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, false),
        };
        log::error!("{}", self);

        let template = ErrorTemplate {
            status_code: status.as_u16(),
            message: self.to_string(),
            retry,
        };
        match template.render() {
            Ok(body) => (status, Html(body)).into_response(),
            Err(_) => (status, self.to_string()).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_errors_render_a_retry_page() {
        let err = AppError::load("payments")(StoreError::Remote {
            status: 503,
            body: "upstream down".to_string(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn unauthorized_redirects_to_login() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }
}
