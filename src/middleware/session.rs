use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use tower_cookies::Cookies;

use crate::{config::Config, error::AppError, state::AppState, utils::verify_token};

pub const AUTH_COOKIE: &str = "auth_token";

/// The signed-in administrator.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentAdmin {
    pub email: String,
}

pub fn get_current_admin(cookies: &Cookies, config: &Config) -> Option<CurrentAdmin> {
    let token = cookies.get(AUTH_COOKIE)?.value().to_string();

    let claims = match verify_token(&token, &config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            log::debug!("Rejected admin token: {}", e);
            return None;
        }
    };

    // A token minted for a previous admin address is no longer valid.
    if !claims.sub.eq_ignore_ascii_case(&config.admin_email) {
        return None;
    }

    Some(CurrentAdmin { email: claims.sub })
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized)?;
        get_current_admin(&cookies, &state.config).ok_or(AppError::Unauthorized)
    }
}
