use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use askama::Template;
use serde::Deserialize;
use tower_cookies::{Cookie, Cookies};

use crate::{
    config::Config,
    error::AppError,
    middleware::{get_current_admin, AUTH_COOKIE},
    utils::{auth::SESSION_HOURS, create_token, verify_password},
};

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

pub async fn login_page(State(config): State<Arc<Config>>, cookies: Cookies) -> Result<Response, AppError> {
    if get_current_admin(&cookies, &config).is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    let template = LoginTemplate { error: String::new() };
    Ok(Html(template.render()?).into_response())
}

fn authenticate(config: &Config, email: &str, password: &str) -> bool {
    email.trim().eq_ignore_ascii_case(&config.admin_email)
        && verify_password(password, &config.admin_password_hash)
}

pub async fn login(
    State(config): State<Arc<Config>>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if !authenticate(&config, &form.email, &form.password) {
        log::warn!("Failed admin login for {}", form.email);
        let template = LoginTemplate {
            error: "Invalid email or password".to_string(),
        };
        return Ok((StatusCode::UNAUTHORIZED, Html(template.render()?)).into_response());
    }

    let token = create_token(&config.admin_email, &config.jwt_secret)?;

    // Set secure HTTP-only cookie with JWT token
    let cookie = Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::hours(SESSION_HOURS))
        .build();
    cookies.add(cookie);

    log::info!("Admin {} signed in", config.admin_email);
    Ok(Redirect::to("/dashboard").into_response())
}

pub async fn logout(cookies: Cookies) -> impl IntoResponse {
    cookies.remove(Cookie::build(AUTH_COOKIE).path("/").build());
    Redirect::to("/login")
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn login_request(form: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/login")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn valid_credentials_set_the_session_cookie() {
        let response = app(seeded())
            .oneshot(login_request("email=Admin%40example.com&password=hunter2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/dashboard");

        let cookie = response.headers()["set-cookie"].to_str().unwrap();
        assert!(cookie.starts_with("auth_token="));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn wrong_password_re_renders_the_form() {
        let response = app(seeded())
            .oneshot(login_request("email=admin%40example.com&password=nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(response).await.contains("Invalid email or password"));
    }

    #[tokio::test]
    async fn signed_in_admin_skips_the_login_page() {
        let response = app(seeded()).oneshot(get("/login")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}
