mod config;
mod database;
mod error;
mod filters;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;
mod utils;

use axum::{
    extract::DefaultBodyLimit,
    response::Redirect,
    routing::{get, post},
    Router,
};
use dotenvy::dotenv;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let db = database::connect(&config.backend).await?;
    log::info!("Data store ready");

    let addr = format!("0.0.0.0:{}", config.port);
    let app = create_router(AppState::new(db, config));

    log::info!("Admin dashboard starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    Router::new()
        // Public routes (no authentication required)
        .route("/", get(|| async { Redirect::to("/dashboard") }))
        .route("/login", get(handlers::auth::login_page))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))

        // Dashboard shell and tabs
        .route("/dashboard", get(handlers::dashboard))
        .route("/dashboard/overview", get(handlers::overview::overview_page))
        .route("/dashboard/clients", get(handlers::clients::clients_page))
        .route("/dashboard/users", get(handlers::users::users_page))
        .route("/dashboard/users/:id/toggle", post(handlers::users::toggle_user))
        .route("/dashboard/payments", get(handlers::payments::payments_page))
        .route("/dashboard/analytics", get(handlers::analytics::analytics_page))
        .route("/dashboard/subscriptions", get(handlers::subscriptions::subscriptions_page))
        .route(
            "/dashboard/subscriptions/:id/toggle",
            post(handlers::subscriptions::toggle_subscriber),
        )
        .route("/contact-submissions", get(handlers::contacts::contacts_page))

        // API routes
        .route("/api/stats/clients", get(handlers::api::client_stats))
        .route("/api/stats/users", get(handlers::api::user_stats))
        .route("/api/subscribers", get(handlers::api::subscribers))

        // Static files
        .nest_service("/static", ServeDir::new("static"))

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(1024 * 1024)), // 1MB
        )
        .with_state(state)
}
