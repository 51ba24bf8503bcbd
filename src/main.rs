//! Bay form builder backend
//!
//! Organizations author forms in a block editor, publish share links and
//! collect responses. Submissions are verified against the live form document
//! before they are stored in SQLite.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod form;
mod models;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Bay backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!(
            "No admin PSK configured (BAY_API_PSK). Organization provisioning is open!"
        );
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the admin layer
    let psk = state.config.api_psk.clone();

    let admin_routes = Router::new()
        .route("/organizations", post(api::create_organization))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    let organization_routes = Router::new()
        // Forms
        .route("/forms", get(api::list_forms).post(api::create_form))
        .route(
            "/forms/{id}",
            get(api::get_form)
                .put(api::update_form)
                .delete(api::delete_form),
        )
        .route("/forms/{id}/fields", get(api::get_form_fields))
        .route("/forms/{id}/pages", get(api::get_form_pages))
        // Responses
        .route("/forms/{id}/responses", get(api::list_responses))
        .route(
            "/forms/{id}/responses/delete",
            post(api::bulk_delete_responses),
        )
        .route(
            "/forms/{id}/responses/{response_id}",
            get(api::get_response).delete(api::delete_response),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::organization_auth_layer,
        ));

    // Share links (no auth required)
    let public_routes = Router::new()
        .route("/f/{id}", get(api::get_public_form))
        .route("/f/{id}/responses", post(api::submit_response));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", admin_routes.merge(organization_routes))
        .merge(public_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
