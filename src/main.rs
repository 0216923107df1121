//! Wine API Backend
//!
//! A REST backend for a wine catalogue with SQLite persistence.

mod api;
mod config;
mod db;
mod errors;
mod models;
mod sanitize;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    middleware,
    response::Response,
    routing::get,
    Router,
};
use tower::Layer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::WineRepository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<WineRepository>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_directive()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wine API Backend");
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = match db::init_database(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database connection error: {}", e);
            return Err(e.into());
        }
    };
    tracing::info!("Database connection open");
    let repo = Arc::new(WineRepository::new(pool));

    // Create application state
    let state = AppState { repo: repo.clone() };

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    repo.pool().close().await;
    tracing::info!("Database connection closed through app termination");

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let wine_routes = Router::new()
        .route("/wines", get(api::find_wines).post(api::add_wine))
        .route(
            "/wines/{id}",
            get(api::get_wine)
                .put(api::modify_wine)
                .delete(api::delete_wine),
        );

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(wine_routes)
        .merge(health_routes)
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_TYPE,
            json_utf8_content_type,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wrap the router with the sanitizer so that it runs before routing.
pub fn build_app(state: AppState) -> Router {
    let sanitized = middleware::from_fn(sanitize::sanitize_request).layer(create_router(state));
    Router::new().fallback_service(sanitized)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

/// Declare UTF-8 on JSON responses.
fn json_utf8_content_type(response: &Response) -> Option<HeaderValue> {
    let current = response.headers().get(header::CONTENT_TYPE)?;
    if current.as_bytes().starts_with(b"application/json") {
        Some(HeaderValue::from_static("application/json; charset=utf-8"))
    } else {
        Some(current.clone())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests;
