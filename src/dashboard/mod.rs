//! Dashboard — Axum JSON API for the presentation layer.
//!
//! Serves prediction generation/lookup and the CLV toolkit.
//! CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tracing::info;

use routes::AppState;

/// Serve the dashboard API until the task is dropped.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Dashboard API starting on http://localhost:{port}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind dashboard port")?;

    axum::serve(listener, app)
        .await
        .context("Dashboard server error")
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = tower_http::cors::CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/predictions", post(routes::generate_prediction))
        .route("/api/predictions/:match_id", get(routes::get_prediction))
        .route("/api/clv", post(routes::grade_clv))
        .route("/api/clv/aggregate", post(routes::aggregate_clv))
        .route("/api/line-movement", post(routes::line_movement))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
