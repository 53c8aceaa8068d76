//! HTTP route handlers for the order API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                   - Liveness check
//! GET  /health/ready             - Readiness check (order store reachable)
//!
//! # Checkout
//! POST /api/checkout             - Validate, charge, persist, sync, notify
//!
//! # Order status
//! POST /api/webhook/order-status - Status update from fulfillment
//! GET  /api/webhook/order-status - Same operation via query string
//!
//! # Catalog
//! GET  /api/products             - Product listing (category/size/inStock/q)
//! GET  /api/products/{id}        - Product detail
//! ```

pub mod checkout;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Create all routes for the API server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/api/checkout", post(checkout::checkout))
        .route(
            "/api/webhook/order-status",
            post(orders::update_status).get(orders::update_status_query),
        )
        .route("/api/products", get(products::index))
        .route("/api/products/{id}", get(products::show))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the order document is readable before returning OK.
/// Returns 503 Service Unavailable if it is not.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.orders().list().await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
