//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-class errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`. Best-effort side effects (CRM sync, email) never
//! surface here; they are swallowed by [`best_effort`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Checkout submission rejected before any money moved.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Payment gateway declined the charge. No order exists.
    #[error("Payment declined: {message}")]
    PaymentDeclined {
        message: String,
        requires_action: bool,
        client_secret: Option<String>,
    },

    /// Order storage failed. On the checkout path this fires after a
    /// successful charge: money has moved, so it must read as a server
    /// fault, never as a rejected checkout.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Webhook could not persist the status change.
    #[error("Update failed: {0}")]
    UpdateFailed(StoreError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Webhook secret missing or wrong.
    #[error("Unauthorized")]
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Store(_) | Self::UpdateFailed(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Rejected(_) | Self::PaymentDeclined { .. } => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::UpdateFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        // Don't expose internal error details to clients
        let body = match self {
            Self::Rejected(message) | Self::NotFound(message) => json!({ "error": message }),
            Self::PaymentDeclined {
                message,
                requires_action,
                client_secret,
            } => {
                let mut body = json!({ "error": message });
                if requires_action {
                    body["requiresAction"] = json!(true);
                }
                if let Some(secret) = client_secret {
                    body["clientSecret"] = json!(secret);
                }
                body
            }
            Self::Store(_) => json!({ "error": "Errore durante l'elaborazione dell'ordine" }),
            Self::UpdateFailed(_) => json!({ "error": "Failed to update order" }),
            Self::Unauthorized => json!({ "error": "Unauthorized" }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Await a best-effort side effect, logging failure instead of propagating.
///
/// CRM sync and customer email ride on this: once payment has succeeded the
/// checkout response no longer depends on third-party availability, so their
/// errors are recorded and dropped.
pub async fn best_effort<T, E>(label: &str, fut: impl Future<Output = std::result::Result<T, E>>)
where
    E: std::fmt::Display,
{
    if let Err(err) = fut.await {
        tracing::warn!(error = %err, "{label} failed (continuing)");
    }
}
