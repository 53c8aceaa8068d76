//! Order status webhook.
//!
//! Fulfillment drives order lifecycle changes through this endpoint: the
//! local store is updated first, then the CRM mirror and the customer
//! notification ride best-effort. A `shipped` update carrying tracking
//! details additionally records them in the CRM and sends the tracking
//! email instead of the generic status one.

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use denif_core::{OrderId, OrderStatus};

use crate::error::{AppError, Result, best_effort};
use crate::state::AppState;

/// Header carrying the shared webhook secret.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Webhook payload: new status plus optional shipping details.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub carrier: Option<String>,
}

/// Response for a processed status update.
#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub success: bool,
    pub message: String,
}

/// Apply a status update delivered as a JSON body.
///
/// # Errors
///
/// Returns 401 on a secret mismatch, 400 on missing or invalid fields, 404
/// for unknown orders, and 500 when the store write fails.
pub async fn update_status(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<StatusUpdateResponse>> {
    apply_status_update(&state, &headers, update).await
}

/// Query-string variant of [`update_status`], for manual testing.
///
/// # Errors
///
/// Same as [`update_status`].
pub async fn update_status_query(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(update): Query<StatusUpdate>,
) -> Result<Json<StatusUpdateResponse>> {
    apply_status_update(&state, &headers, update).await
}

#[instrument(skip(state, headers, update))]
async fn apply_status_update(
    state: &AppState,
    headers: &HeaderMap,
    update: StatusUpdate,
) -> Result<Json<StatusUpdateResponse>> {
    authorize(state, headers)?;

    let Some(order_id) = update.order_id.filter(|id| !id.is_empty()) else {
        return Err(AppError::Rejected("Order ID required".to_owned()));
    };
    let Some(status) = update.status.filter(|status| !status.is_empty()) else {
        return Err(AppError::Rejected("Status required".to_owned()));
    };
    let Ok(status) = status.parse::<OrderStatus>() else {
        return Err(AppError::Rejected("Invalid status".to_owned()));
    };

    let order_id = OrderId::from(order_id);
    let updated = state
        .orders()
        .set_status(&order_id, status)
        .await
        .map_err(AppError::UpdateFailed)?;
    if !updated {
        return Err(AppError::NotFound("Order not found".to_owned()));
    }
    info!(order_id = %order_id, status = %status, "Order status updated");

    notify(
        state,
        &order_id,
        status,
        update.tracking_number.as_deref(),
        update.carrier.as_deref(),
    )
    .await;

    Ok(Json(StatusUpdateResponse {
        success: true,
        message: format!("Order {order_id} updated to {status}"),
    }))
}

/// Enforce the webhook secret when one is configured.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let Some(secret) = &state.config().webhook_secret else {
        return Ok(());
    };

    let provided = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    if provided == Some(secret.expose_secret()) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Best-effort fan-out after the local update: CRM mirror and customer
/// email. A `confirmed` status sends no email (checkout already did).
async fn notify(
    state: &AppState,
    order_id: &OrderId,
    status: OrderStatus,
    tracking_number: Option<&str>,
    carrier: Option<&str>,
) {
    let order = match state.orders().get(order_id).await {
        Ok(Some(order)) => order,
        Ok(None) => return,
        Err(err) => {
            warn!(error = %err, "Order reload for notifications failed (continuing)");
            return;
        }
    };

    if let (OrderStatus::Shipped, Some(tracking), Some(carrier)) =
        (status, tracking_number, carrier)
    {
        if let Some(airtable) = state.airtable() {
            best_effort(
                "AirTable shipping update",
                airtable.update_shipping_info(order_id, tracking, carrier),
            )
            .await;
        }
        best_effort(
            "Shipping email",
            state.mailer().send_shipping_notification(&order, tracking, carrier),
        )
        .await;
        return;
    }

    if let Some(airtable) = state.airtable() {
        best_effort(
            "AirTable status update",
            airtable.update_order_status(order_id, status),
        )
        .await;
    }
    if status != OrderStatus::Confirmed {
        best_effort(
            "Status email",
            state.mailer().send_status_update(&order, status),
        )
        .await;
    }
}
