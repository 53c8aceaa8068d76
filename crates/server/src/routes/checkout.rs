//! Checkout endpoint.
//!
//! One submission runs the whole pipeline: structural validation, totals,
//! charge, order persistence, then best-effort CRM sync and confirmation
//! email. Failures before the charge cost nothing; a declined charge leaves
//! no trace; only a persistence failure after a successful charge surfaces
//! as a server error.

use axum::{Json, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use denif_core::{
    CartItem, CustomerInfo, Order, OrderId, OrderItem, OrderStatus, OrderTotals, PaymentInfo,
    PaymentMethod, PaymentStatus, pricing,
};

use crate::error::{AppError, Result, best_effort};
use crate::payment::{ChargeOutcome, amount_bounds_error};
use crate::state::AppState;
use crate::store::{estimate_delivery, generate_order_id};

/// Checkout submission body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub cart_items: Vec<CartItem>,
    pub customer: CustomerInfo,
    pub payment_method: PaymentMethod,
    /// Tokenized payment method from the storefront, card flows only.
    #[serde(default)]
    pub payment_method_id: Option<String>,
}

/// Successful checkout response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub success: bool,
    pub order_id: OrderId,
    pub transaction_id: String,
    pub order: Order,
}

/// Run one checkout submission end to end.
///
/// # Errors
///
/// Returns 400 for structural problems, out-of-bounds amounts, and declined
/// payments; 500 when the order cannot be persisted after a successful
/// charge.
#[instrument(skip(state, request), fields(payment_method = %request.payment_method))]
pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    if request.cart_items.is_empty() {
        return Err(AppError::Rejected("Carrello vuoto".to_owned()));
    }
    if request.customer.email.is_empty()
        || request.customer.first_name.is_empty()
        || request.customer.last_name.is_empty()
    {
        return Err(AppError::Rejected("Dati cliente mancanti".to_owned()));
    }

    let totals = pricing::compute_totals(&request.cart_items, &state.config().shipping);

    // Bounds are checked here so an out-of-range amount never reaches the
    // gateway
    if let Some(message) = amount_bounds_error(totals.total) {
        return Err(AppError::Rejected(message.to_owned()));
    }

    let outcome = state
        .gateway()
        .charge(
            totals.total,
            request.payment_method,
            request.payment_method_id.as_deref(),
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "Payment gateway error");
            AppError::PaymentDeclined {
                message: e.to_string(),
                requires_action: false,
                client_secret: None,
            }
        })?;

    let transaction_id = match outcome {
        ChargeOutcome::Approved { transaction_id } => transaction_id,
        ChargeOutcome::Declined {
            message,
            requires_action,
            client_secret,
        } => {
            let message = if message.is_empty() {
                "Pagamento fallito".to_owned()
            } else {
                message
            };
            return Err(AppError::PaymentDeclined {
                message,
                requires_action,
                client_secret,
            });
        }
    };

    let order = build_order(request, totals, transaction_id.clone());

    state.orders().append(order.clone()).await?;
    info!(
        order_id = %order.order_id,
        transaction_id = %transaction_id,
        total = %order.totals.total,
        "Order confirmed"
    );

    if let Some(airtable) = state.airtable() {
        best_effort("AirTable order sync", airtable.create_order_record(&order)).await;
    }
    best_effort(
        "Confirmation email",
        state.mailer().send_order_confirmation(&order),
    )
    .await;

    Ok(Json(CheckoutResponse {
        success: true,
        order_id: order.order_id.clone(),
        transaction_id,
        order,
    }))
}

/// Freeze a paid submission into an order.
fn build_order(request: CheckoutRequest, totals: OrderTotals, transaction_id: String) -> Order {
    let now = Utc::now();
    let mut rng = rand::rng();

    Order {
        order_id: generate_order_id(now, &mut rng),
        customer: request.customer,
        items: request
            .cart_items
            .into_iter()
            .map(OrderItem::from_cart)
            .collect(),
        payment: PaymentInfo {
            method: request.payment_method,
            transaction_id: Some(transaction_id),
            status: PaymentStatus::Completed,
        },
        totals,
        status: OrderStatus::Confirmed,
        created_at: now,
        // Fixed at creation; status changes never move the estimate
        estimated_delivery: Some(estimate_delivery(now, &mut rng)),
    }
}
