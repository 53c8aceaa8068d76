//! Payment gateways.
//!
//! The gateway is picked once at startup from configuration: a live Stripe
//! secret key selects [`StripeGateway`], anything else (no key, or a test
//! key) selects [`SimulatedGateway`]. Handlers only see the
//! [`PaymentGateway`] trait.

pub mod simulated;
pub mod stripe;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use denif_core::PaymentMethod;

pub use simulated::SimulatedGateway;
pub use stripe::StripeGateway;

/// Decision reached by a gateway for one charge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// Money moved. The order may now be created.
    Approved { transaction_id: String },

    /// The gateway said no. Nothing was charged.
    Declined {
        message: String,
        requires_action: bool,
        client_secret: Option<String>,
    },
}

/// Gateway transport failures, as opposed to payment decisions.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse the gateway response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A payment processor able to charge an order total in euros.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Attempt to charge `amount`.
    ///
    /// `method_token` is a processor-issued payment method id, present when
    /// the storefront collected card details up front; `None` otherwise.
    async fn charge(
        &self,
        amount: Decimal,
        method: PaymentMethod,
        method_token: Option<&str>,
    ) -> Result<ChargeOutcome, GatewayError>;
}

/// Order value bounds, enforced before any gateway is invoked.
#[must_use]
pub fn amount_bounds_error(amount: Decimal) -> Option<&'static str> {
    if amount < Decimal::new(10_00, 2) {
        return Some("Importo minimo ordine: €10.00");
    }
    if amount > Decimal::new(10_000_00, 2) {
        return Some("Importo massimo ordine: €10,000.00");
    }
    None
}
