//! Test harness for the Denif order API.
//!
//! The API is exercised fully in-process: each test assembles an
//! [`AppState`] from explicit parts, mounts the production router over it,
//! and drives requests with `tower::ServiceExt::oneshot`. No sockets, no
//! external services.
//!
//! # Doubles
//!
//! - [`ForcedGateway`] - payment gateway with a scripted outcome and an
//!   invocation counter
//! - [`FailingStore`] - order store whose every operation fails
//!
//! Everything else is real: the file-backed order store runs against a
//! temp directory, the catalog serves its built-in fallback, and the
//! mailer runs unconfigured so sends become logged no-ops.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p denif-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
// Test helpers panic on setup failure instead of returning errors.
#![allow(clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde_json::{Value, json};

use denif_core::pricing::ShippingPolicy;
use denif_core::{
    CartItem, CustomerInfo, Order, OrderId, OrderItem, OrderStatus, OrderTotals, PaymentInfo,
    PaymentMethod, PaymentStatus,
};
use denif_server::config::ServerConfig;
use denif_server::payment::{ChargeOutcome, GatewayError, PaymentGateway};
use denif_server::routes;
use denif_server::services::{Catalog, Mailer};
use denif_server::state::AppState;
use denif_server::store::{FileOrderStore, MemoryCartStore, OrderStore, StoreError};

// ====== Doubles ======

enum Script {
    Approve {
        transaction_id: String,
    },
    Decline {
        message: String,
        requires_action: bool,
        client_secret: Option<String>,
    },
    Fail {
        message: String,
    },
}

/// Payment gateway double with a scripted outcome.
///
/// Counts invocations so tests can assert that rejected checkouts never
/// reach the gateway.
pub struct ForcedGateway {
    script: Script,
    calls: AtomicUsize,
}

impl ForcedGateway {
    /// Gateway that approves every charge with the given transaction id.
    #[must_use]
    pub fn approving(transaction_id: &str) -> Arc<Self> {
        Self::with_script(Script::Approve {
            transaction_id: transaction_id.to_owned(),
        })
    }

    /// Gateway that declines every charge with the given message.
    #[must_use]
    pub fn declining(message: &str) -> Arc<Self> {
        Self::with_script(Script::Decline {
            message: message.to_owned(),
            requires_action: false,
            client_secret: None,
        })
    }

    /// Gateway that declines asking the client for 3DS confirmation.
    #[must_use]
    pub fn requiring_action(message: &str, client_secret: &str) -> Arc<Self> {
        Self::with_script(Script::Decline {
            message: message.to_owned(),
            requires_action: true,
            client_secret: Some(client_secret.to_owned()),
        })
    }

    /// Gateway whose transport always fails.
    #[must_use]
    pub fn failing(message: &str) -> Arc<Self> {
        Self::with_script(Script::Fail {
            message: message.to_owned(),
        })
    }

    fn with_script(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    /// How many times `charge` ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ForcedGateway {
    async fn charge(
        &self,
        _amount: Decimal,
        _method: PaymentMethod,
        _method_token: Option<&str>,
    ) -> Result<ChargeOutcome, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Approve { transaction_id } => Ok(ChargeOutcome::Approved {
                transaction_id: transaction_id.clone(),
            }),
            Script::Decline {
                message,
                requires_action,
                client_secret,
            } => Ok(ChargeOutcome::Declined {
                message: message.clone(),
                requires_action: *requires_action,
                client_secret: client_secret.clone(),
            }),
            Script::Fail { message } => Err(GatewayError::Parse(message.clone())),
        }
    }
}

/// Order store double whose every operation fails with an I/O error.
pub struct FailingStore;

impl FailingStore {
    fn error() -> StoreError {
        StoreError::Save {
            entity: "l'ordine",
            source: std::io::Error::other("disk full"),
        }
    }
}

#[async_trait]
impl OrderStore for FailingStore {
    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        Err(Self::error())
    }

    async fn get(&self, _order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        Err(Self::error())
    }

    async fn append(&self, _order: Order) -> Result<(), StoreError> {
        Err(Self::error())
    }

    async fn set_status(
        &self,
        _order_id: &OrderId,
        _status: OrderStatus,
    ) -> Result<bool, StoreError> {
        Err(Self::error())
    }

    async fn delete(&self, _order_id: &OrderId) -> Result<bool, StoreError> {
        Err(Self::error())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        Err(Self::error())
    }
}

// ====== Configuration ======

/// Configuration with every integration off and shipping included.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_owned(),
        orders_path: PathBuf::from("data/orders.json"),
        carts_path: PathBuf::from("data/carts.json"),
        store_name: "Denif - Scarpe Artigianali".to_owned(),
        store_email: "info@denif.it".to_owned(),
        shipping: ShippingPolicy::included(),
        stripe: None,
        airtable: None,
        resend: None,
        webhook_secret: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 1.0,
    }
}

/// [`test_config`] with the order-status webhook secret set.
#[must_use]
pub fn config_with_webhook_secret(secret: &str) -> ServerConfig {
    ServerConfig {
        webhook_secret: Some(SecretString::from(secret.to_owned())),
        ..test_config()
    }
}

// ====== Assembly ======

/// State over the given store and gateway; CRM and email stay off.
#[must_use]
pub fn state_with(
    config: ServerConfig,
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
) -> AppState {
    let carts = Arc::new(MemoryCartStore::new());
    let catalog = Catalog::new(None).expect("offline catalog");
    let mailer =
        Mailer::new(None, &config.store_name, &config.store_email).expect("unconfigured mailer");
    AppState::from_parts(config, orders, carts, gateway, None, catalog, mailer)
}

/// [`state_with`] an always-approving gateway, for tests that never charge.
#[must_use]
pub fn state_over(config: ServerConfig, orders: Arc<dyn OrderStore>) -> AppState {
    state_with(
        config,
        orders,
        ForcedGateway::approving("CARD-1700000000000-A1B2C3"),
    )
}

/// The production router mounted over `state`.
#[must_use]
pub fn app(state: AppState) -> Router {
    routes::routes().with_state(state)
}

/// File-backed order store in a fresh temp directory.
///
/// The [`tempfile::TempDir`] must stay alive for the duration of the test.
#[must_use]
pub fn temp_store() -> (tempfile::TempDir, Arc<FileOrderStore>) {
    let dir = tempfile::tempdir().expect("temp directory");
    let store = Arc::new(FileOrderStore::new(dir.path().join("orders.json")));
    (dir, store)
}

// ====== Requests ======

/// Build a JSON `POST` request.
#[must_use]
pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Build a `GET` request.
#[must_use]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

/// Collect a response body as JSON.
pub async fn read_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("JSON response body")
}

// ====== Fixtures ======

/// One cart line for the given product.
#[must_use]
pub fn cart_item(id: &str, name: &str, price: Decimal, size: &str, quantity: u32) -> CartItem {
    CartItem {
        id: id.to_owned(),
        name: name.to_owned(),
        price,
        image: format!("/images/{id}.jpg"),
        size: size.to_owned(),
        quantity,
    }
}

/// The house mocassino, 320 euro.
#[must_use]
pub fn mocassino(quantity: u32) -> CartItem {
    cart_item(
        "3",
        "Mocassino in Pelle Scamosciata",
        dec!(320.00),
        "41",
        quantity,
    )
}

/// Checkout customer, typed.
#[must_use]
pub fn customer() -> CustomerInfo {
    CustomerInfo {
        first_name: "Giulia".to_owned(),
        last_name: "Bianchi".to_owned(),
        email: "giulia.bianchi@example.it".to_owned(),
        phone: "3451234567".to_owned(),
        address: "Via Roma 12".to_owned(),
        city: "Firenze".to_owned(),
        postal_code: "50123".to_owned(),
        country: "Italia".to_owned(),
        notes: None,
    }
}

/// Customer block as the storefront sends it.
#[must_use]
pub fn customer_json() -> Value {
    json!({
        "firstName": "Giulia",
        "lastName": "Bianchi",
        "email": "giulia.bianchi@example.it",
        "phone": "3451234567",
        "address": "Via Roma 12",
        "city": "Firenze",
        "postalCode": "50123",
        "country": "Italia",
    })
}

/// Checkout submission paying by card.
#[must_use]
pub fn checkout_body(items: &[CartItem]) -> Value {
    json!({
        "cartItems": items,
        "customer": customer_json(),
        "paymentMethod": "card",
    })
}

/// A stored order, as checkout would have written it.
#[must_use]
pub fn placed_order(id: &str) -> Order {
    let items: Vec<OrderItem> = vec![OrderItem::from_cart(mocassino(1))];
    let subtotal: Decimal = items.iter().map(|item| item.subtotal).sum();

    Order {
        order_id: OrderId::new(id),
        customer: customer(),
        items,
        payment: PaymentInfo {
            method: PaymentMethod::Card,
            transaction_id: Some("CARD-1700000000000-A1B2C3".to_owned()),
            status: PaymentStatus::Completed,
        },
        totals: OrderTotals::new(subtotal, Decimal::ZERO),
        status: OrderStatus::Confirmed,
        created_at: Utc
            .with_ymd_and_hms(2024, 11, 14, 10, 0, 0)
            .single()
            .expect("valid timestamp"),
        estimated_delivery: Some(
            Utc.with_ymd_and_hms(2024, 11, 18, 10, 0, 0)
                .single()
                .expect("valid timestamp"),
        ),
    }
}
