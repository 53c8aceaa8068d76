//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::payment::{GatewayError, PaymentGateway, SimulatedGateway, StripeGateway};
use crate::services::{
    AirtableError, AirtableOrdersClient, CartService, Catalog, CatalogError, EmailError, Mailer,
};
use crate::store::{CartStore, FileCartStore, FileOrderStore, OrderStore};

/// Error wiring the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payment gateway: {0}")]
    Gateway(#[from] GatewayError),
    #[error("AirTable client: {0}")]
    Airtable(#[from] AirtableError),
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("mailer: {0}")]
    Email(#[from] EmailError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the order store, payment gateway, and the
/// optional SaaS clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    orders: Arc<dyn OrderStore>,
    cart: CartService,
    gateway: Arc<dyn PaymentGateway>,
    airtable: Option<AirtableOrdersClient>,
    catalog: Catalog,
    mailer: Mailer,
}

impl AppState {
    /// Create the production state from configuration.
    ///
    /// The payment gateway is picked here, once: a live Stripe key selects
    /// the Stripe client, anything else the simulated gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the SaaS clients fails to build.
    pub fn new(config: ServerConfig) -> Result<Self, StateError> {
        let orders: Arc<dyn OrderStore> =
            Arc::new(FileOrderStore::new(config.orders_path.clone()));
        let carts: Arc<dyn CartStore> = Arc::new(FileCartStore::new(config.carts_path.clone()));

        let gateway: Arc<dyn PaymentGateway> = match &config.stripe {
            Some(stripe) => Arc::new(StripeGateway::new(stripe, &config.base_url)?),
            None => Arc::new(SimulatedGateway::new()),
        };

        let airtable = config
            .airtable
            .as_ref()
            .map(AirtableOrdersClient::new)
            .transpose()?;
        let catalog = Catalog::new(config.airtable.as_ref())?;
        let mailer = Mailer::new(config.resend.as_ref(), &config.store_name, &config.store_email)?;

        Ok(Self::from_parts(
            config, orders, carts, gateway, airtable, catalog, mailer,
        ))
    }

    /// Assemble state from explicit parts. Tests inject doubles here.
    #[must_use]
    pub fn from_parts(
        config: ServerConfig,
        orders: Arc<dyn OrderStore>,
        carts: Arc<dyn CartStore>,
        gateway: Arc<dyn PaymentGateway>,
        airtable: Option<AirtableOrdersClient>,
        catalog: Catalog,
        mailer: Mailer,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                orders,
                cart: CartService::new(carts),
                gateway,
                airtable,
                catalog,
                mailer,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the order store.
    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.inner.orders.as_ref()
    }

    /// Get a reference to the session cart service.
    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    /// Get a reference to the payment gateway.
    #[must_use]
    pub fn gateway(&self) -> &dyn PaymentGateway {
        self.inner.gateway.as_ref()
    }

    /// Get a reference to the AirTable CRM client, if configured.
    #[must_use]
    pub fn airtable(&self) -> Option<&AirtableOrdersClient> {
        self.inner.airtable.as_ref()
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a reference to the transactional mailer.
    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }
}
