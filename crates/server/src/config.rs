//! Server configuration loaded from environment variables.
//!
//! Every variable is optional: with an empty environment the server runs
//! fully self-contained (simulated payments, bundled catalog, no CRM sync,
//! no email). Setting the relevant variables switches each integration on.
//!
//! # Environment Variables
//!
//! ## Server
//! - `DENIF_HOST` - Bind address (default: 127.0.0.1)
//! - `DENIF_PORT` - Listen port (default: 3000)
//! - `DENIF_BASE_URL` - Public site URL, used in payment return links (default: <https://denif.it>)
//! - `DENIF_ORDERS_PATH` - Order storage file (default: data/orders.json)
//! - `DENIF_CARTS_PATH` - Cart storage file (default: data/carts.json)
//!
//! ## Store
//! - `STORE_NAME` - Sender name for customer email (default: Denif - Scarpe Artigianali)
//! - `STORE_EMAIL` - Sender address for customer email (default: info@denif.it)
//! - `SHIPPING_FLAT_RATE` - Flat shipping cost in EUR (default: 0.00, shipping included)
//! - `SHIPPING_FREE_OVER` - Subtotal at which shipping becomes free (unset: never)
//!
//! ## Integrations
//! - `STRIPE_SECRET_KEY` - Stripe live key; absent or `sk_test_`-prefixed selects the simulated gateway
//! - `AIRTABLE_API_KEY` / `AIRTABLE_BASE_ID` - AirTable CRM credentials (set together)
//! - `AIRTABLE_ORDERS_TABLE` - Orders table name (default: Ordini)
//! - `AIRTABLE_PRODUCTS_TABLE` - Products table name (default: Prodotti)
//! - `RESEND_API_KEY` - Resend API key for transactional email
//! - `WEBHOOK_SECRET` - Shared secret for the order-status webhook
//! - `SENTRY_DSN` / `SENTRY_ENVIRONMENT` / `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use denif_core::pricing::ShippingPolicy;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Stripe keys with this prefix belong to test mode and select the
/// simulated gateway instead of the live client.
const STRIPE_TEST_KEY_PREFIX: &str = "sk_test_";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the store, used for payment return links
    pub base_url: String,
    /// Path of the order storage file
    pub orders_path: PathBuf,
    /// Path of the cart storage file
    pub carts_path: PathBuf,
    /// Store name used as the email sender
    pub store_name: String,
    /// Store address used as the email sender
    pub store_email: String,
    /// Shipping cost policy
    pub shipping: ShippingPolicy,
    /// Stripe configuration; `None` selects the simulated gateway
    pub stripe: Option<StripeConfig>,
    /// AirTable CRM configuration; `None` disables catalog and order sync
    pub airtable: Option<AirtableConfig>,
    /// Resend configuration; `None` disables customer email
    pub resend: Option<ResendConfig>,
    /// Shared secret for the order-status webhook; `None` leaves it open
    pub webhook_secret: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g., production, staging)
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry performance traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Stripe API configuration.
///
/// Only present for live keys; test keys and an unset variable both mean
/// the simulated gateway handles payments.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret key (sk_live_...)
    pub secret_key: SecretString,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// AirTable configuration for the product catalog and order CRM sync.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct AirtableConfig {
    /// AirTable API key
    pub api_key: SecretString,
    /// AirTable base ID
    pub base_id: String,
    /// Table holding synced orders
    pub orders_table: String,
    /// Table holding the product catalog
    pub products_table: String,
}

impl std::fmt::Debug for AirtableConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_id", &self.base_id)
            .field("orders_table", &self.orders_table)
            .field("products_table", &self.products_table)
            .finish()
    }
}

/// Resend API configuration for transactional email.
#[derive(Clone)]
pub struct ResendConfig {
    /// Resend API key
    pub api_key: SecretString,
}

impl std::fmt::Debug for ResendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendConfig")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if variables fail to parse or if secrets fail
    /// validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("DENIF_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("DENIF_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("DENIF_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("DENIF_PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default("DENIF_BASE_URL", "https://denif.it");
        Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("DENIF_BASE_URL".to_string(), e.to_string()))?;

        let orders_path = PathBuf::from(get_env_or_default("DENIF_ORDERS_PATH", "data/orders.json"));
        let carts_path = PathBuf::from(get_env_or_default("DENIF_CARTS_PATH", "data/carts.json"));

        let store_name = get_env_or_default("STORE_NAME", "Denif - Scarpe Artigianali");
        let store_email = get_env_or_default("STORE_EMAIL", "info@denif.it");
        let shipping = shipping_from_env()?;

        let stripe = StripeConfig::from_env()?;
        let airtable = AirtableConfig::from_env()?;
        let resend = ResendConfig::from_env()?;

        let webhook_secret = match get_optional_env("WEBHOOK_SECRET") {
            Some(value) => {
                validate_secret_strength(&value, "WEBHOOK_SECRET")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            base_url,
            orders_path,
            carts_path,
            store_name,
            store_email,
            shipping,
            stripe,
            airtable,
            resend,
            webhook_secret,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StripeConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(key) = get_optional_env("STRIPE_SECRET_KEY") else {
            return Ok(None);
        };
        if key.starts_with(STRIPE_TEST_KEY_PREFIX) {
            return Ok(None);
        }
        validate_secret_strength(&key, "STRIPE_SECRET_KEY")?;
        Ok(Some(Self {
            secret_key: SecretString::from(key),
        }))
    }
}

impl AirtableConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let api_key = get_optional_env("AIRTABLE_API_KEY");
        let base_id = get_optional_env("AIRTABLE_BASE_ID");

        match (api_key, base_id) {
            (Some(key), Some(base_id)) => {
                // Validate API key has sufficient entropy
                validate_secret_strength(&key, "AIRTABLE_API_KEY")?;
                Ok(Some(Self {
                    api_key: SecretString::from(key),
                    base_id,
                    orders_table: get_env_or_default("AIRTABLE_ORDERS_TABLE", "Ordini"),
                    products_table: get_env_or_default("AIRTABLE_PRODUCTS_TABLE", "Prodotti"),
                }))
            }
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "AIRTABLE_*".to_string(),
                "Both AIRTABLE_API_KEY and AIRTABLE_BASE_ID must be set together".to_string(),
            )),
        }
    }
}

impl ResendConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(key) = get_optional_env("RESEND_API_KEY") else {
            return Ok(None);
        };
        validate_secret_strength(&key, "RESEND_API_KEY")?;
        Ok(Some(Self {
            api_key: SecretString::from(key),
        }))
    }
}

/// Build the shipping policy from environment variables.
fn shipping_from_env() -> Result<ShippingPolicy, ConfigError> {
    let flat_rate = get_env_or_default("SHIPPING_FLAT_RATE", "0.00")
        .parse::<Decimal>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("SHIPPING_FLAT_RATE".to_string(), e.to_string())
        })?;
    let free_over = get_optional_env("SHIPPING_FREE_OVER")
        .map(|s| {
            s.parse::<Decimal>().map_err(|e| {
                ConfigError::InvalidEnvVar("SHIPPING_FREE_OVER".to_string(), e.to_string())
            })
        })
        .transpose()?;

    Ok(ShippingPolicy {
        flat_rate,
        free_over,
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
