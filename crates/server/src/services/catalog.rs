//! Product catalog: AirTable-backed, cached, with a built-in fallback.
//!
//! The catalog is read-heavy and changes rarely, so one fetch is cached for
//! 24 hours. When AirTable is unconfigured or unreachable the built-in mock
//! catalog keeps the storefront browsable.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::AirtableConfig;

/// AirTable API base URL.
const BASE_URL: &str = "https://api.airtable.com/v0";

/// How long one fetched catalog stays fresh.
const CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Cache key for the full catalog.
const CACHE_KEY: &str = "products:all";

/// Image used when a record carries none.
const PLACEHOLDER_IMAGE: &str = "/placeholder-product.svg";

/// Errors that can occur when fetching the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A sellable product as served by the read API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub description: String,
    pub images: Vec<String>,
    pub category: String,
    pub sizes: Vec<String>,
    pub in_stock: bool,
}

/// Catalog read API.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<Inner>,
}

struct Inner {
    fetcher: Option<Fetcher>,
    cache: Cache<String, Arc<Vec<Product>>>,
}

impl Catalog {
    /// Create the catalog service. `None` config serves the mock catalog.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: Option<&AirtableConfig>) -> Result<Self, CatalogError> {
        let fetcher = config.map(Fetcher::new).transpose()?;
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(Inner { fetcher, cache }),
        })
    }

    /// Every product, from cache, AirTable, or the mock fallback.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Arc<Vec<Product>> {
        if let Some(cached) = self.inner.cache.get(CACHE_KEY).await {
            debug!("Cache hit for product catalog");
            return cached;
        }

        let Some(fetcher) = &self.inner.fetcher else {
            warn!("AirTable credentials not configured, using mock catalog");
            return Arc::new(mock_products());
        };

        match fetcher.fetch_all().await {
            Ok(products) => {
                debug!(count = products.len(), "Fetched product catalog");
                let products = Arc::new(products);
                self.inner
                    .cache
                    .insert(CACHE_KEY.to_owned(), Arc::clone(&products))
                    .await;
                products
            }
            Err(err) => {
                warn!(error = %err, "Catalog fetch failed, using mock catalog");
                Arc::new(mock_products())
            }
        }
    }

    /// One product by id.
    pub async fn product_by_id(&self, id: &str) -> Option<Product> {
        self.products()
            .await
            .iter()
            .find(|product| product.id == id)
            .cloned()
    }
}

struct Fetcher {
    client: reqwest::Client,
    base_id: String,
    table: String,
}

impl Fetcher {
    fn new(config: &AirtableConfig) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| CatalogError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_id: config.base_id.clone(),
            table: config.products_table.clone(),
        })
    }

    async fn fetch_all(&self) -> Result<Vec<Product>, CatalogError> {
        let url = format!(
            "{BASE_URL}/{}/{}",
            self.base_id,
            urlencoding::encode(&self.table)
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let listing: RecordListing = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        Ok(transform(listing.records))
    }
}

/// Records to products. Records without a name are dropped; missing fields
/// take the storefront defaults.
fn transform(records: Vec<ProductRecord>) -> Vec<Product> {
    records
        .into_iter()
        .filter_map(|record| {
            let name = record.fields.name.filter(|name| !name.is_empty())?;
            Some(Product {
                id: record.id,
                name,
                price: record.fields.prezzo.unwrap_or_default(),
                description: record.fields.descrizione.unwrap_or_default(),
                images: record
                    .fields
                    .immagini
                    .map(|images| images.into_iter().map(|image| image.url).collect())
                    .unwrap_or_else(|| vec![PLACEHOLDER_IMAGE.to_owned()]),
                category: record
                    .fields
                    .categoria
                    .unwrap_or_else(|| "Scarpe".to_owned()),
                sizes: record.fields.taglie.unwrap_or_else(|| size_run(36..=42)),
                in_stock: record.fields.in_stock != Some(false),
            })
        })
        .collect()
}

/// Wrapper for a record listing response.
#[derive(Debug, Deserialize)]
struct RecordListing {
    records: Vec<ProductRecord>,
}

#[derive(Debug, Deserialize)]
struct ProductRecord {
    id: String,
    #[serde(default)]
    fields: ProductFields,
}

/// Column names as they appear in the AirTable base (Italian).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProductFields {
    name: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    prezzo: Option<Decimal>,
    descrizione: Option<String>,
    immagini: Option<Vec<ImageRef>>,
    categoria: Option<String>,
    taglie: Option<Vec<String>>,
    in_stock: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    url: String,
}

// ====== Filters ======

/// Keep products in `category`; empty or `all` bypasses.
pub fn by_category(products: &mut Vec<Product>, category: &str) {
    if category.is_empty() || category.eq_ignore_ascii_case("all") {
        return;
    }
    let wanted = category.to_lowercase();
    products.retain(|product| product.category.to_lowercase() == wanted);
}

/// Keep products available in `size`; empty or `all` bypasses.
pub fn by_size(products: &mut Vec<Product>, size: &str) {
    if size.is_empty() || size.eq_ignore_ascii_case("all") {
        return;
    }
    products.retain(|product| product.sizes.iter().any(|s| s == size));
}

/// Keep only purchasable products.
pub fn in_stock_only(products: &mut Vec<Product>) {
    products.retain(|product| product.in_stock);
}

/// Keep products whose name, description, or category contains `query`,
/// case-insensitive.
pub fn search(products: &mut Vec<Product>, query: &str) {
    let term = query.to_lowercase();
    products.retain(|product| {
        product.name.to_lowercase().contains(&term)
            || product.description.to_lowercase().contains(&term)
            || product.category.to_lowercase().contains(&term)
    });
}

// ====== Mock catalog ======

fn size_run(range: RangeInclusive<u32>) -> Vec<String> {
    range.map(|size| size.to_string()).collect()
}

#[allow(clippy::too_many_arguments)]
fn mock_product(
    id: &str,
    name: &str,
    price: u32,
    description: &str,
    image: &str,
    category: &str,
    sizes: RangeInclusive<u32>,
    in_stock: bool,
) -> Product {
    Product {
        id: id.to_owned(),
        name: name.to_owned(),
        price: Decimal::from(price),
        description: description.to_owned(),
        images: vec![image.to_owned()],
        category: category.to_owned(),
        sizes: size_run(sizes),
        in_stock,
    }
}

/// Built-in catalog used when AirTable is unavailable.
fn mock_products() -> Vec<Product> {
    vec![
        mock_product(
            "1",
            "Décolleté Classica in Pelle",
            280,
            "Elegante décolleté realizzata a mano in pelle italiana di prima qualità. Tacco 7cm, suola in cuoio lavorato a mano.",
            "https://images.unsplash.com/photo-1543163521-1bf539c55dd2?w=500&q=80",
            "Décolleté",
            36..=41,
            true,
        ),
        mock_product(
            "2",
            "Sandalo Artigianale",
            240,
            "Sandalo in morbida pelle con fibbia decorativa artigianale. Suola in cuoio naturale con pantofola in sughero.",
            "https://images.unsplash.com/photo-1551107696-a4b0c5a0d9a2?w=800&q=80",
            "Sandali",
            36..=40,
            true,
        ),
        mock_product(
            "3",
            "Mocassino in Pelle Scamosciata",
            320,
            "Mocassino tradizionale in pregiata pelle scamosciata. Dettagli a mano con pulisciScarpe argentato.",
            "https://images.unsplash.com/photo-1614252369475-531eba835eb1?w=500&q=80",
            "Mocassini",
            38..=43,
            true,
        ),
        mock_product(
            "4",
            "Stivaletto Invernale",
            380,
            "Stivaletto in pelle pieno fiore con doppia zip. Interno in pelliccia sintetica ecologica, suola in gomma antiscivolo.",
            "https://images.unsplash.com/photo-1542291026-7eec264c27ff?w=500&q=80",
            "Stivaletti",
            36..=41,
            true,
        ),
        mock_product(
            "5",
            "Francesina Classica",
            350,
            "Francesina elegante in pelle italiana con punta leggermente allacciata. Ideale per cerimonie e occasioni speciali.",
            "https://images.unsplash.com/photo-1533867617858-e7b97e060509?w=500&q=80",
            "Francesine",
            36..=42,
            true,
        ),
        mock_product(
            "6",
            "Sneaker in Pelle e Canvas",
            220,
            "Sneaker moderna in pelle e canvas con dettagli a mano. Suola in gomma leggera, perfetta per il tempo libero.",
            "https://images.unsplash.com/photo-1600185365926-3a2ce3cdb9eb?w=500&q=80",
            "Sneakers",
            36..=44,
            true,
        ),
        mock_product(
            "7",
            "Décolleté con Talto Alto",
            320,
            "Décolleté elegante con tacco 10cm in pelle verniciata. Perfetta per occasioni speciali.",
            "https://images.unsplash.com/photo-1596703263926-eb0762ee17e4?w=500&q=80",
            "Décolleté",
            36..=40,
            true,
        ),
        mock_product(
            "8",
            "Stringata Oxford Classica",
            360,
            "Oxford classica in pelle italiana conciata al vegetale. Suola in cuoio con cuciture a vista.",
            "https://images.unsplash.com/photo-1525966222134-fcfa99b8ae77?w=500&q=80",
            "Stringate",
            38..=45,
            true,
        ),
        mock_product(
            "9",
            "Ciabatta da Camera",
            180,
            "Ciabatta confortevole in morbida pelle con suola in cuoio. Ideale per il relax.",
            "https://images.unsplash.com/photo-1518976084612-270e3b744c5f?w=500&q=80",
            "Ciabatte",
            36..=41,
            true,
        ),
        mock_product(
            "10",
            "Anfibio in Pelle",
            420,
            "Anfibio robusto in pelle pieno fiore con lacci laterali. Suola in cuoio antiscivolo.",
            "https://images.unsplash.com/photo-1608256246200-53e635b5b65f?w=500&q=80",
            "Stivaletti",
            37..=43,
            false,
        ),
    ]
}
