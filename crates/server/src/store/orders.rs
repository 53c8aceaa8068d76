//! Order persistence, id generation, and delivery estimates.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use denif_core::{Order, OrderId, OrderStatus};

use super::{StoreError, read_document, write_document};

/// Persistent order collection, newest first.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Every stored order, newest first.
    async fn list(&self) -> Result<Vec<Order>, StoreError>;

    /// Look up one order by id.
    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Add a new order at the front of the collection.
    async fn append(&self, order: Order) -> Result<(), StoreError>;

    /// Change an order's status. `Ok(false)` when the id is unknown.
    async fn set_status(&self, order_id: &OrderId, status: OrderStatus)
    -> Result<bool, StoreError>;

    /// Remove an order. `Ok(false)` when the id is unknown.
    async fn delete(&self, order_id: &OrderId) -> Result<bool, StoreError>;

    /// Drop every stored order.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// On-disk document layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct OrderDocument {
    orders: Vec<Order>,
}

/// `OrderStore` backed by a single JSON file.
pub struct FileOrderStore {
    path: PathBuf,
    // Serializes every read-modify-write so appends are never lost
    lock: Mutex<()>,
}

impl FileOrderStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<OrderDocument, StoreError> {
        read_document(&self.path).await
    }

    async fn save(&self, document: &OrderDocument) -> Result<(), StoreError> {
        write_document(&self.path, document, "l'ordine").await
    }
}

#[async_trait]
impl OrderStore for FileOrderStore {
    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.orders)
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let _guard = self.lock.lock().await;
        let document = self.load().await?;
        Ok(document
            .orders
            .into_iter()
            .find(|order| &order.order_id == order_id))
    }

    async fn append(&self, order: Order) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        document.orders.insert(0, order);
        self.save(&document).await
    }

    async fn set_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        let Some(order) = document
            .orders
            .iter_mut()
            .find(|order| &order.order_id == order_id)
        else {
            return Ok(false);
        };
        order.status = status;
        self.save(&document).await?;
        Ok(true)
    }

    async fn delete(&self, order_id: &OrderId) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        let before = document.orders.len();
        document.orders.retain(|order| &order.order_id != order_id);
        if document.orders.len() == before {
            return Ok(false);
        }
        self.save(&document).await?;
        Ok(true)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.save(&OrderDocument::default()).await
    }
}

/// Generate an order id: `ORD-{year}-{last 6 digits of epoch ms}{2 random
/// base36 chars}`.
///
/// The millisecond suffix makes ids generated in the same year mostly
/// distinct; the random tag disambiguates ids minted in the same
/// millisecond.
pub fn generate_order_id(now: DateTime<Utc>, rng: &mut impl Rng) -> OrderId {
    let year = now.year();
    let suffix = now.timestamp_millis().rem_euclid(1_000_000);
    let tag: String = (0..2)
        .map(|_| {
            let digit = rng.random_range(0..36_u32);
            char::from_digit(digit, 36)
                .unwrap_or('0')
                .to_ascii_uppercase()
        })
        .collect();

    OrderId::new(format!("ORD-{year}-{suffix:06}{tag}"))
}

/// Delivery estimate for a new order: now plus 3 to 5 days.
///
/// Computed once when the order is created; callers must reuse the stored
/// value rather than recompute it for an existing order.
pub fn estimate_delivery(now: DateTime<Utc>, rng: &mut impl Rng) -> DateTime<Utc> {
    now + Duration::days(rng.random_range(3..=5))
}
