//! Cart persistence, keyed by session id.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use denif_core::CartItem;

use super::{StoreError, read_document, write_document};

/// Persistent cart collection, one cart per session.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The session's cart lines; empty when the session has no cart.
    async fn get_items(&self, session: &str) -> Result<Vec<CartItem>, StoreError>;

    /// Replace the session's cart lines.
    async fn put_items(&self, session: &str, items: Vec<CartItem>) -> Result<(), StoreError>;

    /// Drop the session's cart entirely.
    async fn clear(&self, session: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CartDocument {
    carts: HashMap<String, Vec<CartItem>>,
}

/// `CartStore` backed by a single JSON file.
pub struct FileCartStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCartStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<CartDocument, StoreError> {
        read_document(&self.path).await
    }

    async fn save(&self, document: &CartDocument) -> Result<(), StoreError> {
        write_document(&self.path, document, "il carrello").await
    }
}

#[async_trait]
impl CartStore for FileCartStore {
    async fn get_items(&self, session: &str) -> Result<Vec<CartItem>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        Ok(document.carts.remove(session).unwrap_or_default())
    }

    async fn put_items(&self, session: &str, items: Vec<CartItem>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        document.carts.insert(session.to_owned(), items);
        self.save(&document).await
    }

    async fn clear(&self, session: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        if document.carts.remove(session).is_none() {
            return Ok(());
        }
        self.save(&document).await
    }
}

/// In-memory `CartStore` for tests and single-process setups.
#[derive(Debug, Default)]
pub struct MemoryCartStore {
    carts: Mutex<HashMap<String, Vec<CartItem>>>,
}

impl MemoryCartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn get_items(&self, session: &str) -> Result<Vec<CartItem>, StoreError> {
        Ok(self
            .carts
            .lock()
            .await
            .get(session)
            .cloned()
            .unwrap_or_default())
    }

    async fn put_items(&self, session: &str, items: Vec<CartItem>) -> Result<(), StoreError> {
        self.carts.lock().await.insert(session.to_owned(), items);
        Ok(())
    }

    async fn clear(&self, session: &str) -> Result<(), StoreError> {
        self.carts.lock().await.remove(session);
        Ok(())
    }
}
