//! Session cart operations.
//!
//! [`CartService`] wraps a [`CartStore`] and is the only mutation path for
//! carts. Callbacks registered with [`CartService::subscribe`] observe every
//! mutation with the session id and the cart contents after the change.

use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;

use denif_core::CartItem;

use crate::store::{CartStore, StoreError};

type Subscriber = Box<dyn Fn(&str, &[CartItem]) + Send + Sync>;

/// Cart operations over an injected store.
pub struct CartService {
    store: Arc<dyn CartStore>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl CartService {
    #[must_use]
    pub fn new(store: Arc<dyn CartStore>) -> Self {
        Self {
            store,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a callback observing every cart mutation.
    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&str, &[CartItem]) + Send + Sync + 'static,
    {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.push(Box::new(subscriber));
    }

    /// Current cart lines for a session.
    ///
    /// # Errors
    ///
    /// Returns error if the cart document cannot be read.
    pub async fn list(&self, session: &str) -> Result<Vec<CartItem>, StoreError> {
        self.store.get_items(session).await
    }

    /// Add a line, merging quantities into an existing `(id, size)` line.
    ///
    /// # Errors
    ///
    /// Returns error if the cart document cannot be read or written.
    pub async fn add(&self, session: &str, item: CartItem) -> Result<Vec<CartItem>, StoreError> {
        let mut items = self.store.get_items(session).await?;

        let merged = match items
            .iter_mut()
            .find(|line| line.line_key() == item.line_key())
        {
            Some(line) => {
                line.quantity += item.quantity;
                true
            }
            None => false,
        };
        if !merged {
            items.push(item);
        }

        self.save_and_notify(session, items).await
    }

    /// Set the quantity of the `(product id, size)` line. Zero removes it.
    ///
    /// # Errors
    ///
    /// Returns error if the cart document cannot be read or written.
    pub async fn update_quantity(
        &self,
        session: &str,
        product_id: &str,
        size: &str,
        quantity: u32,
    ) -> Result<Vec<CartItem>, StoreError> {
        let mut items = self.store.get_items(session).await?;

        if quantity == 0 {
            items.retain(|line| line.line_key() != (product_id, size));
        } else {
            for line in &mut items {
                if line.line_key() == (product_id, size) {
                    line.quantity = quantity;
                }
            }
        }

        self.save_and_notify(session, items).await
    }

    /// Remove the `(product id, size)` line.
    ///
    /// # Errors
    ///
    /// Returns error if the cart document cannot be read or written.
    pub async fn remove(
        &self,
        session: &str,
        product_id: &str,
        size: &str,
    ) -> Result<Vec<CartItem>, StoreError> {
        let mut items = self.store.get_items(session).await?;
        items.retain(|line| line.line_key() != (product_id, size));
        self.save_and_notify(session, items).await
    }

    /// Drop the whole cart for a session.
    ///
    /// # Errors
    ///
    /// Returns error if the cart document cannot be written.
    pub async fn clear(&self, session: &str) -> Result<(), StoreError> {
        self.store.clear(session).await?;
        self.notify(session, &[]);
        Ok(())
    }

    /// Total number of units across all lines.
    ///
    /// # Errors
    ///
    /// Returns error if the cart document cannot be read.
    pub async fn item_count(&self, session: &str) -> Result<u32, StoreError> {
        let items = self.store.get_items(session).await?;
        Ok(items.iter().map(|line| line.quantity).sum())
    }

    /// Sum of line totals.
    ///
    /// # Errors
    ///
    /// Returns error if the cart document cannot be read.
    pub async fn subtotal(&self, session: &str) -> Result<Decimal, StoreError> {
        let items = self.store.get_items(session).await?;
        Ok(items.iter().map(CartItem::line_total).sum())
    }

    async fn save_and_notify(
        &self,
        session: &str,
        items: Vec<CartItem>,
    ) -> Result<Vec<CartItem>, StoreError> {
        self.store.put_items(session, items.clone()).await?;
        self.notify(session, &items);
        Ok(items)
    }

    fn notify(&self, session: &str, items: &[CartItem]) {
        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for subscriber in subscribers.iter() {
            subscriber(session, items);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rust_decimal_macros::dec;

    use crate::store::MemoryCartStore;

    use super::*;

    fn service() -> CartService {
        CartService::new(Arc::new(MemoryCartStore::default()))
    }

    fn item(id: &str, size: &str, price: Decimal, quantity: u32) -> CartItem {
        CartItem {
            id: id.to_owned(),
            name: "Decollete in pelle".to_owned(),
            price,
            image: "/images/decollete.jpg".to_owned(),
            size: size.to_owned(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_add_merges_on_id_and_size() {
        let cart = service();

        cart.add("s1", item("1", "38", dec!(189.00), 1))
            .await
            .unwrap();
        let items = cart
            .add("s1", item("1", "38", dec!(189.00), 2))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().quantity, 3);

        let items = cart
            .add("s1", item("1", "39", dec!(189.00), 1))
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_update_quantity_sets_and_zero_removes() {
        let cart = service();
        cart.add("s1", item("1", "38", dec!(189.00), 1))
            .await
            .unwrap();

        let items = cart.update_quantity("s1", "1", "38", 4).await.unwrap();
        assert_eq!(items.first().unwrap().quantity, 4);

        let items = cart.update_quantity("s1", "1", "38", 0).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_remove_touches_only_the_matching_line() {
        let cart = service();
        cart.add("s1", item("1", "38", dec!(189.00), 1))
            .await
            .unwrap();
        cart.add("s1", item("1", "39", dec!(189.00), 1))
            .await
            .unwrap();

        let items = cart.remove("s1", "1", "38").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().size, "39");
    }

    #[tokio::test]
    async fn test_counts_and_subtotal() {
        let cart = service();
        cart.add("s1", item("1", "38", dec!(189.00), 2))
            .await
            .unwrap();
        cart.add("s1", item("2", "40", dec!(249.50), 1))
            .await
            .unwrap();

        assert_eq!(cart.item_count("s1").await.unwrap(), 3);
        assert_eq!(cart.subtotal("s1").await.unwrap(), dec!(627.50));

        cart.clear("s1").await.unwrap();
        assert_eq!(cart.item_count("s1").await.unwrap(), 0);
        assert_eq!(cart.subtotal("s1").await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_subscribers_observe_every_mutation() {
        let cart = service();
        let mutations = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&mutations);
        cart.subscribe(move |session, _items| {
            assert_eq!(session, "s1");
            seen.fetch_add(1, Ordering::SeqCst);
        });

        cart.add("s1", item("1", "38", dec!(189.00), 1))
            .await
            .unwrap();
        cart.update_quantity("s1", "1", "38", 2).await.unwrap();
        cart.remove("s1", "1", "38").await.unwrap();
        cart.clear("s1").await.unwrap();

        assert_eq!(mutations.load(Ordering::SeqCst), 4);
    }
}
