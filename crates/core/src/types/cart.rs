//! Shopping cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single cart line.
///
/// Line identity is the `(id, size)` pair: adding the same product in the
/// same size merges quantities, while another size opens a new line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Catalog product id.
    pub id: String,
    pub name: String,
    /// Unit price in EUR.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image: String,
    pub size: String,
    pub quantity: u32,
}

impl CartItem {
    /// The merge key for cart lines.
    #[must_use]
    pub fn line_key(&self) -> (&str, &str) {
        (&self.id, &self.size)
    }

    /// Price × quantity for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}
