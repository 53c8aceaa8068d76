//! Orders: the durable record of a completed checkout.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::CartItem;
use super::customer::CustomerInfo;
use super::payment::PaymentInfo;

static ORDER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ORD-\d{4}-\d{6}[0-9A-Z]{2}$").expect("Invalid regex"));

/// An order identifier, `ORD-{year}-{timestamp suffix}{random}`.
///
/// The format is stable: external systems (AirTable, transactional emails)
/// key on it, so any generator must keep producing
/// `ORD-` + 4-digit year + 6 digits + 2 uppercase base36 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Wrap an identifier received from a client or read from storage.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Whether the identifier matches the canonical generated format.
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        ORDER_ID_RE.is_match(&self.0)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Order lifecycle status.
///
/// `confirmed` is set at creation; every later value arrives through the
/// order-status webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is not one of the six known values.
#[derive(thiserror::Error, Debug, Clone)]
#[error("invalid order status: {0}")]
pub struct StatusParseError(pub String);

impl std::str::FromStr for OrderStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(StatusParseError(s.to_owned())),
        }
    }
}

/// A cart line frozen into an order.
///
/// `subtotal` is computed once at order creation; later catalog price
/// changes must not affect placed orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image: String,
    pub size: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
}

impl OrderItem {
    /// Snapshot a cart line, freezing its subtotal.
    #[must_use]
    pub fn from_cart(item: CartItem) -> Self {
        let subtotal = item.line_total();
        Self {
            id: item.id,
            name: item.name,
            price: item.price,
            image: item.image,
            size: item.size,
            quantity: item.quantity,
            subtotal,
        }
    }
}

/// Order money summary.
///
/// Invariant: `total = subtotal + shipping` and `subtotal` equals the sum of
/// the item subtotals. [`OrderTotals::new`] upholds the first half by
/// construction; [`crate::pricing::compute_totals`] upholds both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl OrderTotals {
    #[must_use]
    pub fn new(subtotal: Decimal, shipping: Decimal) -> Self {
        Self {
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }
}

/// A placed order.
///
/// Created exactly once, after a successful charge. `status` is the only
/// field that changes afterwards (driven by the order-status webhook);
/// everything else is a frozen snapshot of the checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub payment: PaymentInfo,
    pub totals: OrderTotals,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_id_canonical_format() {
        assert!(OrderId::new("ORD-2025-483920KJ").is_canonical());
        assert!(!OrderId::new("ORD-2025-483920kj").is_canonical());
        assert!(!OrderId::new("ORD-25-483920KJ").is_canonical());
        assert!(!OrderId::new("483920KJ").is_canonical());
    }

    #[test]
    fn test_order_id_serializes_transparently() {
        let id = OrderId::new("ORD-2025-483920KJ");
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"ORD-2025-483920KJ\""
        );
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_status_rejects_unknown_value() {
        assert!("spedito".parse::<OrderStatus>().is_err());
        assert!("".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_status_wire_name_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Shipped).unwrap(),
            "\"shipped\""
        );
    }

    #[test]
    fn test_order_item_freezes_subtotal() {
        let cart_item = CartItem {
            id: "rec1".to_owned(),
            name: "Mocassino".to_owned(),
            price: dec!(159.00),
            image: "/images/mocassino.jpg".to_owned(),
            size: "42".to_owned(),
            quantity: 3,
        };
        let item = OrderItem::from_cart(cart_item);
        assert_eq!(item.subtotal, dec!(477.00));
    }

    #[test]
    fn test_totals_uphold_sum_invariant() {
        let totals = OrderTotals::new(dec!(200.00), dec!(7.90));
        assert_eq!(totals.total, dec!(207.90));
    }

    #[test]
    fn test_totals_serialize_as_numbers() {
        let totals = OrderTotals::new(dec!(200), dec!(0));
        let json = serde_json::to_value(totals).unwrap();
        assert_eq!(json["subtotal"], serde_json::json!(200.0));
        assert_eq!(json["total"], serde_json::json!(200.0));
    }
}
