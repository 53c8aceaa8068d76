//! Cart pricing: subtotal, shipping, and order totals.

use rust_decimal::Decimal;

use crate::types::{CartItem, OrderTotals};

/// Shipping cost policy.
///
/// Both knobs come from deployment configuration; nothing in this crate
/// hardcodes a rate or a threshold. The store default is a flat rate of
/// zero (shipping included in the price), in which case `free_over` is
/// irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    /// Flat shipping cost applied per order.
    pub flat_rate: Decimal,
    /// Orders with a subtotal at or above this ship free.
    pub free_over: Option<Decimal>,
}

impl ShippingPolicy {
    /// Shipping included in the item prices.
    #[must_use]
    pub const fn included() -> Self {
        Self {
            flat_rate: Decimal::ZERO,
            free_over: None,
        }
    }

    /// Shipping cost for a given cart subtotal.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        match self.free_over {
            Some(threshold) if subtotal >= threshold => Decimal::ZERO,
            _ => self.flat_rate,
        }
    }
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self::included()
    }
}

/// Sum of `price × quantity` over the cart.
#[must_use]
pub fn cart_subtotal(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_total).sum()
}

/// Compute the totals an order will carry.
///
/// Upholds both totals invariants: the subtotal is the sum of the line
/// totals and `total = subtotal + shipping`.
#[must_use]
pub fn compute_totals(items: &[CartItem], policy: &ShippingPolicy) -> OrderTotals {
    let subtotal = cart_subtotal(items);
    OrderTotals::new(subtotal, policy.shipping_for(subtotal))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(price: Decimal, quantity: u32) -> CartItem {
        CartItem {
            id: "1".to_owned(),
            name: "Sandalo gioiello".to_owned(),
            price,
            image: "/images/sandalo.jpg".to_owned(),
            size: "37".to_owned(),
            quantity,
        }
    }

    #[test]
    fn test_flat_zero_shipping() {
        // price 100 × 2 with shipping included: subtotal 200, total 200
        let totals = compute_totals(&[item(dec!(100), 2)], &ShippingPolicy::included());
        assert_eq!(totals.subtotal, dec!(200));
        assert_eq!(totals.shipping, dec!(0));
        assert_eq!(totals.total, dec!(200));
    }

    #[test]
    fn test_subtotal_sums_lines() {
        let items = [item(dec!(189.50), 1), item(dec!(79.90), 2)];
        assert_eq!(cart_subtotal(&items), dec!(349.30));
    }

    #[test]
    fn test_flat_rate_added_below_threshold() {
        let policy = ShippingPolicy {
            flat_rate: dec!(7.90),
            free_over: Some(dec!(150)),
        };
        let totals = compute_totals(&[item(dec!(100), 1)], &policy);
        assert_eq!(totals.shipping, dec!(7.90));
        assert_eq!(totals.total, dec!(107.90));
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let policy = ShippingPolicy {
            flat_rate: dec!(7.90),
            free_over: Some(dec!(150)),
        };
        let totals = compute_totals(&[item(dec!(75), 2)], &policy);
        assert_eq!(totals.shipping, dec!(0));
        assert_eq!(totals.total, dec!(150));
    }

    #[test]
    fn test_empty_cart_subtotal_is_zero() {
        assert_eq!(cart_subtotal(&[]), Decimal::ZERO);
    }
}
