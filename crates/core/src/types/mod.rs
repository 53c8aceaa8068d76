//! Core types for the Denif store.
//!
//! Wire names follow the storefront clients: multi-word fields are
//! camelCase, enums are lowercase (kebab-case for payment methods), and
//! money travels as plain JSON numbers.

pub mod cart;
pub mod customer;
pub mod order;
pub mod payment;

pub use cart::CartItem;
pub use customer::CustomerInfo;
pub use order::{Order, OrderId, OrderItem, OrderStatus, OrderTotals, StatusParseError};
pub use payment::{PaymentInfo, PaymentMethod, PaymentStatus};
