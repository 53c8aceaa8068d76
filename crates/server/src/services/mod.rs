//! SaaS clients and business services for the store.
//!
//! # Services
//!
//! - `airtable` - AirTable CRM client for the orders table
//! - `cart` - Session cart operations over a [`crate::store::CartStore`]
//! - `catalog` - Product catalog with a daily cache and a mock fallback
//! - `email` - Transactional email via Resend with Askama templates

pub mod airtable;
pub mod cart;
pub mod catalog;
pub mod email;

pub use airtable::{AirtableError, AirtableOrdersClient};
pub use cart::CartService;
pub use catalog::{Catalog, CatalogError, Product};
pub use email::{EmailError, Mailer, SendOutcome};
