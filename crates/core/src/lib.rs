//! Denif Core - Shared domain library.
//!
//! This crate provides the domain model used across the Denif components:
//! - `server` - Checkout, webhook, and catalog HTTP service
//! - `integration-tests` - Router-level test harness
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no storage access. Checkout validation and pricing live here so
//! they can be exercised without standing up the server.
//!
//! # Modules
//!
//! - [`types`] - Cart, customer, order, and payment types
//! - [`validate`] - Customer field validation and input sanitization
//! - [`pricing`] - Subtotal/shipping/total computation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;
pub mod validate;

pub use types::*;
