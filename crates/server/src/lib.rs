//! Denif order API library.
//!
//! This crate provides the checkout and order-management service as a
//! library, allowing it to be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod payment;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
