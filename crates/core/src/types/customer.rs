//! Checkout customer details.

use serde::{Deserialize, Serialize};

use crate::validate::sanitize_input;

/// Customer contact and shipping details submitted with a checkout.
///
/// Every field except `notes` is mandatory; see [`crate::validate`] for the
/// field rules. The struct is transient: it lives for the duration of one
/// checkout submission and is then frozen into the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CustomerInfo {
    /// Returns a copy with every text field HTML-escaped.
    ///
    /// For callers embedding customer text in markup without a template
    /// engine. Escaping is idempotent: `&` is never re-escaped.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        Self {
            first_name: sanitize_input(&self.first_name),
            last_name: sanitize_input(&self.last_name),
            email: sanitize_input(&self.email),
            phone: sanitize_input(&self.phone),
            address: sanitize_input(&self.address),
            city: sanitize_input(&self.city),
            postal_code: sanitize_input(&self.postal_code),
            country: sanitize_input(&self.country),
            notes: self.notes.as_deref().map(sanitize_input),
        }
    }

    /// Full name as rendered in emails and CRM records.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
