//! AirTable client for the order CRM table.
//!
//! Orders are mirrored into AirTable after checkout so the artisan can work
//! them from a spreadsheet view. Every call here is best-effort from the
//! caller's perspective; a lost sync never fails an order.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{instrument, warn};

use denif_core::{Order, OrderId, OrderStatus};

use crate::config::AirtableConfig;

/// AirTable API base URL.
const BASE_URL: &str = "https://api.airtable.com/v0";

/// Errors that can occur when talking to AirTable.
#[derive(Debug, Error)]
pub enum AirtableError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// AirTable order-table client.
#[derive(Clone)]
pub struct AirtableOrdersClient {
    client: reqwest::Client,
    base_id: String,
    table: String,
}

impl AirtableOrdersClient {
    /// Create a new client for the configured base and orders table.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &AirtableConfig) -> Result<Self, AirtableError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| AirtableError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_id: config.base_id.clone(),
            table: config.orders_table.clone(),
        })
    }

    fn table_url(&self) -> String {
        format!(
            "{BASE_URL}/{}/{}",
            self.base_id,
            urlencoding::encode(&self.table)
        )
    }

    /// Mirror a freshly placed order into the CRM table.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, order), fields(order_id = %order.order_id))]
    pub async fn create_order_record(&self, order: &Order) -> Result<(), AirtableError> {
        let body = json!({
            "records": [{ "fields": order_fields(order, Utc::now()) }]
        });

        let response = self.client.post(self.table_url()).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AirtableError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    /// AirTable record id for an order, or `None` when it was never synced.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn find_record_id(&self, order_id: &OrderId) -> Result<Option<String>, AirtableError> {
        let formula = format!("{{OrderID}}=\"{order_id}\"");
        let url = format!(
            "{}?filterByFormula={}",
            self.table_url(),
            urlencoding::encode(&formula)
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AirtableError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let listing: RecordListing = response
            .json()
            .await
            .map_err(|e| AirtableError::Parse(e.to_string()))?;

        Ok(listing.records.into_iter().next().map(|record| record.id))
    }

    /// Move an order to a new status. `Ok(false)` when AirTable has no
    /// record for it (non-fatal: the local store stays authoritative).
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<bool, AirtableError> {
        self.patch_order(order_id, status, serde_json::Map::new())
            .await
    }

    /// Mark an order shipped with its tracking details.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn update_shipping_info(
        &self,
        order_id: &OrderId,
        tracking_number: &str,
        carrier: &str,
    ) -> Result<bool, AirtableError> {
        let mut extra = serde_json::Map::new();
        extra.insert("TrackingNumber".to_owned(), json!(tracking_number));
        extra.insert("Carrier".to_owned(), json!(carrier));

        self.patch_order(order_id, OrderStatus::Shipped, extra).await
    }

    async fn patch_order(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> Result<bool, AirtableError> {
        let Some(record_id) = self.find_record_id(order_id).await? else {
            warn!(%order_id, "Order not found in AirTable, skipping status update");
            return Ok(false);
        };

        let mut fields = serde_json::Map::new();
        fields.insert("Status".to_owned(), json!(status));
        fields.insert("UpdatedAt".to_owned(), json!(Utc::now().to_rfc3339()));
        fields.extend(extra);

        let url = format!("{}/{record_id}", self.table_url());
        let response = self
            .client
            .patch(&url)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        let status_code = response.status();

        if !status_code.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AirtableError::Api {
                status: status_code.as_u16(),
                message,
            });
        }

        Ok(true)
    }
}

/// CRM column values for one order.
fn order_fields(order: &Order, now: DateTime<Utc>) -> serde_json::Value {
    let items: Vec<serde_json::Value> = order
        .items
        .iter()
        .map(|item| {
            json!({
                "productId": item.id,
                "name": item.name,
                "quantity": item.quantity,
                "price": item.price.to_f64().unwrap_or_default(),
            })
        })
        .collect();

    json!({
        "OrderID": order.order_id,
        "CustomerEmail": order.customer.email,
        "CustomerName": order.customer.full_name(),
        "CustomerPhone": order.customer.phone,
        "ShippingAddress": order.customer.address,
        "City": order.customer.city,
        "PostalCode": order.customer.postal_code,
        "Country": order.customer.country,
        "OrderItems": serde_json::to_string(&items).unwrap_or_default(),
        "TotalAmount": order.totals.total.to_f64().unwrap_or_default(),
        "PaymentMethod": order.payment.method,
        "TransactionID": order.payment.transaction_id.clone().unwrap_or_default(),
        "Status": order.status,
        "EstimatedDelivery": order
            .estimated_delivery
            .map(|date| date.to_rfc3339())
            .unwrap_or_default(),
        "Notes": order.customer.notes.clone().unwrap_or_default(),
        "CreatedAt": now.to_rfc3339(),
        "UpdatedAt": now.to_rfc3339(),
    })
}

/// Wrapper for a record listing response.
#[derive(Debug, Deserialize)]
struct RecordListing {
    records: Vec<RecordRef>,
}

#[derive(Debug, Deserialize)]
struct RecordRef {
    id: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use denif_core::{CartItem, CustomerInfo, OrderItem, OrderTotals, PaymentInfo};
    use denif_core::{PaymentMethod, PaymentStatus};
    use rust_decimal_macros::dec;

    fn order() -> Order {
        Order {
            order_id: OrderId::new("ORD-2024-483920KJ"),
            customer: CustomerInfo {
                first_name: "Maria".to_owned(),
                last_name: "Rossi".to_owned(),
                email: "maria.rossi@example.it".to_owned(),
                phone: "3451234567".to_owned(),
                address: "Via Condotti 12".to_owned(),
                city: "Roma".to_owned(),
                postal_code: "00187".to_owned(),
                country: "Italia".to_owned(),
                notes: Some("Citofono Rossi".to_owned()),
            },
            items: vec![OrderItem::from_cart(CartItem {
                id: "1".to_owned(),
                name: "Décolleté Classica in Pelle".to_owned(),
                price: dec!(280.00),
                image: "/images/decollete.jpg".to_owned(),
                size: "38".to_owned(),
                quantity: 2,
            })],
            payment: PaymentInfo {
                method: PaymentMethod::Card,
                transaction_id: Some("CARD-1700000000000-A1B2C3".to_owned()),
                status: PaymentStatus::Completed,
            },
            totals: OrderTotals::new(dec!(560.00), dec!(0.00)),
            status: OrderStatus::Confirmed,
            created_at: Utc.with_ymd_and_hms(2024, 11, 14, 10, 0, 0).unwrap(),
            estimated_delivery: Some(Utc.with_ymd_and_hms(2024, 11, 18, 10, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_order_fields_columns() {
        let now = Utc.with_ymd_and_hms(2024, 11, 14, 10, 5, 0).unwrap();
        let fields = order_fields(&order(), now);

        assert_eq!(fields["OrderID"], "ORD-2024-483920KJ");
        assert_eq!(fields["CustomerName"], "Maria Rossi");
        assert_eq!(fields["CustomerEmail"], "maria.rossi@example.it");
        assert_eq!(fields["TotalAmount"], json!(560.0));
        assert_eq!(fields["PaymentMethod"], "card");
        assert_eq!(fields["Status"], "confirmed");
        assert_eq!(fields["TransactionID"], "CARD-1700000000000-A1B2C3");
        assert_eq!(fields["Notes"], "Citofono Rossi");
        assert_eq!(fields["CreatedAt"], fields["UpdatedAt"]);
    }

    #[test]
    fn test_order_items_column_is_json_text() {
        let now = Utc.with_ymd_and_hms(2024, 11, 14, 10, 5, 0).unwrap();
        let fields = order_fields(&order(), now);

        let raw = fields["OrderItems"].as_str().unwrap();
        let items: serde_json::Value = serde_json::from_str(raw).unwrap();
        assert_eq!(items[0]["productId"], "1");
        assert_eq!(items[0]["quantity"], 2);
        assert_eq!(items[0]["price"], json!(280.0));
    }

    #[test]
    fn test_delivery_estimate_is_the_stored_one() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let fields = order_fields(&order(), now);

        // Subsequent syncs must not shift the promised date
        assert_eq!(fields["EstimatedDelivery"], "2024-11-18T10:00:00+00:00");
    }

    #[test]
    fn test_table_url_encodes_the_table_name() {
        let config = AirtableConfig {
            api_key: secrecy::SecretString::from("keyXXXXXXXXXXXXXX"),
            base_id: "appABC123".to_owned(),
            orders_table: "Ordini Denif".to_owned(),
            products_table: "Prodotti".to_owned(),
        };
        let client = AirtableOrdersClient::new(&config).unwrap();

        assert_eq!(
            client.table_url(),
            "https://api.airtable.com/v0/appABC123/Ordini%20Denif"
        );
    }
}
