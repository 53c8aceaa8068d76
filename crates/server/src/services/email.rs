//! Transactional email for order events.
//!
//! Uses the Resend HTTP API for delivery with Askama HTML templates. A
//! missing API key turns every send into a logged no-op.

use askama::Template;
use chrono::Locale;
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use denif_core::{Order, OrderStatus, PaymentMethod};

use crate::config::ResendConfig;

/// Resend send endpoint.
const API_URL: &str = "https://api.resend.com/emails";

/// One line of the order summary, preformatted for the templates.
struct ItemRow<'a> {
    name: &'a str,
    size: &'a str,
    quantity: u32,
    unit_price: String,
    line_total: String,
}

/// HTML template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    name: &'a str,
    order_id: &'a str,
    items: &'a [ItemRow<'a>],
    subtotal: &'a str,
    shipping: &'a str,
    total: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    address: &'a str,
    postal_code: &'a str,
    city: &'a str,
    country: &'a str,
    delivery: &'a str,
    store_email: &'a str,
}

/// Plain text template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    name: &'a str,
    order_id: &'a str,
    items: &'a [ItemRow<'a>],
    subtotal: &'a str,
    shipping: &'a str,
    total: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    address: &'a str,
    postal_code: &'a str,
    city: &'a str,
    country: &'a str,
    payment_method: &'a str,
    transaction_id: &'a str,
}

/// HTML template for the shipping notification email.
#[derive(Template)]
#[template(path = "email/shipping_notification.html")]
struct ShippingNotificationHtml<'a> {
    name: &'a str,
    order_id: &'a str,
    carrier: &'a str,
    tracking_number: &'a str,
}

/// Plain text template for the shipping notification email.
#[derive(Template)]
#[template(path = "email/shipping_notification.txt")]
struct ShippingNotificationText<'a> {
    name: &'a str,
    order_id: &'a str,
    carrier: &'a str,
    tracking_number: &'a str,
}

/// HTML template for the status update email.
#[derive(Template)]
#[template(path = "email/status_update.html")]
struct StatusUpdateHtml<'a> {
    name: &'a str,
    order_id: &'a str,
    message: &'a str,
}

/// Plain text template for the status update email.
#[derive(Template)]
#[template(path = "email/status_update.txt")]
struct StatusUpdateText<'a> {
    name: &'a str,
    order_id: &'a str,
    phrase: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to build the API client.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// What a delivery attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message was accepted by the API.
    Sent,
    /// No API key is configured; the message was logged and dropped.
    NotConfigured,
}

/// Mailer for transactional order emails.
#[derive(Clone)]
pub struct Mailer {
    client: Option<reqwest::Client>,
    store_name: String,
    store_email: String,
}

impl Mailer {
    /// Create a new mailer.
    ///
    /// Without a Resend configuration the mailer still constructs; every
    /// send then reports [`SendOutcome::NotConfigured`].
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(
        config: Option<&ResendConfig>,
        store_name: &str,
        store_email: &str,
    ) -> Result<Self, EmailError> {
        let client = match config {
            Some(resend) => {
                let mut headers = HeaderMap::new();

                let auth_value = format!("Bearer {}", resend.api_key.expose_secret());
                headers.insert(
                    "Authorization",
                    HeaderValue::from_str(&auth_value)
                        .map_err(|e| EmailError::Parse(format!("Invalid API key format: {e}")))?,
                );

                Some(
                    reqwest::Client::builder()
                        .default_headers(headers)
                        .build()?,
                )
            }
            None => None,
        };

        Ok(Self {
            client,
            store_name: store_name.to_owned(),
            store_email: store_email.to_owned(),
        })
    }

    /// Send the order confirmation after a successful checkout.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send or a template fails to
    /// render.
    pub async fn send_order_confirmation(&self, order: &Order) -> Result<SendOutcome, EmailError> {
        let name = order.customer.full_name();
        let items = item_rows(order);
        let subtotal = format!("{:.2}", order.totals.subtotal);
        let shipping = shipping_label(order.totals.shipping);
        let total = format!("{:.2}", order.totals.total);
        let delivery = delivery_estimate(order);
        let customer = &order.customer;

        let html = OrderConfirmationHtml {
            name: &name,
            order_id: order.order_id.as_str(),
            items: &items,
            subtotal: &subtotal,
            shipping: &shipping,
            total: &total,
            first_name: &customer.first_name,
            last_name: &customer.last_name,
            address: &customer.address,
            postal_code: &customer.postal_code,
            city: &customer.city,
            country: &customer.country,
            delivery: &delivery,
            store_email: &self.store_email,
        }
        .render()?;

        let text = OrderConfirmationText {
            name: &name,
            order_id: order.order_id.as_str(),
            items: &items,
            subtotal: &subtotal,
            shipping: &shipping,
            total: &total,
            first_name: &customer.first_name,
            last_name: &customer.last_name,
            address: &customer.address,
            postal_code: &customer.postal_code,
            city: &customer.city,
            country: &customer.country,
            payment_method: payment_method_label(order.payment.method),
            transaction_id: order.payment.transaction_id.as_deref().unwrap_or_default(),
        }
        .render()?;

        let subject = format!("Conferma Ordine {} - {}", order.order_id, self.store_name);
        self.send(&customer.email, &subject, &html, &text).await
    }

    /// Send the shipping notification with the carrier and tracking number.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send or a template fails to
    /// render.
    pub async fn send_shipping_notification(
        &self,
        order: &Order,
        tracking_number: &str,
        carrier: &str,
    ) -> Result<SendOutcome, EmailError> {
        let name = order.customer.full_name();

        let html = ShippingNotificationHtml {
            name: &name,
            order_id: order.order_id.as_str(),
            carrier,
            tracking_number,
        }
        .render()?;

        let text = ShippingNotificationText {
            name: &name,
            order_id: order.order_id.as_str(),
            carrier,
            tracking_number,
        }
        .render()?;

        let subject = format!("Il tuo ordine {} è stato spedito! 📦", order.order_id);
        self.send(&order.customer.email, &subject, &html, &text)
            .await
    }

    /// Send a plain status update for any other order transition.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send or a template fails to
    /// render.
    pub async fn send_status_update(
        &self,
        order: &Order,
        status: OrderStatus,
    ) -> Result<SendOutcome, EmailError> {
        let name = order.customer.full_name();
        let message = status_message(status);

        let html = StatusUpdateHtml {
            name: &name,
            order_id: order.order_id.as_str(),
            message: &message,
        }
        .render()?;

        let text = StatusUpdateText {
            name: &name,
            order_id: order.order_id.as_str(),
            phrase: status_phrase(status),
        }
        .render()?;

        let subject = format!("Aggiornamento ordine {}", order.order_id);
        self.send(&order.customer.email, &subject, &html, &text)
            .await
    }

    /// Deliver one message with both HTML and plain text bodies.
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: &str,
    ) -> Result<SendOutcome, EmailError> {
        let Some(client) = &self.client else {
            warn!(subject = %subject, "Resend is not configured, skipping email");
            return Ok(SendOutcome::NotConfigured);
        };

        let body = json!({
            "from": format!("{} <{}>", self.store_name, self.store_email),
            "to": [to],
            "subject": subject,
            "html": html,
            "text": text,
        });

        let response = client.post(API_URL).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(SendOutcome::Sent)
    }
}

fn item_rows(order: &Order) -> Vec<ItemRow<'_>> {
    order
        .items
        .iter()
        .map(|item| ItemRow {
            name: &item.name,
            size: &item.size,
            quantity: item.quantity,
            unit_price: format!("{:.2}", item.price),
            line_total: format!("{:.2}", item.subtotal),
        })
        .collect()
}

fn shipping_label(amount: Decimal) -> String {
    if amount.is_zero() {
        "Gratuita".to_owned()
    } else {
        format!("€{amount:.2}")
    }
}

/// Delivery estimate as customer-facing Italian text.
fn delivery_estimate(order: &Order) -> String {
    order.estimated_delivery.map_or_else(
        || "3-5 giorni lavorativi".to_owned(),
        |date| {
            date.format_localized("%A %-d %B %Y", Locale::it_IT)
                .to_string()
        },
    )
}

fn status_message(status: OrderStatus) -> String {
    match status {
        OrderStatus::Processing => "Il tuo ordine è in preparazione".to_owned(),
        OrderStatus::Shipped => "Il tuo ordine è stato spedito".to_owned(),
        OrderStatus::Delivered => "Il tuo ordine è stato consegnato".to_owned(),
        OrderStatus::Cancelled => "Il tuo ordine è stato cancellato".to_owned(),
        other => format!("Il tuo ordine è: {other}"),
    }
}

const fn status_phrase(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Processing => "in preparazione",
        OrderStatus::Shipped => "spedito",
        OrderStatus::Delivered => "consegnato",
        OrderStatus::Cancelled => "cancellato",
        other => other.as_str(),
    }
}

const fn payment_method_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Card => "Carta di Credito/Debito",
        PaymentMethod::Paypal => "PayPal",
        PaymentMethod::BankTransfer => "Bonifico Bancario",
    }
}
