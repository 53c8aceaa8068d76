//! Simulated payment processor for development and test-key setups.

use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use denif_core::PaymentMethod;

use super::{ChargeOutcome, GatewayError, PaymentGateway};

/// Simulated processor latency, milliseconds.
const DEFAULT_LATENCY_MS: RangeInclusive<u64> = 2000..=3000;

/// Fraction of simulated charges that succeed.
const SUCCESS_RATE: f64 = 0.9;

const CARD_FAILURES: &[&str] = &[
    "Carta rifiutata dalla banca",
    "Fondi insufficienti",
    "Errore di verifica della carta",
    "Tempo limite della transazione",
];

const PAYPAL_FAILURES: &[&str] = &[
    "Account PayPal non verificato",
    "Errore di connessione con PayPal",
    "Limite superato per questo account",
];

const BANK_FAILURES: &[&str] = &["Errore di elaborazione bonifico", "Dati bancari non validi"];

/// Gateway that approves 90% of charges after a random delay.
///
/// Declines draw a canned message from the method's pool. The RNG and the
/// latency window are injectable so tests can force outcomes and skip the
/// delay.
pub struct SimulatedGateway {
    rng: Mutex<StdRng>,
    latency_ms: RangeInclusive<u64>,
}

impl SimulatedGateway {
    /// Gateway with production-like latency and an OS-seeded RNG.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng(), DEFAULT_LATENCY_MS)
    }

    /// Gateway with a caller-controlled RNG and latency window.
    #[must_use]
    pub fn with_rng(rng: StdRng, latency_ms: RangeInclusive<u64>) -> Self {
        Self {
            rng: Mutex::new(rng),
            latency_ms,
        }
    }

    fn failure_pool(method: PaymentMethod) -> &'static [&'static str] {
        match method {
            PaymentMethod::Card => CARD_FAILURES,
            PaymentMethod::Paypal => PAYPAL_FAILURES,
            PaymentMethod::BankTransfer => BANK_FAILURES,
        }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(
        &self,
        _amount: Decimal,
        method: PaymentMethod,
        _method_token: Option<&str>,
    ) -> Result<ChargeOutcome, GatewayError> {
        // Draw everything up front; the lock is not held across the sleep
        let (delay_ms, outcome) = {
            let mut rng = self.rng.lock().await;
            let delay_ms = rng.random_range(self.latency_ms.clone());

            let outcome = if rng.random::<f64>() < SUCCESS_RATE {
                ChargeOutcome::Approved {
                    transaction_id: transaction_id(method, &mut *rng),
                }
            } else {
                let message = Self::failure_pool(method)
                    .choose(&mut *rng)
                    .copied()
                    .unwrap_or("Pagamento fallito");
                ChargeOutcome::Declined {
                    message: message.to_owned(),
                    requires_action: false,
                    client_secret: None,
                }
            };
            (delay_ms, outcome)
        };

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(outcome)
    }
}

/// `{CARD|PAYPAL|BANK}-{epoch ms}-{6 uppercase base36 chars}`.
fn transaction_id(method: PaymentMethod, rng: &mut impl Rng) -> String {
    let timestamp = Utc::now().timestamp_millis();
    let tag: String = (0..6)
        .map(|_| {
            let digit = rng.random_range(0..36_u32);
            char::from_digit(digit, 36)
                .unwrap_or('0')
                .to_ascii_uppercase()
        })
        .collect();

    format!("{}-{timestamp}-{tag}", method.transaction_prefix())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_gateway(seed: u64) -> SimulatedGateway {
        SimulatedGateway::with_rng(StdRng::seed_from_u64(seed), 0..=0)
    }

    fn assert_transaction_shape(txn: &str, method: PaymentMethod) {
        let mut parts = txn.split('-');
        assert_eq!(parts.next().unwrap(), method.transaction_prefix());
        let millis = parts.next().unwrap();
        assert!(!millis.is_empty() && millis.bytes().all(|b| b.is_ascii_digit()));
        let tag = parts.next().unwrap();
        assert_eq!(tag.len(), 6);
        assert!(tag.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()));
        assert!(parts.next().is_none());
    }

    #[tokio::test]
    async fn test_every_outcome_is_well_formed() {
        let gateway = test_gateway(11);

        for method in [
            PaymentMethod::Card,
            PaymentMethod::Paypal,
            PaymentMethod::BankTransfer,
        ] {
            for _ in 0..40 {
                match gateway.charge(dec!(100.00), method, None).await.unwrap() {
                    ChargeOutcome::Approved { transaction_id } => {
                        assert_transaction_shape(&transaction_id, method);
                    }
                    ChargeOutcome::Declined {
                        message,
                        requires_action,
                        client_secret,
                    } => {
                        assert!(
                            SimulatedGateway::failure_pool(method).contains(&message.as_str()),
                            "message outside the {method} pool: {message}"
                        );
                        assert!(!requires_action);
                        assert!(client_secret.is_none());
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_both_outcomes_occur() {
        // 200 draws at p=0.9: both outcomes appear for any reasonable seed
        let gateway = test_gateway(42);
        let mut approved = 0_u32;
        let mut declined = 0_u32;

        for _ in 0..200 {
            match gateway
                .charge(dec!(50.00), PaymentMethod::Card, None)
                .await
                .unwrap()
            {
                ChargeOutcome::Approved { .. } => approved += 1,
                ChargeOutcome::Declined { .. } => declined += 1,
            }
        }

        assert!(approved > 0, "no charge ever succeeded");
        assert!(declined > 0, "no charge ever failed");
        assert!(approved > declined, "success rate should dominate");
    }

    #[tokio::test]
    async fn test_seeded_rng_is_deterministic() {
        let first = test_gateway(7)
            .charge(dec!(75.00), PaymentMethod::Paypal, None)
            .await
            .unwrap();
        let second = test_gateway(7)
            .charge(dec!(75.00), PaymentMethod::Paypal, None)
            .await
            .unwrap();

        match (&first, &second) {
            (
                ChargeOutcome::Approved { .. },
                ChargeOutcome::Approved { .. },
            ) => {}
            (
                ChargeOutcome::Declined { message: a, .. },
                ChargeOutcome::Declined { message: b, .. },
            ) => assert_eq!(a, b),
            _ => panic!("same seed produced different outcome kinds"),
        }
    }
}
