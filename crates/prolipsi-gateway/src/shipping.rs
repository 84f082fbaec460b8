//! # Shipping Quotes
//!
//! Live quotes from the shipping-quote service, with the regional table in
//! `prolipsi_core::shipping` as a safety net.
//!
//! ```text
//! quote_or_fallback(dest)
//!      │
//!      ├── no live quoter configured ─────────────────┐
//!      ▼                                              │
//! timeout(shipping_timeout, quoter.quote(dest))       │
//!      │                                              │
//!      ├── Ok(non-empty) ──► QuoteOutcome { Live }    │
//!      │                                              ▼
//!      └── Err / elapsed / empty ──────► fallback_quotes(dest) ──► { Fallback }
//! ```
//!
//! The checkout never blocks on a slow carrier API: the buyer always gets a
//! list to pick from.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use prolipsi_core::shipping::{fallback_quotes, ShippingQuote};
use prolipsi_core::{Money, PostalCode};

const SERVICE: &str = "shipping";

// =============================================================================
// Request / Response Types
// =============================================================================

/// One box to ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub weight_grams: u32,
    pub height_cm: u32,
    pub width_cm: u32,
    pub length_cm: u32,
}

impl Default for Package {
    /// A small box, used when the product carries no dimensions.
    fn default() -> Self {
        Package {
            weight_grams: 500,
            height_cm: 10,
            width_cm: 15,
            length_cm: 20,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest<'a> {
    from: &'a str,
    to: &'a str,
    packages: &'a [Package],
}

/// A carrier option as the quote service reports it. Prices are reais.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveQuote {
    id: String,
    carrier: String,
    service: String,
    #[serde(default)]
    price: f64,
    #[serde(default)]
    delivery_days: u32,
    /// Set when the carrier cannot serve this route.
    #[serde(default)]
    error: Option<String>,
}

impl LiveQuote {
    fn into_quote(self) -> Option<ShippingQuote> {
        let price = Money::from_reais_lossy(self.price);
        if self.error.is_some() || !price.is_positive() {
            return None;
        }
        Some(ShippingQuote {
            id: self.id,
            carrier: self.carrier,
            service: self.service,
            price,
            delivery_days: self.delivery_days,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    Live,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteOutcome {
    pub quotes: Vec<ShippingQuote>,
    pub source: QuoteSource,
}

// =============================================================================
// Quoter
// =============================================================================

#[async_trait]
pub trait ShippingQuoter: Send + Sync {
    async fn quote(
        &self,
        destination: &PostalCode,
        packages: &[Package],
    ) -> GatewayResult<Vec<ShippingQuote>>;
}

#[derive(Debug, Clone)]
pub struct ShippingQuoteClient {
    client: reqwest::Client,
    url: String,
    origin: String,
}

impl ShippingQuoteClient {
    /// Returns `None` when no quote service URL is configured.
    pub fn new(config: &GatewayConfig) -> GatewayResult<Option<Self>> {
        let Some(url) = config.shipping_quote_url.clone() else {
            return Ok(None);
        };
        Ok(Some(ShippingQuoteClient {
            client: config.http_client()?,
            url,
            origin: config.origin_postal_code.clone(),
        }))
    }
}

#[async_trait]
impl ShippingQuoter for ShippingQuoteClient {
    async fn quote(
        &self,
        destination: &PostalCode,
        packages: &[Package],
    ) -> GatewayResult<Vec<ShippingQuote>> {
        let request = QuoteRequest {
            from: &self.origin,
            to: destination.digits(),
            packages,
        };

        let response = self.client.post(&self.url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::UnexpectedStatus {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let live: Vec<LiveQuote> = response.json().await.map_err(|e| GatewayError::Decode {
            service: SERVICE,
            reason: e.to_string(),
        })?;

        Ok(live.into_iter().filter_map(LiveQuote::into_quote).collect())
    }
}

/// Live quotes when the service answers in time with at least one usable
/// option, otherwise the regional fallback table. Never fails.
pub async fn quote_or_fallback(
    quoter: Option<&dyn ShippingQuoter>,
    destination: &PostalCode,
    packages: &[Package],
    timeout: Duration,
) -> QuoteOutcome {
    let fallback = || QuoteOutcome {
        quotes: fallback_quotes(destination),
        source: QuoteSource::Fallback,
    };

    let Some(quoter) = quoter else {
        debug!(cep = %destination, "No live quoter configured, using fallback table");
        return fallback();
    };

    match tokio::time::timeout(timeout, quoter.quote(destination, packages)).await {
        Ok(Ok(quotes)) if !quotes.is_empty() => {
            debug!(cep = %destination, count = quotes.len(), "Live shipping quotes");
            QuoteOutcome {
                quotes,
                source: QuoteSource::Live,
            }
        }
        Ok(Ok(_)) => {
            warn!(cep = %destination, "Quote service returned no options, using fallback table");
            fallback()
        }
        Ok(Err(e)) => {
            warn!(cep = %destination, error = %e, "Quote service failed, using fallback table");
            fallback()
        }
        Err(_) => {
            warn!(
                cep = %destination,
                timeout_ms = timeout.as_millis() as u64,
                "Quote service timed out, using fallback table"
            );
            fallback()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(GatewayResult<Vec<ShippingQuote>>);

    #[async_trait]
    impl ShippingQuoter for Fixed {
        async fn quote(&self, _: &PostalCode, _: &[Package]) -> GatewayResult<Vec<ShippingQuote>> {
            match &self.0 {
                Ok(quotes) => Ok(quotes.clone()),
                Err(_) => Err(GatewayError::Decode {
                    service: SERVICE,
                    reason: "boom".to_string(),
                }),
            }
        }
    }

    struct Slow;

    #[async_trait]
    impl ShippingQuoter for Slow {
        async fn quote(&self, _: &PostalCode, _: &[Package]) -> GatewayResult<Vec<ShippingQuote>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }
    }

    fn cep() -> PostalCode {
        PostalCode::parse("30130-010").unwrap()
    }

    fn live_quote() -> ShippingQuote {
        ShippingQuote {
            id: "loggi".to_string(),
            carrier: "Loggi".to_string(),
            service: "Expresso".to_string(),
            price: Money::from_cents(1_875),
            delivery_days: 2,
        }
    }

    #[tokio::test]
    async fn test_live_quotes_win() {
        let quoter = Fixed(Ok(vec![live_quote()]));
        let outcome =
            quote_or_fallback(Some(&quoter), &cep(), &[Package::default()], Duration::from_secs(1)).await;
        assert_eq!(outcome.source, QuoteSource::Live);
        assert_eq!(outcome.quotes, vec![live_quote()]);
    }

    #[tokio::test]
    async fn test_error_empty_and_missing_fall_back() {
        let expected = fallback_quotes(&cep());

        let failing = Fixed(Err(GatewayError::MissingCredentials("shipping")));
        let outcome = quote_or_fallback(Some(&failing), &cep(), &[], Duration::from_secs(1)).await;
        assert_eq!(outcome.source, QuoteSource::Fallback);
        assert_eq!(outcome.quotes, expected);

        let empty = Fixed(Ok(Vec::new()));
        let outcome = quote_or_fallback(Some(&empty), &cep(), &[], Duration::from_secs(1)).await;
        assert_eq!(outcome.source, QuoteSource::Fallback);

        let outcome = quote_or_fallback(None, &cep(), &[], Duration::from_secs(1)).await;
        assert_eq!(outcome.quotes, expected);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let outcome = quote_or_fallback(Some(&Slow), &cep(), &[], Duration::from_millis(100)).await;
        assert_eq!(outcome.source, QuoteSource::Fallback);
    }

    #[test]
    fn test_unusable_live_entries_are_dropped() {
        let body = r#"[
            {"id":"pac","carrier":"Correios","service":"PAC","price":23.5,"deliveryDays":7},
            {"id":"sedex","carrier":"Correios","service":"SEDEX","price":0,"deliveryDays":2},
            {"id":"azul","carrier":"Azul Cargo","service":"Amanhã","price":40.0,"error":"Rota indisponível"}
        ]"#;
        let live: Vec<LiveQuote> = serde_json::from_str(body).unwrap();
        let quotes: Vec<_> = live.into_iter().filter_map(LiveQuote::into_quote).collect();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].price, Money::from_cents(2_350));
    }
}
