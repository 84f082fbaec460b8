//! Checkout API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. The product on sale, its order bump and the coupon book come
//! from an optional TOML offer file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use prolipsi_core::checkout::{CheckoutOffer, Coupon, CouponBook, PointsRate};
use prolipsi_core::{CheckoutProduct, OrderBumpOffer, PostalCode, ProductKind};
use prolipsi_gateway::GatewayConfig;

/// Checkout API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Outbound service settings
    pub gateway: GatewayConfig,

    /// TOML offer file; the built-in offer is used when unset
    pub offer_path: Option<PathBuf>,

    /// Checkout sessions untouched this long are dropped
    pub session_idle_timeout: Duration,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let http_port = var("HTTP_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?;

        let shipping_timeout_ms: u64 = var("SHIPPING_TIMEOUT_MS")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SHIPPING_TIMEOUT_MS".to_string()))?;

        let session_idle_minutes: u64 = var("SESSION_IDLE_MINUTES")
            .unwrap_or_else(|| "60".to_string())
            .parse()
            .ok()
            .filter(|minutes| *minutes > 0)
            .ok_or_else(|| ConfigError::InvalidValue("SESSION_IDLE_MINUTES".to_string()))?;

        let mut gateway =
            GatewayConfig::new().shipping_timeout(Duration::from_millis(shipping_timeout_ms));

        if let Some(url) = var("VIACEP_URL") {
            gateway = gateway.viacep_url(url);
        }
        if let Some(url) = var("SHIPPING_QUOTE_URL") {
            gateway = gateway.shipping_quote_url(url);
        }
        if let Some(cep) = var("SHIPPING_ORIGIN_CEP") {
            let origin = PostalCode::parse(&cep)
                .map_err(|_| ConfigError::InvalidValue("SHIPPING_ORIGIN_CEP".to_string()))?;
            gateway = gateway.origin_postal_code(origin.digits());
        }
        if let Some(url) = var("MERCADO_PAGO_URL") {
            gateway = gateway.mercado_pago_url(url);
        }
        if let Some(token) = var("MERCADO_PAGO_ACCESS_TOKEN") {
            gateway = gateway.access_token(token);
        }
        if let Some(url) = var("MERCADO_PAGO_NOTIFICATION_URL") {
            gateway = gateway.notification_url(url);
        }

        Ok(ApiConfig {
            http_port,
            database_path: var("DATABASE_PATH")
                .unwrap_or_else(|| "./prolipsi.db".to_string())
                .into(),
            gateway,
            offer_path: var("CHECKOUT_OFFER_PATH").map(PathBuf::from),
            session_idle_timeout: Duration::from_secs(session_idle_minutes * 60),
        })
    }

    /// Reads the offer file, or returns the built-in offer.
    pub fn load_offer(&self) -> Result<LoadedOffer, ConfigError> {
        match &self.offer_path {
            Some(path) => LoadedOffer::from_file(path),
            None => Ok(LoadedOffer::default()),
        }
    }
}

// =============================================================================
// Offer File
// =============================================================================

/// What the checkout page sells.
#[derive(Debug, Clone)]
pub struct LoadedOffer {
    pub offer: CheckoutOffer,
    pub coupons: CouponBook,
}

/// ```toml
/// points_multiplier = 1.5
///
/// [product]
/// id = "kit-essencial"
/// name = "Kit Prólipsi Essencial"
/// price_cents = 19990
/// kind = "physical"
///
/// [order_bump]
/// id = "guia-uso"
/// name = "Guia de Uso Prólipsi"
/// price_cents = 2990
///
/// [[coupons]]
/// code = "BEMVINDO10"
/// value = 0.10      # below 1: fraction of the subtotal
///
/// [[coupons]]
/// code = "RS20"
/// value = 20.0      # otherwise: reais off
/// ```
#[derive(Debug, Deserialize)]
struct OfferFile {
    product: ProductEntry,
    #[serde(default)]
    order_bump: Option<BumpEntry>,
    #[serde(default)]
    coupons: Vec<CouponEntry>,
    #[serde(default)]
    points_multiplier: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProductEntry {
    id: String,
    name: String,
    price_cents: i64,
    #[serde(default)]
    kind: ProductKind,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BumpEntry {
    id: String,
    name: String,
    price_cents: i64,
}

#[derive(Debug, Deserialize)]
struct CouponEntry {
    code: String,
    value: f64,
}

impl LoadedOffer {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::OfferFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&text).map_err(|e| match e {
            ConfigError::OfferFile { reason, .. } => ConfigError::OfferFile {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let file: OfferFile = toml::from_str(text).map_err(|e| ConfigError::OfferFile {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;

        if file.product.price_cents < 0 {
            return Err(ConfigError::InvalidValue("product.price_cents".to_string()));
        }

        let offer = CheckoutOffer {
            product: CheckoutProduct {
                id: file.product.id,
                name: file.product.name,
                price_cents: file.product.price_cents,
                kind: file.product.kind,
                image_url: file.product.image_url,
            },
            order_bump: file.order_bump.map(|bump| OrderBumpOffer {
                id: bump.id,
                name: bump.name,
                price_cents: bump.price_cents.max(0),
            }),
            points_rate: file
                .points_multiplier
                .map(PointsRate::from_multiplier)
                .unwrap_or_default(),
        };

        let coupons = file
            .coupons
            .iter()
            .map(|entry| Coupon::from_stored_value(&entry.code, entry.value))
            .collect();

        Ok(LoadedOffer { offer, coupons })
    }
}

impl Default for LoadedOffer {
    fn default() -> Self {
        let offer = CheckoutOffer {
            product: CheckoutProduct {
                id: "kit-prolipsi-essencial".to_string(),
                name: "Kit Prólipsi Essencial".to_string(),
                price_cents: 19_990,
                kind: ProductKind::Physical,
                image_url: None,
            },
            order_bump: Some(OrderBumpOffer {
                id: "guia-uso-prolipsi".to_string(),
                name: "Guia de Uso Prólipsi".to_string(),
                price_cents: 2_990,
            }),
            points_rate: PointsRate::default(),
        };

        let coupons = [("BEMVINDO10", 0.10), ("RS20", 20.0)]
            .into_iter()
            .map(|(code, value)| Coupon::from_stored_value(code, value))
            .collect();

        LoadedOffer { offer, coupons }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Cannot read offer file {path}: {reason}")]
    OfferFile { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use prolipsi_core::checkout::CouponDiscount;
    use prolipsi_core::Money;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.database_path, PathBuf::from("./prolipsi.db"));
        assert_eq!(config.gateway.shipping_timeout, Duration::from_millis(3_000));
        assert!(config.gateway.access_token.is_none());
        assert!(config.offer_path.is_none());
        assert_eq!(config.session_idle_timeout, Duration::from_secs(3_600));
    }

    #[test]
    fn test_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("HTTP_PORT", "9090"),
            ("SHIPPING_TIMEOUT_MS", "1500"),
            ("SHIPPING_ORIGIN_CEP", "90010-000"),
            ("MERCADO_PAGO_ACCESS_TOKEN", "APP_USR-1"),
            ("SHIPPING_QUOTE_URL", "http://frete.local/quotes"),
            ("SESSION_IDLE_MINUTES", "15"),
        ]))
        .unwrap();

        assert_eq!(config.session_idle_timeout, Duration::from_secs(900));
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.gateway.shipping_timeout, Duration::from_millis(1_500));
        assert_eq!(config.gateway.origin_postal_code, "90010000");
        assert_eq!(config.gateway.access_token.as_deref(), Some("APP_USR-1"));
        assert!(config.gateway.shipping_quote_url.is_some());
    }

    #[test]
    fn test_invalid_values() {
        let err = ApiConfig::from_lookup(lookup(&[("HTTP_PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "HTTP_PORT"));

        let err = ApiConfig::from_lookup(lookup(&[("SHIPPING_ORIGIN_CEP", "123")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "SHIPPING_ORIGIN_CEP"));

        let err = ApiConfig::from_lookup(lookup(&[("SESSION_IDLE_MINUTES", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "SESSION_IDLE_MINUTES"));
    }

    #[test]
    fn test_offer_from_toml() {
        let loaded = LoadedOffer::from_toml(
            r#"
            points_multiplier = 2.0

            [product]
            id = "curso-online"
            name = "Curso Online Prólipsi"
            price_cents = 9700
            kind = "digital"

            [[coupons]]
            code = "metade"
            value = 0.5
            "#,
        )
        .unwrap();

        assert!(loaded.offer.product.is_digital());
        assert!(loaded.offer.order_bump.is_none());
        assert_eq!(loaded.offer.points_rate, PointsRate::from_multiplier(2.0));
        let coupon = loaded.coupons.find("METADE").unwrap();
        assert!(matches!(coupon.discount, CouponDiscount::Fraction(_)));
    }

    #[test]
    fn test_default_offer() {
        let loaded = LoadedOffer::default();
        assert_eq!(loaded.offer.product.price(), Money::from_cents(19_990));
        assert_eq!(loaded.coupons.len(), 2);
        assert!(matches!(
            loaded.coupons.find("rs20").unwrap().discount,
            CouponDiscount::Flat(amount) if amount == Money::from_cents(2_000)
        ));
        assert!(LoadedOffer::from_toml("[product]\nid = 1").is_err());
    }
}
