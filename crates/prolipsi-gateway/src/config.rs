//! # Gateway Configuration
//!
//! Base URLs and credentials for the external services. Defaults point at
//! the public production endpoints; tests override them with a local stub.

use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};

pub const DEFAULT_VIACEP_URL: &str = "https://viacep.com.br";
pub const DEFAULT_MERCADO_PAGO_URL: &str = "https://api.mercadopago.com";

/// Live shipping quotes are abandoned after this long.
pub const DEFAULT_SHIPPING_TIMEOUT: Duration = Duration::from_millis(3_000);

/// Overall timeout for every other outbound request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Origin CEP used when quoting shipping (distribution center).
pub const DEFAULT_ORIGIN_POSTAL_CODE: &str = "01310100";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub viacep_url: String,
    /// `None` disables live quotes; the fallback table is used directly.
    pub shipping_quote_url: Option<String>,
    pub shipping_timeout: Duration,
    pub origin_postal_code: String,
    pub mercado_pago_url: String,
    pub access_token: Option<String>,
    /// Sent to Mercado Pago so status changes reach our webhook.
    pub notification_url: Option<String>,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            viacep_url: DEFAULT_VIACEP_URL.to_string(),
            shipping_quote_url: None,
            shipping_timeout: DEFAULT_SHIPPING_TIMEOUT,
            origin_postal_code: DEFAULT_ORIGIN_POSTAL_CODE.to_string(),
            mercado_pago_url: DEFAULT_MERCADO_PAGO_URL.to_string(),
            access_token: None,
            notification_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: format!("prolipsi-checkout/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viacep_url(mut self, url: impl Into<String>) -> Self {
        self.viacep_url = trim_base(url.into());
        self
    }

    pub fn shipping_quote_url(mut self, url: impl Into<String>) -> Self {
        self.shipping_quote_url = Some(trim_base(url.into()));
        self
    }

    pub fn shipping_timeout(mut self, timeout: Duration) -> Self {
        self.shipping_timeout = timeout;
        self
    }

    pub fn origin_postal_code(mut self, cep: impl Into<String>) -> Self {
        self.origin_postal_code = cep.into();
        self
    }

    pub fn mercado_pago_url(mut self, url: impl Into<String>) -> Self {
        self.mercado_pago_url = trim_base(url.into());
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn notification_url(mut self, url: impl Into<String>) -> Self {
        self.notification_url = Some(url.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builds the shared `reqwest` client.
    pub fn http_client(&self) -> GatewayResult<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.request_timeout)
            .build()
            .map_err(GatewayError::Http)
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
