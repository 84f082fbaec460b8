//! # Mercado Pago Payments
//!
//! Creates PIX, boleto and card payments through `POST /v1/payments` and
//! reads their status back through `GET /v1/payments/{id}`.
//!
//! ## Idempotency
//! ```text
//! X-Idempotency-Key = hex(sha256("mp-{method}-{reference}-{cents}-{issued_on}"))
//!
//! mp-pix-ORD-3f2a...-23182-2024-06-20
//!     ──► same key on a double click or a retried submit, so the provider
//!         returns the first payment instead of charging twice
//!
//! mp-pix-PAG-inv-1-39000-2024-06-20
//! mp-pix-PAG-inv-1-39200-2024-06-21
//!     ──► an invoice charged again the next day carries a larger late fee
//!         and a new key, so the provider issues a fresh QR code
//! ```
//!
//! ## Amounts
//! The API takes reais as a JSON number. We convert once from integer
//! centavos, so the float never feeds back into any calculation.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use prolipsi_core::validation::digits_only;
use prolipsi_core::{Money, PaymentMethod, PaymentStatus};

const SERVICE: &str = "mercado_pago";

/// Payment method id for bank slips issued by Bradesco.
const BOLETO_METHOD_ID: &str = "bolbradesco";

// =============================================================================
// Public Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Digits only.
    pub cpf: Option<String>,
}

impl Payer {
    /// Splits a full name the way the provider expects it: first word as
    /// first name, the rest as last name.
    pub fn from_full_name(name: &str, email: &str, cpf: Option<&str>) -> Self {
        let mut words = name.split_whitespace();
        let first_name = words.next().unwrap_or("Cliente").to_string();
        let rest: Vec<&str> = words.collect();
        let last_name = if rest.is_empty() {
            "Prólipsi".to_string()
        } else {
            rest.join(" ")
        };

        Payer {
            email: email.trim().to_string(),
            first_name,
            last_name,
            cpf: cpf.map(digits_only).filter(|digits| !digits.is_empty()),
        }
    }
}

/// Tokenized card data from the browser SDK. Raw card numbers never reach
/// this service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub token: String,
    /// Card brand id as returned by the SDK ("visa", "master", ...).
    pub payment_method_id: String,
    #[serde(default)]
    pub issuer_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: Money,
    pub method: PaymentMethod,
    /// `ORD-{order id}` or `PAG-{invoice id}`; echoed back by webhooks.
    pub reference: String,
    pub description: String,
    pub payer: Payer,
    pub installments: u32,
    pub card: Option<CardDetails>,
    /// Civil date the charge is issued on; part of the idempotency key.
    pub issued_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixData {
    pub qr_code: Option<String>,
    pub qr_code_base64: Option<String>,
    pub ticket_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub status: PaymentStatus,
    /// Provider status string, kept for logs and support.
    pub raw_status: String,
    pub status_detail: Option<String>,
    pub external_reference: Option<String>,
    pub pix: Option<PixData>,
    /// Boleto PDF link.
    pub ticket_url: Option<String>,
}

/// Payment provider seam.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(&self, request: &PaymentRequest) -> GatewayResult<PaymentResponse>;

    async fn get_payment(&self, payment_id: &str) -> GatewayResult<PaymentResponse>;
}

/// Deterministic idempotency key for a payment attempt.
///
/// Repeats of the same charge on the same day share a key; a different
/// amount or issue date yields a new one.
pub fn idempotency_key(request: &PaymentRequest) -> String {
    let seed = format!(
        "mp-{}-{}-{}-{}",
        request.method.as_str(),
        request.reference,
        request.amount.cents(),
        request.issued_on
    );
    hex::encode(Sha256::digest(seed.as_bytes()))
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct PaymentBody<'a> {
    transaction_amount: f64,
    description: &'a str,
    payment_method_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    installments: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issuer_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<&'a str>,
    external_reference: &'a str,
    payer: PayerBody<'a>,
}

#[derive(Debug, Serialize)]
struct PayerBody<'a> {
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    identification: Option<Identification<'a>>,
}

#[derive(Debug, Serialize)]
struct Identification<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    number: &'a str,
}

#[derive(Debug, Deserialize)]
struct PaymentPayload {
    id: serde_json::Value,
    status: String,
    #[serde(default)]
    status_detail: Option<String>,
    #[serde(default)]
    external_reference: Option<String>,
    #[serde(default)]
    point_of_interaction: Option<PointOfInteraction>,
    #[serde(default)]
    transaction_details: Option<TransactionDetails>,
}

#[derive(Debug, Deserialize)]
struct PointOfInteraction {
    #[serde(default)]
    transaction_data: Option<TransactionData>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    #[serde(default)]
    qr_code: Option<String>,
    #[serde(default)]
    qr_code_base64: Option<String>,
    #[serde(default)]
    ticket_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionDetails {
    #[serde(default)]
    external_resource_url: Option<String>,
}

impl PaymentPayload {
    fn into_response(self) -> GatewayResult<PaymentResponse> {
        // Numeric in the real API, string in some sandboxes.
        let id = match self.id {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s,
            other => {
                return Err(GatewayError::Decode {
                    service: SERVICE,
                    reason: format!("unexpected payment id {other}"),
                })
            }
        };

        let pix = self
            .point_of_interaction
            .and_then(|poi| poi.transaction_data)
            .map(|data| PixData {
                qr_code: data.qr_code,
                qr_code_base64: data.qr_code_base64,
                ticket_url: data.ticket_url,
            });

        Ok(PaymentResponse {
            id,
            status: PaymentStatus::from_gateway(&self.status),
            raw_status: self.status,
            status_detail: self.status_detail,
            external_reference: self.external_reference,
            pix,
            ticket_url: self
                .transaction_details
                .and_then(|details| details.external_resource_url),
        })
    }
}

fn method_id(request: &PaymentRequest) -> GatewayResult<&str> {
    match request.method {
        PaymentMethod::Pix => Ok("pix"),
        PaymentMethod::Boleto => Ok(BOLETO_METHOD_ID),
        PaymentMethod::CreditCard => request
            .card
            .as_ref()
            .map(|card| card.payment_method_id.as_str())
            .ok_or_else(|| GatewayError::InvalidRequest("card payment requires a card token".into())),
        PaymentMethod::WalletBalance => Err(GatewayError::InvalidRequest(
            "wallet balance payments are settled without the provider".into(),
        )),
    }
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Clone)]
pub struct MercadoPagoClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    notification_url: Option<String>,
}

impl MercadoPagoClient {
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        Ok(MercadoPagoClient {
            client: config.http_client()?,
            base_url: config.mercado_pago_url.clone(),
            access_token: config.access_token.clone(),
            notification_url: config.notification_url.clone(),
        })
    }

    fn token(&self) -> GatewayResult<&str> {
        self.access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(GatewayError::MissingCredentials(SERVICE))
    }

    async fn read_payment(response: reqwest::Response) -> GatewayResult<PaymentResponse> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Mercado Pago rejected request");
            return Err(GatewayError::UnexpectedStatus {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let payload: PaymentPayload = response.json().await.map_err(|e| GatewayError::Decode {
            service: SERVICE,
            reason: e.to_string(),
        })?;
        payload.into_response()
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn create_payment(&self, request: &PaymentRequest) -> GatewayResult<PaymentResponse> {
        let token = self.token()?;
        if !request.amount.is_positive() {
            return Err(GatewayError::InvalidRequest(format!(
                "amount must be positive, got {}",
                request.amount
            )));
        }
        let payment_method_id = method_id(request)?;
        let card = request.card.as_ref().filter(|_| request.method == PaymentMethod::CreditCard);

        let body = PaymentBody {
            transaction_amount: request.amount.to_reais_f64(),
            description: &request.description,
            payment_method_id,
            token: card.map(|c| c.token.as_str()),
            installments: card.map(|_| request.installments.max(1)),
            issuer_id: card.and_then(|c| c.issuer_id.as_deref()),
            notification_url: self.notification_url.as_deref(),
            external_reference: &request.reference,
            payer: PayerBody {
                email: &request.payer.email,
                first_name: &request.payer.first_name,
                last_name: &request.payer.last_name,
                identification: request.payer.cpf.as_deref().map(|number| Identification {
                    kind: "CPF",
                    number,
                }),
            },
        };

        let key = idempotency_key(request);
        debug!(
            reference = %request.reference,
            method = request.method.as_str(),
            amount_cents = request.amount.cents(),
            "Creating payment"
        );

        let response = self
            .client
            .post(format!("{}/v1/payments", self.base_url))
            .bearer_auth(token)
            .header("X-Idempotency-Key", key)
            .json(&body)
            .send()
            .await?;

        let payment = Self::read_payment(response).await?;
        info!(
            reference = %request.reference,
            payment_id = %payment.id,
            status = %payment.raw_status,
            "Payment created"
        );
        Ok(payment)
    }

    async fn get_payment(&self, payment_id: &str) -> GatewayResult<PaymentResponse> {
        let token = self.token()?;
        let response = self
            .client
            .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
            .bearer_auth(token)
            .send()
            .await?;

        Self::read_payment(response).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
