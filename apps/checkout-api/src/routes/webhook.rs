//! # Mercado Pago Webhook
//!
//! The notification only carries the payment id; the payment itself is
//! fetched back from the provider before anything is marked paid, so a
//! forged notification cannot settle an invoice.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  {"type":"payment","data":{"id":123}}                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  payments.get_payment(123) ── not approved ──► 200 ignored              │
//! │       │                                                                 │
//! │       ▼ external_reference                                              │
//! │  "PAG-{invoice}" ──► invoices.mark_paid(today)                          │
//! │  "ORD-{order}"   ──► orders.mark_paid                                   │
//! │  none            ──► invoice by pix_payment_id                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both `mark_paid` calls only touch rows that are still pending, so
//! replayed notifications are harmless. Provider errors answer 502 and the
//! provider retries the notification later.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ApiResult;
use crate::state::AppState;
use prolipsi_core::{PaymentStatus, INVOICE_REFERENCE_PREFIX, ORDER_REFERENCE_PREFIX};

#[derive(Debug, Deserialize)]
pub struct Notification {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Option<NotificationData>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationData {
    /// Number or string, depending on the notification version.
    pub id: Value,
}

impl Notification {
    fn payment_id(&self) -> Option<String> {
        if self.kind.as_deref() != Some("payment") {
            return None;
        }
        match &self.data.as_ref()?.id {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Ignored,
    InvoicePaid,
    OrderPaid,
    AlreadySettled,
    UnknownReference,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub received: bool,
    pub outcome: WebhookOutcome,
}

fn respond(outcome: WebhookOutcome) -> Json<WebhookResponse> {
    Json(WebhookResponse {
        received: true,
        outcome,
    })
}

pub async fn mercado_pago(
    State(state): State<AppState>,
    Json(notification): Json<Notification>,
) -> ApiResult<Json<WebhookResponse>> {
    let Some(payment_id) = notification.payment_id() else {
        return Ok(respond(WebhookOutcome::Ignored));
    };

    let payment = state.payments.get_payment(&payment_id).await?;
    info!(payment_id = %payment_id, status = %payment.raw_status, "Mercado Pago notification");
    if payment.status != PaymentStatus::Approved {
        return Ok(respond(WebhookOutcome::Ignored));
    }

    let reference = payment.external_reference.as_deref().unwrap_or_default();

    let changed = if let Some(invoice_id) = reference.strip_prefix(INVOICE_REFERENCE_PREFIX) {
        let paid = state.db.invoices().mark_paid(invoice_id, state.today()).await?;
        paid.then_some(WebhookOutcome::InvoicePaid)
    } else if let Some(order_id) = reference.strip_prefix(ORDER_REFERENCE_PREFIX) {
        let paid = state.db.orders().mark_paid(order_id).await?;
        paid.then_some(WebhookOutcome::OrderPaid)
    } else {
        match state.db.invoices().find_by_pix_payment_id(&payment.id).await? {
            Some(invoice) => {
                let paid = state.db.invoices().mark_paid(&invoice.id, state.today()).await?;
                paid.then_some(WebhookOutcome::InvoicePaid)
            }
            None => {
                warn!(payment_id = %payment.id, reference = %reference, "Approved payment matches nothing");
                return Ok(respond(WebhookOutcome::UnknownReference));
            }
        }
    };

    Ok(respond(changed.unwrap_or(WebhookOutcome::AlreadySettled)))
}
