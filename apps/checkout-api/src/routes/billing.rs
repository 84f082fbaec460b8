//! # Billing Routes
//!
//! Late fees and PIX charges for the monthly invoices of transport
//! operators.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /billing/invoices/{id}/pix                                        │
//! │       │                                                                 │
//! │       ├── invoice pending?  ── no ──► 409 CHECKOUT_ERROR                │
//! │       ▼                                                                 │
//! │  fee_policies.get_for_owner(owner)  ── defaults when never saved        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  late_fee_for_invoice(invoice, today in Brasília, policy)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  payments.create_payment(PIX, total, "PAG-{id}")                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  invoices.attach_pix_charge()  ── QR code stored on the invoice         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::state::AppState;
use prolipsi_core::late_fee::{
    calculate_late_fee, late_fee_for_invoice, DueDate, FeePolicy, FeePolicySettings, LateFee,
};
use prolipsi_core::validation::{
    validate_due_day, validate_email, validate_price_cents, validate_uuid,
};
use prolipsi_core::{InvoiceStatus, MonthlyInvoice, Money, PaymentMethod};
use prolipsi_db::PixCharge;
use prolipsi_gateway::{Payer, PaymentRequest, PixData};

/// Used when the guardian left no e-mail; the provider requires one.
const FALLBACK_PAYER_EMAIL: &str = "pagamentos@rsprolipsi.com.br";

// =============================================================================
// Fee Quote
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LateFeeQuoteRequest {
    pub amount_cents: i64,
    /// Contracted day of month; wins over `due_date`.
    #[serde(default)]
    pub due_day: Option<i64>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Defaults to today in Brasília.
    #[serde(default)]
    pub today: Option<NaiveDate>,
    /// Operator whose stored policy applies when `policy` is absent.
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub policy: Option<FeePolicySettings>,
}

pub async fn quote_late_fee(
    State(state): State<AppState>,
    Json(request): Json<LateFeeQuoteRequest>,
) -> ApiResult<Json<LateFee>> {
    validate_price_cents(request.amount_cents)?;
    let amount = Money::from_cents(request.amount_cents);

    let due = match (request.due_day, request.due_date) {
        (Some(day), _) => {
            validate_due_day(day)?;
            Some(DueDate::DayOfMonth(day as u32))
        }
        (None, Some(date)) => Some(DueDate::Fixed(date)),
        (None, None) => None,
    };

    let policy = match (request.policy, request.owner_id.as_deref()) {
        (Some(settings), _) => settings.resolve(),
        (None, Some(owner_id)) => state.db.fee_policies().get_for_owner(owner_id).await?.resolve(),
        (None, None) => FeePolicy::default(),
    };

    let today = request.today.unwrap_or_else(|| state.today());
    let fee = match due {
        Some(due) => calculate_late_fee(amount, due, today, &policy),
        None => LateFee::none(amount, None),
    };

    Ok(Json(fee))
}

// =============================================================================
// Invoices
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub owner_id: String,
    pub student_name: String,
    #[serde(default)]
    pub payer_email: Option<String>,
    #[serde(default)]
    pub payer_cpf: Option<String>,
    pub amount_cents: i64,
    #[serde(default)]
    pub due_day: Option<i64>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

pub async fn create_invoice(
    State(state): State<AppState>,
    Json(request): Json<CreateInvoiceRequest>,
) -> ApiResult<(StatusCode, Json<MonthlyInvoice>)> {
    let owner_id = request.owner_id.trim();
    if owner_id.is_empty() {
        return Err(ApiError::validation("ownerId is required"));
    }
    let student_name = request.student_name.trim();
    if student_name.is_empty() {
        return Err(ApiError::validation("studentName is required"));
    }
    if request.amount_cents <= 0 {
        return Err(ApiError::validation("amountCents must be positive"));
    }
    if let Some(day) = request.due_day {
        validate_due_day(day)?;
    }
    let payer_email = request
        .payer_email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    if let Some(email) = &payer_email {
        validate_email(email)?;
    }

    let invoice = MonthlyInvoice {
        id: Uuid::new_v4().to_string(),
        owner_id: owner_id.to_string(),
        student_name: student_name.to_string(),
        payer_email,
        payer_cpf: request.payer_cpf.filter(|c| !c.trim().is_empty()),
        amount_cents: request.amount_cents,
        due_day: request.due_day,
        due_date: request.due_date,
        status: InvoiceStatus::Pending,
        pix_payment_id: None,
        pix_qr_code: None,
        pix_qr_code_base64: None,
        charged_amount_cents: None,
        paid_on: None,
        created_at: state.now(),
    };
    state.db.invoices().insert(&invoice).await?;
    info!(id = %invoice.id, owner_id = %invoice.owner_id, amount_cents = invoice.amount_cents, "Invoice created");

    Ok((StatusCode::CREATED, Json(invoice)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInvoicesQuery {
    pub owner_id: String,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListInvoicesQuery>,
) -> ApiResult<Json<Vec<MonthlyInvoice>>> {
    let invoices = state
        .db
        .invoices()
        .list_by_owner(&query.owner_id, query.status)
        .await?;
    Ok(Json(invoices))
}

async fn load_invoice(state: &AppState, id: &str) -> ApiResult<MonthlyInvoice> {
    validate_uuid(id)?;
    state
        .db
        .invoices()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice", id))
}

/// Fee owed today under the operator's policy.
async fn fee_for(state: &AppState, invoice: &MonthlyInvoice) -> ApiResult<LateFee> {
    let policy = state
        .db
        .fee_policies()
        .get_for_owner(&invoice.owner_id)
        .await?
        .resolve();
    Ok(late_fee_for_invoice(invoice, state.today(), &policy))
}

pub async fn invoice_late_fee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<LateFee>> {
    let invoice = load_invoice(&state, &id).await?;
    if invoice.status != InvoiceStatus::Pending {
        return Ok(Json(LateFee::none(invoice.amount(), None)));
    }
    Ok(Json(fee_for(&state, &invoice).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixChargeView {
    pub invoice_id: String,
    pub payment_id: String,
    pub late_fee: LateFee,
    pub pix: Option<PixData>,
}

pub async fn create_pix_charge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PixChargeView>> {
    let invoice = load_invoice(&state, &id).await?;
    if invoice.status != InvoiceStatus::Pending {
        return Err(ApiError::new(
            ErrorCode::CheckoutError,
            format!("Invoice {} is not pending", invoice.id),
        ));
    }

    let fee = fee_for(&state, &invoice).await?;
    let mut description = format!("Mensalidade: {}", invoice.student_name);
    if fee.fee().is_positive() {
        description.push_str(&format!(
            " (inclui multa/juros de {} dias)",
            fee.days_overdue
        ));
    }

    let email = invoice.payer_email.as_deref().unwrap_or(FALLBACK_PAYER_EMAIL);
    let request = PaymentRequest {
        amount: fee.total,
        method: PaymentMethod::Pix,
        reference: invoice.external_reference(),
        description,
        payer: Payer::from_full_name(&invoice.student_name, email, invoice.payer_cpf.as_deref()),
        installments: 1,
        card: None,
        issued_on: state.today(),
    };
    let payment = state
        .payments
        .create_payment(&request)
        .await
        .map_err(|e| ApiError::payment(&e))?;

    let pix = payment.pix.clone();
    let charge = PixCharge {
        payment_id: payment.id.clone(),
        qr_code: pix.as_ref().and_then(|p| p.qr_code.clone()),
        qr_code_base64: pix.as_ref().and_then(|p| p.qr_code_base64.clone()),
        amount: fee.total,
    };
    state.db.invoices().attach_pix_charge(&invoice.id, &charge).await?;
    info!(
        id = %invoice.id,
        payment_id = %payment.id,
        total_cents = fee.total.cents(),
        days_overdue = fee.days_overdue,
        "PIX charge created"
    );

    Ok(Json(PixChargeView {
        invoice_id: invoice.id,
        payment_id: payment.id,
        late_fee: fee,
        pix,
    }))
}

// =============================================================================
// Fee Policies
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeePolicyView {
    pub owner_id: String,
    pub settings: FeePolicySettings,
    /// Settings with defaults applied.
    pub effective: FeePolicy,
}

pub async fn save_fee_policy(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
    Json(settings): Json<FeePolicySettings>,
) -> ApiResult<Json<FeePolicyView>> {
    state.db.fee_policies().upsert(&owner_id, &settings).await?;
    info!(owner_id = %owner_id, mode = ?settings.mode, "Fee policy saved");

    Ok(Json(FeePolicyView {
        effective: settings.resolve(),
        owner_id,
        settings,
    }))
}

pub async fn get_fee_policy(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> ApiResult<Json<FeePolicyView>> {
    let settings = state.db.fee_policies().get_for_owner(&owner_id).await?;
    Ok(Json(FeePolicyView {
        effective: settings.resolve(),
        owner_id,
        settings,
    }))
}
