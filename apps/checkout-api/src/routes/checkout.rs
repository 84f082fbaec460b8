//! # Checkout Session Routes
//!
//! The browser drives one [`CheckoutSession`] per visit. Every route
//! returns the full session view, summary included, so the front-end never
//! does money arithmetic.
//!
//! ## Submission
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /checkout/sessions/{id}/submit                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  session.begin_payment()  ── step: Payment → Processing                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  orders.insert_with_items()  ── one transaction, balance reserved here │
//! │       │                                                                 │
//! │       ├── total == 0 ──► mark_paid ───────────────────────┐             │
//! │       │                                                   │             │
//! │       ▼                                                   │             │
//! │  payments.create_payment()                                │             │
//! │       │                                                   │             │
//! │       ├── Err ──► mark_failed, session back to Payment    │             │
//! │       │           PAYMENT_ERROR                           │             │
//! │       ▼                                                   ▼             │
//! │  approved ► Paid · pending ► AwaitingPayment · failed ► mark_failed     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  session.finish_payment(status)                                         │
//! │       │                                                                 │
//! │       └── Success ──► session removed from the store                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `mark_failed` credits the reserved balance back, and the session picks up
//! the wallet's new balance before the buyer retries.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::routes::shipping::packages_or_default;
use crate::state::AppState;
use prolipsi_core::checkout::{CheckoutSession, CheckoutStep, OrderSummary, PaymentIntent};
use prolipsi_core::validation::digits_only;
use prolipsi_core::{
    Customer, Money, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, PostalCode,
};
use prolipsi_gateway::{
    quote_or_fallback, CardDetails, Package, Payer, PaymentRequest, PixData, QuoteSource,
};

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(flatten)]
    pub session: CheckoutSession,
    pub summary: OrderSummary,
}

impl From<&CheckoutSession> for SessionView {
    fn from(session: &CheckoutSession) -> Self {
        SessionView {
            summary: session.summary(),
            session: session.clone(),
        }
    }
}

fn update<F>(state: &AppState, id: Uuid, f: F) -> ApiResult<Json<SessionView>>
where
    F: FnOnce(&mut CheckoutSession) -> ApiResult<()>,
{
    state.sessions.with_session(id, |session| {
        f(session)?;
        Ok(Json(SessionView::from(&*session)))
    })
}

// =============================================================================
// Session Lifecycle
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionRequest {
    /// Logged-in customer whose wallet may pay part of the order.
    #[serde(default)]
    pub wallet_owner_id: Option<String>,
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

pub async fn open_session(
    State(state): State<AppState>,
    body: Option<Json<OpenSessionRequest>>,
) -> ApiResult<(StatusCode, Json<SessionView>)> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let wallet_balance = match &request.wallet_owner_id {
        Some(owner_id) => state.db.wallets().get_balance(owner_id).await?,
        None => Money::zero(),
    };

    let mut session = CheckoutSession::new((*state.offer).clone(), wallet_balance);
    session.set_wallet(request.wallet_owner_id, wallet_balance);
    session.set_referral_code(request.referral_code)?;
    if let Some(quantity) = request.quantity {
        session.set_quantity(quantity)?;
    }

    info!(session_id = %session.id, wallet_cents = wallet_balance.cents(), "Checkout session opened");
    let view = SessionView::from(&session);
    state.sessions.insert(session)?;

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionView>> {
    update(&state, id, |_| Ok(()))
}

// =============================================================================
// Selections
// =============================================================================

pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(customer): Json<Customer>,
) -> ApiResult<Json<SessionView>> {
    update(&state, id, |session| Ok(session.update_customer(customer)?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchQuotesRequest {
    /// Defaults to the postal code of the customer's address.
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub packages: Vec<Package>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotesView {
    pub source: QuoteSource,
    #[serde(flatten)]
    pub view: SessionView,
}

pub async fn fetch_shipping_quotes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<FetchQuotesRequest>>,
) -> ApiResult<Json<QuotesView>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let address_cep = state.sessions.with_session(id, |session| {
        Ok(session
            .customer
            .address
            .as_ref()
            .map(|address| address.postal_code.clone()))
    })?;
    let cep = request
        .postal_code
        .or(address_cep)
        .ok_or_else(|| ApiError::validation("postal code is required"))?;
    let destination = PostalCode::parse(&cep)?;
    let packages = packages_or_default(request.packages);

    let outcome = quote_or_fallback(
        state.shipping_quoter(),
        &destination,
        &packages,
        state.shipping_timeout,
    )
    .await;

    state.sessions.with_session(id, |session| {
        session.set_shipping_quotes(outcome.quotes)?;
        Ok(Json(QuotesView {
            source: outcome.source,
            view: SessionView::from(&*session),
        }))
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectShippingRequest {
    pub quote_id: String,
}

pub async fn select_shipping(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectShippingRequest>,
) -> ApiResult<Json<SessionView>> {
    update(&state, id, |session| {
        session.select_shipping_quote(&request.quote_id)?;
        Ok(())
    })
}

pub async fn toggle_order_bump(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionView>> {
    update(&state, id, |session| {
        session.toggle_order_bump()?;
        Ok(())
    })
}

#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    pub code: String,
}

pub async fn apply_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ApplyCouponRequest>,
) -> ApiResult<Json<SessionView>> {
    let coupons = state.coupons.clone();
    update(&state, id, |session| {
        session.apply_coupon(&request.code, &coupons)?;
        Ok(())
    })
}

pub async fn remove_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionView>> {
    update(&state, id, |session| Ok(session.remove_coupon()?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBalanceRequest {
    pub amount_cents: i64,
}

pub async fn set_balance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetBalanceRequest>,
) -> ApiResult<Json<SessionView>> {
    update(&state, id, |session| {
        session.set_balance_to_use(Money::from_cents(request.amount_cents))?;
        Ok(())
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPaymentMethodRequest {
    pub method: PaymentMethod,
    #[serde(default)]
    pub installments: Option<u32>,
}

pub async fn set_payment_method(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetPaymentMethodRequest>,
) -> ApiResult<Json<SessionView>> {
    update(&state, id, |session| {
        session.set_payment_method(request.method)?;
        if let Some(installments) = request.installments {
            if request.method == PaymentMethod::CreditCard {
                session.set_installments(installments)?;
            }
        }
        Ok(())
    })
}

#[derive(Debug, Deserialize)]
pub struct GoToStepRequest {
    pub step: CheckoutStep,
}

pub async fn go_to_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<GoToStepRequest>,
) -> ApiResult<Json<SessionView>> {
    update(&state, id, |session| Ok(session.go_to(request.step)?))
}

// =============================================================================
// Submission
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Required for credit card payments.
    #[serde(default)]
    pub card: Option<CardDetails>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub order_id: String,
    pub order_status: OrderStatus,
    pub step: CheckoutStep,
    pub payment_method: PaymentMethod,
    pub payment_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub pix: Option<PixData>,
    pub ticket_url: Option<String>,
    pub summary: OrderSummary,
    pub message: Option<String>,
}

/// Snapshot of the session as frozen by `begin_payment`, turned into rows.
fn build_order(
    session: &CheckoutSession,
    intent: &PaymentIntent,
    now: DateTime<Utc>,
) -> (Order, Vec<OrderItem>) {
    let summary = &intent.summary;
    let order_id = Uuid::new_v4().to_string();
    let customer = &session.customer;

    let mut items = vec![OrderItem {
        id: Uuid::new_v4().to_string(),
        order_id: order_id.clone(),
        product_id: session.offer.product.id.clone(),
        name_snapshot: session.offer.product.name.clone(),
        unit_price_cents: session.offer.product.price_cents,
        quantity: session.quantity,
        line_total_cents: summary.subtotal.cents(),
        is_order_bump: false,
        created_at: now,
    }];

    let bump = session
        .offer
        .order_bump
        .as_ref()
        .filter(|_| summary.order_bump.is_positive());
    if let Some(bump) = bump {
        items.push(OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.clone(),
            product_id: bump.id.clone(),
            name_snapshot: bump.name.clone(),
            unit_price_cents: bump.price_cents,
            quantity: 1,
            line_total_cents: summary.order_bump.cents(),
            is_order_bump: true,
            created_at: now,
        });
    }

    let order = Order {
        id: order_id,
        customer_email: customer.email.trim().to_string(),
        customer_name: customer.name.trim().to_string(),
        customer_cpf: digits_only(&customer.cpf),
        referral_code: session.referral_code.clone(),
        wallet_owner_id: session.wallet_owner_id.clone(),
        status: OrderStatus::AwaitingPayment,
        payment_method: intent.method,
        subtotal_cents: summary.subtotal.cents(),
        shipping_cents: summary.shipping.cents(),
        order_bump_cents: summary.order_bump.cents(),
        discount_cents: summary.discount.cents(),
        balance_used_cents: summary.balance_used.cents(),
        total_cents: summary.total.cents(),
        loyalty_points: summary.loyalty_points,
        coupon_code: session.coupon.as_ref().map(|c| c.code.clone()),
        shipping_service: session
            .selected_quote()
            .map(|quote| format!("{} {}", quote.carrier, quote.service)),
        payment_id: None,
        created_at: now,
        updated_at: now,
    };

    (order, items)
}

/// Current balance of the session's wallet, when it has one.
async fn reload_wallet(state: &AppState, owner_id: Option<&str>) -> Option<Money> {
    let owner_id = owner_id?;
    match state.db.wallets().get_balance(owner_id).await {
        Ok(balance) => Some(balance),
        Err(e) => {
            warn!(owner_id = %owner_id, error = %e, "Could not reload wallet balance");
            None
        }
    }
}

/// Records the payment outcome on the session. A Success session leaves the
/// store; any other outcome refreshes the wallet balance from `wallet`.
fn finish_session(
    state: &AppState,
    id: Uuid,
    status: PaymentStatus,
    message: Option<String>,
    wallet: Option<Money>,
) -> ApiResult<(CheckoutStep, Option<String>)> {
    let (step, message) = state.sessions.with_session(id, |session| {
        let step = session.finish_payment(status, message)?;
        if let Some(balance) = wallet {
            let owner_id = session.wallet_owner_id.clone();
            session.set_wallet(owner_id, balance);
        }
        Ok((step, session.last_error.clone()))
    })?;

    if step == CheckoutStep::Success {
        state.sessions.remove(id)?;
    }
    Ok((step, message))
}

/// Sends the session back to Payment with `message`, ignoring a session
/// that vanished meanwhile.
fn reopen_payment(state: &AppState, id: Uuid, message: &str, wallet: Option<Money>) {
    let result = finish_session(
        state,
        id,
        PaymentStatus::Failed,
        Some(message.to_string()),
        wallet,
    );
    if let Err(e) = result {
        warn!(session_id = %id, error = %e, "Could not reopen checkout session");
    }
}

pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<SubmitRequest>>,
) -> ApiResult<Json<SubmitResponse>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let (snapshot, intent) = state.sessions.with_session(id, |session| {
        let intent = session.begin_payment()?;
        Ok((session.clone(), intent))
    })?;

    let wallet_owner = snapshot.wallet_owner_id.as_deref();
    let (order, items) = build_order(&snapshot, &intent, state.now());
    if let Err(e) = state.db.orders().insert_with_items(&order, &items).await {
        let err = ApiError::from(e);
        let wallet = reload_wallet(&state, wallet_owner).await;
        reopen_payment(&state, id, &err.message, wallet);
        return Err(err);
    }
    info!(
        session_id = %id,
        order_id = %order.id,
        total_cents = order.total_cents,
        balance_used_cents = order.balance_used_cents,
        method = intent.method.as_str(),
        "Order created"
    );

    let mut response = SubmitResponse {
        order_id: order.id.clone(),
        order_status: OrderStatus::Paid,
        step: CheckoutStep::Processing,
        payment_method: intent.method,
        payment_id: None,
        payment_status: PaymentStatus::Approved,
        pix: None,
        ticket_url: None,
        summary: intent.summary,
        message: None,
    };

    if intent.is_settled_without_gateway() {
        state.db.orders().mark_paid(&order.id).await?;
        info!(order_id = %order.id, "Order settled with wallet balance");
        let (step, message) = finish_session(&state, id, PaymentStatus::Approved, None, None)?;
        response.step = step;
        response.message = message;
        return Ok(Json(response));
    }

    let payment_request = PaymentRequest {
        amount: intent.amount,
        method: intent.method,
        reference: order.external_reference(),
        description: format!("Pedido {}", snapshot.offer.product.name),
        payer: Payer::from_full_name(
            &order.customer_name,
            &order.customer_email,
            Some(&order.customer_cpf),
        ),
        installments: intent.installments,
        card: request.card,
        issued_on: state.today(),
    };

    let payment = match state.payments.create_payment(&payment_request).await {
        Ok(payment) => payment,
        Err(e) => {
            let err = ApiError::payment(&e);
            let released = state.db.orders().mark_failed(&order.id).await;
            let wallet = reload_wallet(&state, wallet_owner).await;
            reopen_payment(&state, id, &err.message, wallet);
            released?;
            return Err(err);
        }
    };

    state.db.orders().set_payment_reference(&order.id, &payment.id).await?;
    let order_status = OrderStatus::after_payment(payment.status);
    let mut wallet = None;
    match order_status {
        OrderStatus::Paid => {
            state.db.orders().mark_paid(&order.id).await?;
        }
        OrderStatus::Failed => {
            state.db.orders().mark_failed(&order.id).await?;
            wallet = reload_wallet(&state, wallet_owner).await;
        }
        _ => {}
    }
    info!(
        order_id = %order.id,
        payment_id = %payment.id,
        status = %payment.raw_status,
        "Payment recorded"
    );

    let (step, message) = finish_session(&state, id, payment.status, None, wallet)?;
    response.order_status = order_status;
    response.step = step;
    response.payment_status = payment.status;
    response.payment_id = Some(payment.id);
    response.pix = payment.pix;
    response.ticket_url = payment.ticket_url;
    response.message = message;
    Ok(Json(response))
}
