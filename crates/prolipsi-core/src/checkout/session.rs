//! # Checkout Session
//!
//! The state a buyer accumulates while walking through the hosted checkout.
//!
//! ## Step Sequence
//! ```text
//! ┌────────────────┐  go_to   ┌────────┐  go_to   ┌─────────┐
//! │ Identification │ ───────► │ Review │ ───────► │ Payment │
//! └────────────────┘ ◄─────── └────────┘ ◄─────── └────┬────┘
//!         ▲             back                back       │ begin_payment
//!         │                                            ▼
//!         │                                     ┌────────────┐
//!         │                    Failed ◄──────── │ Processing │
//!         │                 (back to Payment)   └─────┬──────┘
//!         │                                           │ finish_payment
//!         │                                           ▼ Approved / Pending
//!         │                                     ┌─────────┐
//!         └──── (new session)                   │ Success │
//!                                               └─────────┘
//! ```
//!
//! Forward navigation is one step at a time and gated on the buyer's data;
//! backward navigation is free until the payment starts. Processing and
//! Success are only reachable through [`CheckoutSession::begin_payment`] and
//! [`CheckoutSession::finish_payment`].
//!
//! The totals are never cached: [`CheckoutSession::summary`] recomputes them
//! from the current selections on every call.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::coupon::{Coupon, CouponBook};
use super::summary::{calculate_order_summary, OrderInputs, OrderSummary, PointsRate};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::shipping::ShippingQuote;
use crate::types::{CheckoutProduct, Customer, OrderBumpOffer, PaymentMethod, PaymentStatus};
use crate::validation::{validate_address, validate_customer, validate_installments, validate_quantity};
use crate::MAX_INSTALLMENTS;

// =============================================================================
// Step
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    Identification,
    Review,
    Payment,
    Processing,
    Success,
}

impl CheckoutStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::Identification => "identification",
            CheckoutStep::Review => "review",
            CheckoutStep::Payment => "payment",
            CheckoutStep::Processing => "processing",
            CheckoutStep::Success => "success",
        }
    }

    /// Whether the buyer can still change selections.
    pub fn is_editable(&self) -> bool {
        *self < CheckoutStep::Processing
    }

    fn next(&self) -> Option<CheckoutStep> {
        match self {
            CheckoutStep::Identification => Some(CheckoutStep::Review),
            CheckoutStep::Review => Some(CheckoutStep::Payment),
            CheckoutStep::Payment => Some(CheckoutStep::Processing),
            CheckoutStep::Processing => Some(CheckoutStep::Success),
            CheckoutStep::Success => None,
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Offer
// =============================================================================

/// What a checkout link sells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOffer {
    pub product: CheckoutProduct,
    #[serde(default)]
    pub order_bump: Option<OrderBumpOffer>,
    #[serde(default)]
    pub points_rate: PointsRate,
}

// =============================================================================
// Payment Intent
// =============================================================================

/// What to charge once the buyer confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub amount: Money,
    pub method: PaymentMethod,
    pub installments: u32,
    pub summary: OrderSummary,
}

impl PaymentIntent {
    /// Nothing left to charge at the provider.
    pub fn is_settled_without_gateway(&self) -> bool {
        !self.amount.is_positive()
    }
}

// =============================================================================
// Session
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub id: Uuid,
    pub offer: CheckoutOffer,
    pub step: CheckoutStep,
    pub quantity: i64,
    pub customer: Customer,
    pub referral_code: Option<String>,
    /// Wallet the balance is drawn from.
    pub wallet_owner_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub installments: u32,
    pub shipping_quotes: Vec<ShippingQuote>,
    pub selected_quote_id: Option<String>,
    pub order_bump_selected: bool,
    pub coupon: Option<Coupon>,
    pub requested_balance: Money,
    pub wallet_balance: Money,
    pub last_error: Option<String>,
}

impl CheckoutSession {
    pub fn new(offer: CheckoutOffer, wallet_balance: Money) -> Self {
        CheckoutSession {
            id: Uuid::new_v4(),
            offer,
            step: CheckoutStep::Identification,
            quantity: 1,
            customer: Customer::default(),
            referral_code: None,
            wallet_owner_id: None,
            payment_method: PaymentMethod::default(),
            installments: 1,
            shipping_quotes: Vec::new(),
            selected_quote_id: None,
            order_bump_selected: false,
            coupon: None,
            requested_balance: Money::zero(),
            wallet_balance: wallet_balance.max_zero(),
            last_error: None,
        }
    }

    fn ensure_editable(&self) -> CoreResult<()> {
        if self.step.is_editable() {
            Ok(())
        } else {
            Err(CoreError::CheckoutLocked {
                step: self.step.to_string(),
            })
        }
    }

    // =========================================================================
    // Selections
    // =========================================================================

    pub fn set_quantity(&mut self, quantity: i64) -> CoreResult<()> {
        self.ensure_editable()?;
        validate_quantity(quantity)?;
        self.quantity = quantity;
        Ok(())
    }

    pub fn update_customer(&mut self, customer: Customer) -> CoreResult<()> {
        self.ensure_editable()?;
        self.customer = customer;
        Ok(())
    }

    pub fn set_referral_code(&mut self, code: Option<String>) -> CoreResult<()> {
        self.ensure_editable()?;
        self.referral_code = code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        Ok(())
    }

    /// Replaces the offered quotes and clears the selection.
    ///
    /// Digital goods never ship, so the list stays empty for them.
    pub fn set_shipping_quotes(&mut self, quotes: Vec<ShippingQuote>) -> CoreResult<()> {
        self.ensure_editable()?;
        if self.offer.product.is_digital() {
            return Ok(());
        }
        self.shipping_quotes = quotes;
        self.selected_quote_id = None;
        Ok(())
    }

    pub fn select_shipping_quote(&mut self, quote_id: &str) -> CoreResult<&ShippingQuote> {
        self.ensure_editable()?;
        let quote = self
            .shipping_quotes
            .iter()
            .find(|q| q.id == quote_id)
            .ok_or_else(|| CoreError::UnknownShippingQuote(quote_id.to_string()))?;
        self.selected_quote_id = Some(quote.id.clone());
        Ok(quote)
    }

    pub fn selected_quote(&self) -> Option<&ShippingQuote> {
        let id = self.selected_quote_id.as_deref()?;
        self.shipping_quotes.iter().find(|q| q.id == id)
    }

    /// Flips the order bump and returns the new state. Stays off when the
    /// offer has no bump.
    pub fn toggle_order_bump(&mut self) -> CoreResult<bool> {
        self.ensure_editable()?;
        self.order_bump_selected = self.offer.order_bump.is_some() && !self.order_bump_selected;
        Ok(self.order_bump_selected)
    }

    pub fn apply_coupon(&mut self, code: &str, book: &CouponBook) -> CoreResult<&Coupon> {
        self.ensure_editable()?;
        let coupon = book.find(code)?.clone();
        Ok(self.coupon.insert(coupon))
    }

    pub fn remove_coupon(&mut self) -> CoreResult<()> {
        self.ensure_editable()?;
        self.coupon = None;
        Ok(())
    }

    /// Stores the balance to use, clamped to what the wallet holds and what
    /// the order currently costs. Returns the stored value.
    pub fn set_balance_to_use(&mut self, requested: Money) -> CoreResult<Money> {
        self.ensure_editable()?;
        let pre_balance = self.summary_with(Money::zero()).pre_balance_total();
        self.requested_balance = requested.min(self.wallet_balance).min(pre_balance).max_zero();
        Ok(self.requested_balance)
    }

    /// Sets the wallet the balance is drawn from. A balance already chosen
    /// is clamped to what the wallet now holds.
    pub fn set_wallet(&mut self, owner_id: Option<String>, balance: Money) {
        self.wallet_owner_id = owner_id;
        self.wallet_balance = balance.max_zero();
        self.requested_balance = self.requested_balance.min(self.wallet_balance);
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) -> CoreResult<()> {
        self.ensure_editable()?;
        if method != PaymentMethod::CreditCard {
            self.installments = 1;
        }
        self.payment_method = method;
        Ok(())
    }

    pub fn set_installments(&mut self, installments: u32) -> CoreResult<()> {
        self.ensure_editable()?;
        if installments > MAX_INSTALLMENTS {
            return Err(CoreError::TooManyInstallments {
                requested: installments,
                max: MAX_INSTALLMENTS,
            });
        }
        validate_installments(installments)?;
        self.installments = installments;
        Ok(())
    }

    // =========================================================================
    // Totals
    // =========================================================================

    fn summary_with(&self, requested_balance: Money) -> OrderSummary {
        calculate_order_summary(&OrderInputs {
            product_kind: self.offer.product.kind,
            unit_price: self.offer.product.price(),
            quantity: self.quantity,
            shipping_quote: self.selected_quote().map(|q| q.price),
            order_bump: self
                .offer
                .order_bump
                .as_ref()
                .filter(|_| self.order_bump_selected)
                .map(OrderBumpOffer::price),
            coupon: self.coupon.as_ref().map(|c| c.discount),
            requested_balance,
            wallet_balance: self.wallet_balance,
            points_rate: self.offer.points_rate,
        })
    }

    pub fn summary(&self) -> OrderSummary {
        self.summary_with(self.requested_balance)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Checks what leaving the identification step requires.
    fn check_identification(&self) -> CoreResult<()> {
        validate_customer(&self.customer)?;

        if !self.customer.has_accepted_terms {
            return Err(CoreError::CheckoutIncomplete {
                reason: "accept the terms of purchase".to_string(),
            });
        }

        if !self.offer.product.is_digital() {
            let address = self.customer.address.as_ref().ok_or_else(|| {
                CoreError::CheckoutIncomplete {
                    reason: "a delivery address is required".to_string(),
                }
            })?;
            validate_address(address)?;

            if self.selected_quote().is_none() {
                return Err(CoreError::CheckoutIncomplete {
                    reason: "select a shipping option".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Moves between the editable steps.
    pub fn go_to(&mut self, target: CheckoutStep) -> CoreResult<()> {
        let current = self.step;
        let invalid = || CoreError::InvalidStepTransition {
            from: current.to_string(),
            to: target.to_string(),
        };

        if !current.is_editable() || !target.is_editable() {
            return Err(invalid());
        }

        if target <= current {
            self.step = target;
            return Ok(());
        }

        if current.next() != Some(target) {
            return Err(invalid());
        }

        self.check_identification()?;
        self.step = target;
        Ok(())
    }

    /// Freezes the session and returns what must be charged.
    ///
    /// When the wallet balance covers everything the method becomes
    /// [`PaymentMethod::WalletBalance`].
    pub fn begin_payment(&mut self) -> CoreResult<PaymentIntent> {
        if self.step != CheckoutStep::Payment {
            return Err(CoreError::InvalidStepTransition {
                from: self.step.to_string(),
                to: CheckoutStep::Processing.to_string(),
            });
        }
        self.check_identification()?;

        let summary = self.summary();
        let method = if summary.is_covered_by_balance() {
            PaymentMethod::WalletBalance
        } else {
            self.payment_method
        };
        let installments = if method == PaymentMethod::CreditCard {
            self.installments
        } else {
            1
        };

        self.last_error = None;
        self.step = CheckoutStep::Processing;

        Ok(PaymentIntent {
            amount: summary.total,
            method,
            installments,
            summary,
        })
    }

    /// Records the provider's answer.
    ///
    /// Approved and pending payments end on Success; a failure sends the
    /// buyer back to Payment with `message` shown as the error.
    pub fn finish_payment(
        &mut self,
        status: PaymentStatus,
        message: Option<String>,
    ) -> CoreResult<CheckoutStep> {
        if self.step != CheckoutStep::Processing {
            return Err(CoreError::InvalidStepTransition {
                from: self.step.to_string(),
                to: CheckoutStep::Success.to_string(),
            });
        }

        if status.is_accepted() {
            self.step = CheckoutStep::Success;
            self.last_error = None;
        } else {
            self.step = CheckoutStep::Payment;
            self.last_error =
                Some(message.unwrap_or_else(|| "Pagamento recusado. Tente novamente.".to_string()));
        }
        Ok(self.step)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, ProductKind};

    fn offer(kind: ProductKind) -> CheckoutOffer {
        CheckoutOffer {
            product: CheckoutProduct {
                id: "kit-ozeni".to_string(),
                name: "Kit OzêniPró".to_string(),
                price_cents: 10_000,
                kind,
                image_url: None,
            },
            order_bump: Some(OrderBumpOffer {
                id: "guia".to_string(),
                name: "Guia de uso".to_string(),
                price_cents: 5_000,
            }),
            points_rate: PointsRate::ONE_PER_REAL,
        }
    }

    fn customer() -> Customer {
        Customer {
            email: "ana.souza@example.com".to_string(),
            cpf: "529.982.247-25".to_string(),
            name: "Ana Souza".to_string(),
            phone: "11987654321".to_string(),
            birth_date: "15/08/1990".to_string(),
            has_accepted_terms: true,
            address: Some(Address {
                postal_code: "01310-100".to_string(),
                street: "Avenida Paulista".to_string(),
                number: "1000".to_string(),
                complement: None,
                neighborhood: "Bela Vista".to_string(),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
            }),
        }
    }

    fn quote(id: &str, cents: i64) -> ShippingQuote {
        ShippingQuote {
            id: id.to_string(),
            carrier: "Correios".to_string(),
            service: id.to_uppercase(),
            price: Money::from_cents(cents),
            delivery_days: 3,
        }
    }

    fn ready_session() -> CheckoutSession {
        let mut session = CheckoutSession::new(offer(ProductKind::Physical), Money::from_cents(5_000));
        session.update_customer(customer()).unwrap();
        session
            .set_shipping_quotes(vec![quote("pac", 1_500), quote("sedex", 2_700)])
            .unwrap();
        session.select_shipping_quote("pac").unwrap();
        session
    }

    #[test]
    fn test_new_session_defaults() {
        let session = CheckoutSession::new(offer(ProductKind::Physical), Money::from_cents(-10));
        assert_eq!(session.step, CheckoutStep::Identification);
        assert_eq!(session.quantity, 1);
        assert_eq!(session.wallet_balance, Money::zero());
        assert_eq!(session.summary().total, Money::from_cents(10_000));
    }

    #[test]
    fn test_summary_follows_selections() {
        let book: CouponBook = [Coupon::from_stored_value("RS10", 10.0)].into_iter().collect();
        let mut session = ready_session();
        session.apply_coupon("rs10", &book).unwrap();
        let used = session.set_balance_to_use(Money::from_cents(20_000)).unwrap();

        assert_eq!(used, Money::from_cents(5_000));
        let summary = session.summary();
        assert_eq!(summary.shipping, Money::from_cents(1_500));
        assert_eq!(summary.discount, Money::from_cents(1_000));
        assert_eq!(summary.total, Money::from_cents(5_500));

        session.select_shipping_quote("sedex").unwrap();
        assert_eq!(session.summary().total, Money::from_cents(6_700));
    }

    #[test]
    fn test_fraction_coupon_recomputed_after_bump() {
        let book: CouponBook = [Coupon::from_stored_value("DEZ", 0.1)].into_iter().collect();
        let mut session = ready_session();
        session.apply_coupon("DEZ", &book).unwrap();
        assert_eq!(session.summary().discount, Money::from_cents(1_000));

        assert!(session.toggle_order_bump().unwrap());
        assert_eq!(session.summary().discount, Money::from_cents(1_500));

        session.remove_coupon().unwrap();
        assert_eq!(session.summary().discount, Money::zero());
    }

    #[test]
    fn test_unknown_quote_and_coupon() {
        let mut session = ready_session();
        assert!(matches!(
            session.select_shipping_quote("drone"),
            Err(CoreError::UnknownShippingQuote(_))
        ));
        assert_eq!(session.selected_quote_id.as_deref(), Some("pac"));

        assert!(matches!(
            session.apply_coupon("NADA", &CouponBook::new()),
            Err(CoreError::CouponNotFound(_))
        ));
    }

    #[test]
    fn test_digital_goods_ignore_quotes() {
        let mut session = CheckoutSession::new(offer(ProductKind::Digital), Money::zero());
        session.set_shipping_quotes(vec![quote("pac", 1_500)]).unwrap();
        assert!(session.shipping_quotes.is_empty());

        let mut buyer = customer();
        buyer.address = None;
        session.update_customer(buyer).unwrap();
        session.go_to(CheckoutStep::Review).unwrap();
        assert_eq!(session.summary().shipping, Money::zero());
    }

    #[test]
    fn test_forward_navigation_is_gated() {
        let mut session = CheckoutSession::new(offer(ProductKind::Physical), Money::zero());
        assert!(matches!(
            session.go_to(CheckoutStep::Review),
            Err(CoreError::Validation(_))
        ));

        session.update_customer(customer()).unwrap();
        assert!(matches!(
            session.go_to(CheckoutStep::Review),
            Err(CoreError::CheckoutIncomplete { .. })
        ));

        session.set_shipping_quotes(vec![quote("pac", 1_500)]).unwrap();
        session.select_shipping_quote("pac").unwrap();
        session.go_to(CheckoutStep::Review).unwrap();
        assert_eq!(session.step, CheckoutStep::Review);
    }

    #[test]
    fn test_terms_must_be_accepted() {
        let mut session = ready_session();
        let mut buyer = customer();
        buyer.has_accepted_terms = false;
        session.update_customer(buyer).unwrap();
        assert!(matches!(
            session.go_to(CheckoutStep::Review),
            Err(CoreError::CheckoutIncomplete { .. })
        ));
    }

    #[test]
    fn test_cannot_skip_or_enter_processing_directly() {
        let mut session = ready_session();
        assert!(matches!(
            session.go_to(CheckoutStep::Payment),
            Err(CoreError::InvalidStepTransition { .. })
        ));
        assert!(matches!(
            session.go_to(CheckoutStep::Processing),
            Err(CoreError::InvalidStepTransition { .. })
        ));

        session.go_to(CheckoutStep::Review).unwrap();
        session.go_to(CheckoutStep::Payment).unwrap();
        session.go_to(CheckoutStep::Identification).unwrap();
        assert_eq!(session.step, CheckoutStep::Identification);
    }

    #[test]
    fn test_payment_success_flow() {
        let mut session = ready_session();
        session.set_payment_method(PaymentMethod::CreditCard).unwrap();
        session.set_installments(3).unwrap();
        session.go_to(CheckoutStep::Review).unwrap();
        session.go_to(CheckoutStep::Payment).unwrap();

        let intent = session.begin_payment().unwrap();
        assert_eq!(intent.amount, Money::from_cents(11_500));
        assert_eq!(intent.method, PaymentMethod::CreditCard);
        assert_eq!(intent.installments, 3);
        assert_eq!(session.step, CheckoutStep::Processing);

        assert!(matches!(session.toggle_order_bump(), Err(CoreError::CheckoutLocked { .. })));

        let step = session.finish_payment(PaymentStatus::Pending, None).unwrap();
        assert_eq!(step, CheckoutStep::Success);
        assert!(session.go_to(CheckoutStep::Review).is_err());
    }

    #[test]
    fn test_failed_payment_returns_to_payment_step() {
        let mut session = ready_session();
        session.set_payment_method(PaymentMethod::Pix).unwrap();
        session.go_to(CheckoutStep::Review).unwrap();
        session.go_to(CheckoutStep::Payment).unwrap();
        session.begin_payment().unwrap();

        let step = session
            .finish_payment(PaymentStatus::Failed, Some("cartão recusado".to_string()))
            .unwrap();
        assert_eq!(step, CheckoutStep::Payment);
        assert_eq!(session.last_error.as_deref(), Some("cartão recusado"));

        let retry = session.begin_payment().unwrap();
        assert_eq!(retry.method, PaymentMethod::Pix);
        assert!(session.last_error.is_none());
    }

    #[test]
    fn test_wallet_covers_whole_order() {
        let mut session = ready_session();
        session.set_wallet(Some("cliente-1".to_string()), Money::from_cents(50_000));
        session.set_balance_to_use(Money::from_cents(50_000)).unwrap();
        session.go_to(CheckoutStep::Review).unwrap();
        session.go_to(CheckoutStep::Payment).unwrap();

        let intent = session.begin_payment().unwrap();
        assert_eq!(intent.summary.balance_used, Money::from_cents(11_500));
        assert_eq!(intent.method, PaymentMethod::WalletBalance);
        assert!(intent.is_settled_without_gateway());
    }

    #[test]
    fn test_smaller_wallet_clamps_chosen_balance() {
        let mut session = ready_session();
        session.set_wallet(Some("cliente-1".to_string()), Money::from_cents(8_000));
        session.set_balance_to_use(Money::from_cents(5_000)).unwrap();

        session.set_wallet(Some("cliente-1".to_string()), Money::from_cents(3_000));
        assert_eq!(session.requested_balance, Money::from_cents(3_000));
        assert_eq!(session.summary().balance_used, Money::from_cents(3_000));

        session.set_wallet(Some("cliente-1".to_string()), Money::from_cents(8_000));
        assert_eq!(session.requested_balance, Money::from_cents(3_000));
    }

    #[test]
    fn test_installments_bounds() {
        let mut session = ready_session();
        assert!(matches!(
            session.set_installments(13),
            Err(CoreError::TooManyInstallments { requested: 13, max: 12 })
        ));
        assert!(matches!(session.set_installments(0), Err(CoreError::Validation(_))));

        session.set_installments(6).unwrap();
        session.set_payment_method(PaymentMethod::Boleto).unwrap();
        assert_eq!(session.installments, 1);
    }
}
