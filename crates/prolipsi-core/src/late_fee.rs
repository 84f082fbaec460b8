//! # Late Fees on Monthly Invoices
//!
//! Van operators bill guardians monthly. When an invoice is paid after its
//! due date the PIX charge includes a *multa* (one-off penalty) plus
//! interest that accrues per day late.
//!
//! ## Computation
//! ```text
//!  due day (student) ──► due_date_for_cycle(day, today)
//!        or                   │  this month's day, or last month's
//!  fixed due date ────────────┤  if this month's is still ahead
//!                             ▼
//!               days = max(0, today − due)
//!                             │
//!            ┌────────────────┴────────────────┐
//!            ▼ Flat                            ▼ Percentage
//!   multa    = fixed amount           multa    = amount × multa%
//!   interest = days × per-day         interest = amount × (monthly% / 30) × days
//!            └────────────────┬────────────────┘
//!                             ▼
//!               total = amount + multa + interest
//! ```
//!
//! "Today" is the civil date in Brasília (UTC−3), see [`today_in_brasilia`].
//! The monthly rate is prorated over a flat 30 days regardless of the
//! calendar month.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{div_round_half_up, Money};
use crate::types::{MonthlyInvoice, Rate};

// =============================================================================
// Fee Policy
// =============================================================================

/// Default flat multa: R$ 10,00.
pub const DEFAULT_FLAT_MULTA: Money = Money::from_cents(1_000);
/// Default flat interest: R$ 2,00 per day.
pub const DEFAULT_FLAT_PER_DAY: Money = Money::from_cents(200);
/// Default percentage multa: 2 %.
pub const DEFAULT_MULTA_RATE: Rate = Rate::from_bps(200);
/// Default monthly interest: 1 % a month.
pub const DEFAULT_MONTHLY_INTEREST: Rate = Rate::from_bps(100);

/// How late fees are charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FeePolicy {
    /// Fixed multa plus a fixed amount per day late.
    Flat {
        multa: Money,
        #[serde(rename = "perDay")]
        per_day: Money,
    },
    /// Multa as a share of the amount plus a monthly rate prorated daily.
    Percentage {
        multa: Rate,
        #[serde(rename = "monthlyInterest")]
        monthly_interest: Rate,
    },
}

impl Default for FeePolicy {
    fn default() -> Self {
        FeePolicySettings::default().resolve()
    }
}

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FeeMode {
    #[default]
    Flat,
    Percentage,
}

/// Fee settings as an operator saved them.
///
/// A value of zero (or less) means "not configured" and falls back to the
/// default for that field, so an operator who never touched the screen still
/// charges R$ 10,00 + R$ 2,00/day.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FeePolicySettings {
    pub mode: FeeMode,
    pub multa_cents: i64,
    pub per_day_cents: i64,
    pub multa_bps: i64,
    pub monthly_interest_bps: i64,
}

impl FeePolicySettings {
    /// Applies the defaults and returns the effective policy.
    ///
    /// ## Example
    /// ```rust
    /// use prolipsi_core::late_fee::{FeeMode, FeePolicy, FeePolicySettings};
    /// use prolipsi_core::money::Money;
    ///
    /// let settings = FeePolicySettings { mode: FeeMode::Flat, per_day_cents: 350, ..Default::default() };
    /// assert_eq!(
    ///     settings.resolve(),
    ///     FeePolicy::Flat { multa: Money::from_cents(1_000), per_day: Money::from_cents(350) }
    /// );
    /// ```
    pub fn resolve(&self) -> FeePolicy {
        let money_or = |cents: i64, default: Money| {
            if cents > 0 {
                Money::from_cents(cents)
            } else {
                default
            }
        };
        let rate_or = |bps: i64, default: Rate| match u32::try_from(bps) {
            Ok(bps) if bps > 0 => Rate::from_bps(bps),
            _ => default,
        };

        match self.mode {
            FeeMode::Flat => FeePolicy::Flat {
                multa: money_or(self.multa_cents, DEFAULT_FLAT_MULTA),
                per_day: money_or(self.per_day_cents, DEFAULT_FLAT_PER_DAY),
            },
            FeeMode::Percentage => FeePolicy::Percentage {
                multa: rate_or(self.multa_bps, DEFAULT_MULTA_RATE),
                monthly_interest: rate_or(self.monthly_interest_bps, DEFAULT_MONTHLY_INTEREST),
            },
        }
    }
}

// =============================================================================
// Due Date
// =============================================================================

/// Where an invoice's due date comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDate {
    /// Contracted day of month; the cycle is picked relative to today.
    ///
    /// A day past the end of the month clamps to the month's last day:
    /// day 31 falls on April 30 and on February 28 or 29. It never rolls
    /// over into the following month, so a due day of 31 cannot land on
    /// May 1st.
    DayOfMonth(u32),
    /// A fixed calendar date.
    Fixed(NaiveDate),
}

impl DueDate {
    /// The student's due day wins over the invoice's stored date.
    pub fn for_invoice(invoice: &MonthlyInvoice) -> Option<DueDate> {
        match invoice.due_day {
            Some(day) if day > 0 => Some(DueDate::DayOfMonth(day.min(31) as u32)),
            _ => invoice.due_date.map(DueDate::Fixed),
        }
    }

    /// Resolves to a calendar date for the cycle containing `today`.
    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            DueDate::DayOfMonth(day) => due_date_for_cycle(*day, today),
            DueDate::Fixed(date) => *date,
        }
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

fn days_in_month(first: NaiveDate) -> u32 {
    first
        .checked_add_months(Months::new(1))
        .map(|next| (next - first).num_days() as u32)
        .unwrap_or(31)
}

fn day_in_month(first: NaiveDate, day: u32) -> NaiveDate {
    let day = day.clamp(1, days_in_month(first));
    first + Duration::days(i64::from(day - 1))
}

/// Due date of the current billing cycle.
///
/// The due day in the current month, unless that is still ahead of `today`,
/// in which case the same day of the previous month. Days past the end of a
/// month clamp to its last day (day 31 in April is April 30).
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use prolipsi_core::late_fee::due_date_for_cycle;
///
/// let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
/// assert_eq!(due_date_for_cycle(5, today), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
/// assert_eq!(due_date_for_cycle(15, today), NaiveDate::from_ymd_opt(2024, 2, 15).unwrap());
/// assert_eq!(due_date_for_cycle(31, today), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
/// ```
pub fn due_date_for_cycle(day: u32, today: NaiveDate) -> NaiveDate {
    let this_month = first_of_month(today);
    let candidate = day_in_month(this_month, day);
    if candidate <= today {
        return candidate;
    }

    let previous_month = first_of_month(this_month - Duration::days(1));
    day_in_month(previous_month, day)
}

/// Whole days between `due` and `today`, never negative.
pub fn days_overdue(due: NaiveDate, today: NaiveDate) -> i64 {
    (today - due).num_days().max(0)
}

/// Civil date in Brasília for a UTC instant.
pub fn today_in_brasilia(now: DateTime<Utc>) -> NaiveDate {
    (now - Duration::hours(3)).date_naive()
}

// =============================================================================
// Calculation
// =============================================================================

/// Result of a late-fee calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LateFee {
    pub amount: Money,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub days_overdue: i64,
    pub multa: Money,
    pub interest: Money,
    pub total: Money,
}

impl LateFee {
    /// No fee: the amount is owed as is.
    pub fn none(amount: Money, due_date: Option<NaiveDate>) -> Self {
        LateFee {
            amount,
            due_date,
            days_overdue: 0,
            multa: Money::zero(),
            interest: Money::zero(),
            total: amount,
        }
    }

    /// Multa plus interest.
    pub fn fee(&self) -> Money {
        self.multa + self.interest
    }

    pub fn is_overdue(&self) -> bool {
        self.days_overdue > 0
    }
}

/// Computes the amount payable today.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use prolipsi_core::late_fee::{calculate_late_fee, DueDate, FeePolicy};
/// use prolipsi_core::money::Money;
///
/// let fee = calculate_late_fee(
///     Money::from_cents(10_000),
///     DueDate::DayOfMonth(5),
///     NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
///     &FeePolicy::Flat { multa: Money::from_cents(1_000), per_day: Money::from_cents(200) },
/// );
/// assert_eq!(fee.days_overdue, 5);
/// assert_eq!(fee.total.cents(), 12_000);
/// ```
pub fn calculate_late_fee(
    amount: Money,
    due: DueDate,
    today: NaiveDate,
    policy: &FeePolicy,
) -> LateFee {
    let due_date = due.resolve(today);
    let days = days_overdue(due_date, today);
    if days == 0 {
        return LateFee::none(amount, Some(due_date));
    }

    let (multa, interest) = match policy {
        FeePolicy::Flat { multa, per_day } => (*multa, per_day.multiply_quantity(days)),
        FeePolicy::Percentage {
            multa,
            monthly_interest,
        } => {
            let interest = div_round_half_up(
                amount.cents() as i128 * monthly_interest.bps() as i128 * days as i128,
                30 * 10_000,
            );
            (amount.percentage(*multa), Money::from_cents(interest))
        }
    };

    LateFee {
        amount,
        due_date: Some(due_date),
        days_overdue: days,
        multa,
        interest,
        total: amount + multa + interest,
    }
}

/// Late fee for a stored invoice. Invoices with no due information owe
/// their face value.
pub fn late_fee_for_invoice(
    invoice: &MonthlyInvoice,
    today: NaiveDate,
    policy: &FeePolicy,
) -> LateFee {
    match DueDate::for_invoice(invoice) {
        Some(due) => calculate_late_fee(invoice.amount(), due, today, policy),
        None => LateFee::none(invoice.amount(), None),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InvoiceStatus;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(due_day: Option<i64>, due_date: Option<NaiveDate>) -> MonthlyInvoice {
        MonthlyInvoice {
            id: "inv-1".to_string(),
            owner_id: "op-1".to_string(),
            student_name: "Pedro".to_string(),
            payer_email: None,
            payer_cpf: None,
            amount_cents: 30_000,
            due_day,
            due_date,
            status: InvoiceStatus::Pending,
            pix_payment_id: None,
            pix_qr_code: None,
            pix_qr_code_base64: None,
            charged_amount_cents: None,
            paid_on: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_flat_example() {
        let fee = calculate_late_fee(
            Money::from_cents(10_000),
            DueDate::DayOfMonth(5),
            date(2024, 6, 10),
            &FeePolicy::Flat {
                multa: Money::from_cents(1_000),
                per_day: Money::from_cents(200),
            },
        );

        assert_eq!(fee.due_date, Some(date(2024, 6, 5)));
        assert_eq!(fee.days_overdue, 5);
        assert_eq!(fee.multa, Money::from_cents(1_000));
        assert_eq!(fee.interest, Money::from_cents(1_000));
        assert_eq!(fee.total, Money::from_cents(12_000));
        assert_eq!(fee.fee(), Money::from_cents(2_000));
    }

    #[test]
    fn test_percentage_example() {
        let fee = calculate_late_fee(
            Money::from_cents(20_000),
            DueDate::Fixed(date(2024, 6, 1)),
            date(2024, 6, 16),
            &FeePolicy::Percentage {
                multa: Rate::from_bps(200),
                monthly_interest: Rate::from_bps(100),
            },
        );

        assert_eq!(fee.days_overdue, 15);
        assert_eq!(fee.multa, Money::from_cents(400));
        assert_eq!(fee.interest, Money::from_cents(100));
        assert_eq!(fee.total, Money::from_cents(20_500));
    }

    #[test]
    fn test_not_overdue_means_no_fee() {
        let policy = FeePolicy::default();
        for today in [date(2024, 6, 5), date(2024, 6, 4)] {
            let fee = calculate_late_fee(Money::from_cents(15_000), DueDate::DayOfMonth(5), today, &policy);
            if today.day() == 5 {
                assert_eq!(fee.days_overdue, 0);
                assert_eq!(fee.multa, Money::zero());
                assert_eq!(fee.interest, Money::zero());
                assert_eq!(fee.total, Money::from_cents(15_000));
                assert!(!fee.is_overdue());
            } else {
                // Before the 5th the cycle is May 5th: 30 days late.
                assert_eq!(fee.due_date, Some(date(2024, 5, 5)));
                assert_eq!(fee.days_overdue, 30);
            }
        }

        let future = calculate_late_fee(
            Money::from_cents(15_000),
            DueDate::Fixed(date(2024, 7, 1)),
            date(2024, 6, 20),
            &policy,
        );
        assert_eq!(future.total, Money::from_cents(15_000));
    }

    #[test]
    fn test_due_date_rolls_back_across_year() {
        assert_eq!(due_date_for_cycle(20, date(2024, 1, 10)), date(2023, 12, 20));
        assert_eq!(due_date_for_cycle(31, date(2024, 4, 30)), date(2024, 4, 30));
        assert_eq!(due_date_for_cycle(31, date(2023, 3, 15)), date(2023, 2, 28));
        assert_eq!(due_date_for_cycle(0, date(2024, 5, 3)), date(2024, 5, 1));
    }

    #[test]
    fn test_day_of_month_clamps_instead_of_rolling_over() {
        let due = DueDate::DayOfMonth(31);
        assert_eq!(due.resolve(date(2024, 5, 2)), date(2024, 4, 30));
        assert_eq!(due.resolve(date(2024, 3, 1)), date(2024, 2, 29));

        let fee = calculate_late_fee(
            Money::from_cents(10_000),
            due,
            date(2024, 5, 2),
            &FeePolicy::default(),
        );
        assert_eq!(fee.due_date, Some(date(2024, 4, 30)));
        assert_eq!(fee.days_overdue, 2);
    }

    #[test]
    fn test_settings_fall_back_to_defaults() {
        assert_eq!(
            FeePolicy::default(),
            FeePolicy::Flat {
                multa: DEFAULT_FLAT_MULTA,
                per_day: DEFAULT_FLAT_PER_DAY
            }
        );

        let pct = FeePolicySettings {
            mode: FeeMode::Percentage,
            multa_bps: 0,
            monthly_interest_bps: -5,
            ..Default::default()
        };
        assert_eq!(
            pct.resolve(),
            FeePolicy::Percentage {
                multa: DEFAULT_MULTA_RATE,
                monthly_interest: DEFAULT_MONTHLY_INTEREST
            }
        );

        let custom = FeePolicySettings {
            mode: FeeMode::Percentage,
            multa_bps: 500,
            monthly_interest_bps: 300,
            ..Default::default()
        };
        assert_eq!(
            custom.resolve(),
            FeePolicy::Percentage {
                multa: Rate::from_bps(500),
                monthly_interest: Rate::from_bps(300)
            }
        );
    }

    #[test]
    fn test_invoice_due_day_wins_over_date() {
        let today = date(2024, 6, 12);
        let policy = FeePolicy::default();

        let by_day = late_fee_for_invoice(&invoice(Some(10), Some(date(2024, 6, 1))), today, &policy);
        assert_eq!(by_day.days_overdue, 2);

        let by_date = late_fee_for_invoice(&invoice(None, Some(date(2024, 6, 1))), today, &policy);
        assert_eq!(by_date.days_overdue, 11);

        let unknown = late_fee_for_invoice(&invoice(None, None), today, &policy);
        assert_eq!(unknown.total, Money::from_cents(30_000));
        assert_eq!(unknown.due_date, None);
    }

    #[test]
    fn test_today_in_brasilia() {
        let late_night_utc = Utc.with_ymd_and_hms(2024, 6, 11, 2, 30, 0).unwrap();
        assert_eq!(today_in_brasilia(late_night_utc), date(2024, 6, 10));

        let morning_utc = Utc.with_ymd_and_hms(2024, 6, 11, 3, 0, 0).unwrap();
        assert_eq!(today_in_brasilia(morning_utc), date(2024, 6, 11));
    }
}
