//! Coupon codes accepted by a checkout offer.
//!
//! Codes are matched case-insensitively: the book stores them upper-cased and
//! every lookup upper-cases its input, so `bemvindo10` and `BEMVINDO10` hit
//! the same coupon.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::summary::CouponDiscount;
use crate::error::{CoreError, CoreResult};
use crate::validation::validate_coupon_code;

/// A coupon the buyer applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub code: String,
    pub discount: CouponDiscount,
}

impl Coupon {
    pub fn new(code: &str, discount: CouponDiscount) -> Self {
        Coupon {
            code: normalize_code(code),
            discount,
        }
    }

    /// Builds a coupon from its stored numeric value (see
    /// [`CouponDiscount::from_stored_value`]).
    pub fn from_stored_value(code: &str, value: f64) -> Self {
        Coupon::new(code, CouponDiscount::from_stored_value(value))
    }
}

/// Upper-cases and trims a code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// The set of coupons currently valid for an offer.
#[derive(Debug, Clone, Default)]
pub struct CouponBook {
    coupons: HashMap<String, Coupon>,
}

impl CouponBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a coupon.
    pub fn insert(&mut self, coupon: Coupon) {
        self.coupons.insert(coupon.code.clone(), coupon);
    }

    /// Looks a code up, ignoring case.
    ///
    /// ## Example
    /// ```rust
    /// use prolipsi_core::checkout::{Coupon, CouponBook};
    ///
    /// let book: CouponBook = [Coupon::from_stored_value("BEMVINDO10", 0.1)].into_iter().collect();
    /// assert!(book.find("bemvindo10").is_ok());
    /// assert!(book.find("NATAL").is_err());
    /// ```
    pub fn find(&self, code: &str) -> CoreResult<&Coupon> {
        validate_coupon_code(code)?;
        let normalized = normalize_code(code);
        self.coupons
            .get(&normalized)
            .ok_or(CoreError::CouponNotFound(normalized))
    }

    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }
}

impl FromIterator<Coupon> for CouponBook {
    fn from_iter<I: IntoIterator<Item = Coupon>>(iter: I) -> Self {
        let mut book = CouponBook::new();
        for coupon in iter {
            book.insert(coupon);
        }
        book
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn book() -> CouponBook {
        [
            Coupon::from_stored_value("bemvindo10", 0.1),
            Coupon::from_stored_value("RS25", 25.0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let book = book();
        assert_eq!(book.len(), 2);

        let coupon = book.find("BemVindo10").unwrap();
        assert_eq!(coupon.code, "BEMVINDO10");

        let flat = book.find(" rs25 ").unwrap();
        assert_eq!(flat.discount, CouponDiscount::Flat(Money::from_cents(2_500)));
    }

    #[test]
    fn test_unknown_code() {
        let err = book().find("NATAL").unwrap_err();
        assert!(matches!(err, CoreError::CouponNotFound(code) if code == "NATAL"));
    }

    #[test]
    fn test_malformed_code_is_a_validation_error() {
        assert!(matches!(book().find(""), Err(CoreError::Validation(_))));
        assert!(matches!(book().find("NO WAY"), Err(CoreError::Validation(_))));
    }
}
