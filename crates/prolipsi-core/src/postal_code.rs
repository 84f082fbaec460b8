//! # Postal Codes (CEP)
//!
//! A Brazilian CEP is 8 digits, written `NNNNN-NNN`. The first digit
//! identifies the postal region, which is what the fallback shipping table
//! buckets on.
//!
//! ```text
//!   0 1 3 1 0 - 1 0 0
//!   │ └─┬─┘
//!   │   └── sector / sub-region
//!   └────── region (0 = Grande São Paulo, 9 = RS, ...)
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A cleaned 8-digit CEP.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostalCode(String);

impl PostalCode {
    /// Parses user input, ignoring every non-digit character.
    ///
    /// ## Example
    /// ```rust
    /// use prolipsi_core::PostalCode;
    ///
    /// let cep = PostalCode::parse("01310-100").unwrap();
    /// assert_eq!(cep.digits(), "01310100");
    /// assert_eq!(cep.to_string(), "01310-100");
    /// assert!(PostalCode::parse("1310-100").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.is_empty() {
            return Err(ValidationError::required("postal_code"));
        }

        if digits.len() != 8 {
            return Err(ValidationError::invalid("postal_code", "must have 8 digits"));
        }

        Ok(PostalCode(digits))
    }

    /// The 8 digits without separator.
    #[inline]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// First digit, 0..=9.
    #[inline]
    pub fn leading_digit(&self) -> u8 {
        self.0.as_bytes()[0] - b'0'
    }

    /// First `n` digits (capped at 8).
    pub fn prefix(&self, n: usize) -> &str {
        &self.0[..n.min(8)]
    }

    /// The CEP as a number, for range checks.
    pub fn as_number(&self) -> u32 {
        self.0
            .bytes()
            .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'))
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", &self.0[..5], &self.0[5..])
    }
}

impl FromStr for PostalCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PostalCode::parse(s)
    }
}

impl TryFrom<String> for PostalCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PostalCode::parse(&value)
    }
}

impl From<PostalCode> for String {
    fn from(value: PostalCode) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_punctuation() {
        let cep = PostalCode::parse(" 90.010-000 ").unwrap();
        assert_eq!(cep.digits(), "90010000");
        assert_eq!(cep.leading_digit(), 9);
        assert_eq!(cep.prefix(3), "900");
        assert_eq!(cep.prefix(20), "90010000");
        assert_eq!(cep.as_number(), 90_010_000);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(matches!(
            PostalCode::parse(""),
            Err(ValidationError::Required { .. })
        ));
        assert!(PostalCode::parse("0131010").is_err());
        assert!(PostalCode::parse("013101000").is_err());
    }

    #[test]
    fn test_serde_uses_digits() {
        let cep: PostalCode = serde_json::from_str("\"01310-100\"").unwrap();
        assert_eq!(serde_json::to_string(&cep).unwrap(), "\"01310100\"");
        assert!(serde_json::from_str::<PostalCode>("\"123\"").is_err());
    }
}
