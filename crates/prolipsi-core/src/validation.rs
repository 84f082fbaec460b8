//! # Validation Module
//!
//! Input validation for the checkout identification step and billing forms.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front-end (TypeScript)                                       │
//! │  ├── Input masks (CPF, phone, CEP)                                     │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: checkout-api handler (Rust)                                  │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use prolipsi_core::validation::{validate_cpf, validate_quantity};
//!
//! validate_cpf("529.982.247-25").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::postal_code::PostalCode;
use crate::types::{Address, Customer};
use crate::{MAX_INSTALLMENTS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Strips everything but ASCII digits ("529.982.247-25" → "52998224725").
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

// =============================================================================
// Identity Validators
// =============================================================================

/// Validates an e-mail address.
///
/// ## Rules
/// - Exactly one `@`, with a non-empty local part
/// - Domain contains a dot with text on both sides
/// - No whitespace
///
/// ## Example
/// ```rust
/// use prolipsi_core::validation::validate_email;
///
/// assert!(validate_email("ana@rsprolipsi.com.br").is_ok());
/// assert!(validate_email("ana@localhost").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::invalid("email", "missing @"));
    };

    let clean = |part: &str| !part.is_empty() && !part.contains('@') && !part.contains(char::is_whitespace);
    if !clean(local) || !clean(domain) {
        return Err(ValidationError::invalid("email", "malformed address"));
    }

    let has_inner_dot = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !has_inner_dot {
        return Err(ValidationError::invalid("email", "domain must contain a dot"));
    }

    Ok(())
}

/// Validates a CPF (Cadastro de Pessoas Físicas).
///
/// ## Rules
/// - 11 digits after stripping punctuation
/// - Not all digits equal (`111.111.111-11` passes the checksum but is void)
/// - Both check digits match the mod-11 algorithm
///
/// ## Check Digit Calculation
/// ```text
/// digits:   5  2  9  9  8  2  2  4  7 │ 2  5
/// weights: 10  9  8  7  6  5  4  3  2 │        → first check digit
/// weights: 11 10  9  8  7  6  5  4  3 │ 2      → second check digit
///
/// dv = (Σ digit × weight) × 10 mod 11, with 10 → 0
/// ```
///
/// ## Example
/// ```rust
/// use prolipsi_core::validation::validate_cpf;
///
/// assert!(validate_cpf("529.982.247-25").is_ok());
/// assert!(validate_cpf("529.982.247-24").is_err());
/// assert!(validate_cpf("000.000.000-00").is_err());
/// ```
pub fn validate_cpf(cpf: &str) -> ValidationResult<()> {
    let digits: Vec<u32> = cpf.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.is_empty() {
        return Err(ValidationError::required("cpf"));
    }

    if digits.len() != 11 {
        return Err(ValidationError::invalid("cpf", "must have 11 digits"));
    }

    if digits.iter().all(|d| *d == digits[0]) {
        return Err(ValidationError::invalid("cpf", "repeated digits"));
    }

    let check_digit = |len: usize| -> u32 {
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        match (sum * 10) % 11 {
            10 => 0,
            dv => dv,
        }
    };

    if check_digit(9) != digits[9] || check_digit(10) != digits[10] {
        return Err(ValidationError::invalid("cpf", "check digits do not match"));
    }

    Ok(())
}

/// Validates a Brazilian phone number.
///
/// ## Rules
/// - Between 10 and 13 digits once punctuation is removed
///   (DDD + number, optionally prefixed by the 55 country code)
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let digits = digits_only(phone);

    if digits.is_empty() {
        return Err(ValidationError::required("phone"));
    }

    if digits.len() < 10 {
        return Err(ValidationError::TooShort {
            field: "phone".to_string(),
            min: 10,
        });
    }

    if digits.len() > 13 {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: 13,
        });
    }

    Ok(())
}

/// Validates the buyer's full name.
///
/// ## Rules
/// - More than 3 characters after trimming
/// - At most 120 characters
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    let len = name.chars().count();
    if len <= 3 {
        return Err(ValidationError::TooShort {
            field: "name".to_string(),
            min: 4,
        });
    }

    if len > 120 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 120,
        });
    }

    Ok(())
}

/// Validates a birth date typed as `dd/mm/yyyy` and returns it parsed.
///
/// ## Example
/// ```rust
/// use prolipsi_core::validation::validate_birth_date;
///
/// assert!(validate_birth_date("29/02/2000").is_ok());
/// assert!(validate_birth_date("29/02/2001").is_err());
/// assert!(validate_birth_date("2000-02-29").is_err());
/// ```
pub fn validate_birth_date(input: &str) -> ValidationResult<NaiveDate> {
    let input = input.trim();

    if input.is_empty() {
        return Err(ValidationError::required("birth_date"));
    }

    let bytes = input.as_bytes();
    if bytes.len() != 10 || bytes[2] != b'/' || bytes[5] != b'/' {
        return Err(ValidationError::invalid("birth_date", "expected dd/mm/yyyy"));
    }

    NaiveDate::parse_from_str(input, "%d/%m/%Y")
        .map_err(|_| ValidationError::invalid("birth_date", "not a calendar date"))
}

/// Validates everything the identification step collects, except the address.
pub fn validate_customer(customer: &Customer) -> ValidationResult<()> {
    validate_email(&customer.email)?;
    validate_cpf(&customer.cpf)?;
    validate_customer_name(&customer.name)?;
    validate_phone(&customer.phone)?;
    validate_birth_date(&customer.birth_date)?;
    Ok(())
}

// =============================================================================
// Address Validators
// =============================================================================

/// Validates a delivery address.
///
/// ## Rules
/// - Postal code parses as an 8-digit CEP
/// - Street, number, neighborhood and city are non-empty
/// - State is a two-letter UF code
pub fn validate_address(address: &Address) -> ValidationResult<()> {
    PostalCode::parse(&address.postal_code)?;

    for (field, value) in [
        ("street", &address.street),
        ("number", &address.number),
        ("neighborhood", &address.neighborhood),
        ("city", &address.city),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::required(field));
        }
    }

    let state = address.state.trim();
    if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::invalid("state", "must be a two-letter UF code"));
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Example
/// ```rust
/// use prolipsi_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1990).is_ok());  // R$ 19,90
/// assert!(validate_price_cents(0).is_ok());     // Free item
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates the contracted due day of a monthly invoice (1..=31).
pub fn validate_due_day(day: i64) -> ValidationResult<()> {
    if !(1..=31).contains(&day) {
        return Err(ValidationError::OutOfRange {
            field: "due_day".to_string(),
            min: 1,
            max: 31,
        });
    }

    Ok(())
}

/// Validates the number of card installments (1..=MAX_INSTALLMENTS).
pub fn validate_installments(installments: u32) -> ValidationResult<()> {
    if installments == 0 || installments > MAX_INSTALLMENTS {
        return Err(ValidationError::OutOfRange {
            field: "installments".to_string(),
            min: 1,
            max: MAX_INSTALLMENTS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Code Validators
// =============================================================================

/// Validates a coupon code.
///
/// ## Rules
/// - Must not be empty
/// - At most 32 characters
/// - Letters, digits, hyphens and underscores only
pub fn validate_coupon_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required("coupon"));
    }

    if code.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "coupon".to_string(),
            max: 32,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid(
            "coupon",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(())
}

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use prolipsi_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::invalid("id", "must be a valid UUID"))?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
