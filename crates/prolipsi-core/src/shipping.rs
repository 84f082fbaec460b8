//! # Fallback Shipping Table
//!
//! Static quotes used when the live freight service times out or fails.
//! The first digit of the destination CEP picks a region tier; every carrier
//! option is derived from that tier's base price and lead time.
//!
//! ## Region Tiers
//! ```text
//! ┌───────┬──────────────────────────┬────────────┬──────────────┐
//! │ Digit │ Region                   │ Base price │ Base lead    │
//! ├───────┼──────────────────────────┼────────────┼──────────────┤
//! │ 0     │ Metro (Grande São Paulo) │ R$ 15,90   │ 1 day        │
//! │ 1 2 3 │ Southeast                │ R$ 22,90   │ 2 days       │
//! │ 8 9   │ South                    │ R$ 27,90   │ 3 days       │
//! │ 7     │ Center-west              │ R$ 32,90   │ 4 days       │
//! │ 4 5 6 │ North / Northeast        │ R$ 39,90   │ 6 days       │
//! └───────┴──────────────────────────┴────────────┴──────────────┘
//! ```
//!
//! ## Carrier Variants
//! ```text
//!   PAC      base × 1.0   lead + 4
//!   SEDEX    base × 1.8   lead + 0
//!   Jadlog   base × 1.3   lead + 2
//!   Moto     R$ 19,90     same day   (CEP 01000-000 ..= 05999-999 only)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::postal_code::PostalCode;
use crate::types::Rate;

// =============================================================================
// Types
// =============================================================================

/// Region tier selected by the CEP's leading digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShippingRegion {
    Metro,
    Southeast,
    South,
    CenterWest,
    NorthNortheast,
}

impl ShippingRegion {
    /// Base price of the tier.
    pub const fn base_price(&self) -> Money {
        match self {
            ShippingRegion::Metro => Money::from_cents(1_590),
            ShippingRegion::Southeast => Money::from_cents(2_290),
            ShippingRegion::South => Money::from_cents(2_790),
            ShippingRegion::CenterWest => Money::from_cents(3_290),
            ShippingRegion::NorthNortheast => Money::from_cents(3_990),
        }
    }

    /// Base lead time of the tier, in business days.
    pub const fn base_days(&self) -> u32 {
        match self {
            ShippingRegion::Metro => 1,
            ShippingRegion::Southeast => 2,
            ShippingRegion::South => 3,
            ShippingRegion::CenterWest => 4,
            ShippingRegion::NorthNortheast => 6,
        }
    }
}

/// One delivery option offered to the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    pub id: String,
    pub carrier: String,
    pub service: String,
    pub price: Money,
    /// Estimated lead time; 0 means same-day delivery.
    pub delivery_days: u32,
}

struct Variant {
    id: &'static str,
    carrier: &'static str,
    service: &'static str,
    multiplier: Rate,
    extra_days: u32,
}

const VARIANTS: [Variant; 3] = [
    Variant {
        id: "pac",
        carrier: "Correios",
        service: "PAC",
        multiplier: Rate::from_bps(10_000),
        extra_days: 4,
    },
    Variant {
        id: "sedex",
        carrier: "Correios",
        service: "SEDEX",
        multiplier: Rate::from_bps(18_000),
        extra_days: 0,
    },
    Variant {
        id: "jadlog",
        carrier: "Jadlog",
        service: ".Package",
        multiplier: Rate::from_bps(13_000),
        extra_days: 2,
    },
];

/// Same-day motorcycle courier price.
pub const MOTO_PRICE: Money = Money::from_cents(1_990);

/// CEP range served by the same-day courier (central São Paulo).
pub const MOTO_RANGE: std::ops::RangeInclusive<u32> = 1_000_000..=5_999_999;

// =============================================================================
// Lookup
// =============================================================================

/// Maps a CEP to its region tier.
pub fn region_for(postal_code: &PostalCode) -> ShippingRegion {
    match postal_code.leading_digit() {
        0 => ShippingRegion::Metro,
        1..=3 => ShippingRegion::Southeast,
        4..=6 => ShippingRegion::NorthNortheast,
        7 => ShippingRegion::CenterWest,
        _ => ShippingRegion::South,
    }
}

/// Whether the same-day courier delivers to this CEP.
pub fn is_same_day_metro(postal_code: &PostalCode) -> bool {
    MOTO_RANGE.contains(&postal_code.as_number())
}

/// Builds the static quote list for a destination.
///
/// ## Example
/// ```rust
/// use prolipsi_core::shipping::fallback_quotes;
/// use prolipsi_core::PostalCode;
///
/// let quotes = fallback_quotes(&PostalCode::parse("01310-100").unwrap());
/// let ids: Vec<_> = quotes.iter().map(|q| q.id.as_str()).collect();
/// assert_eq!(ids, ["pac", "sedex", "jadlog", "moto"]);
///
/// let quotes = fallback_quotes(&PostalCode::parse("90010-000").unwrap());
/// assert_eq!(quotes.len(), 3);
/// ```
pub fn fallback_quotes(postal_code: &PostalCode) -> Vec<ShippingQuote> {
    let region = region_for(postal_code);
    let base = region.base_price();

    let mut quotes: Vec<ShippingQuote> = VARIANTS
        .iter()
        .map(|variant| ShippingQuote {
            id: variant.id.to_string(),
            carrier: variant.carrier.to_string(),
            service: variant.service.to_string(),
            price: base.percentage(variant.multiplier),
            delivery_days: region.base_days() + variant.extra_days,
        })
        .collect();

    if is_same_day_metro(postal_code) {
        quotes.push(ShippingQuote {
            id: "moto".to_string(),
            carrier: "RS Express".to_string(),
            service: "Moto (mesmo dia)".to_string(),
            price: MOTO_PRICE,
            delivery_days: 0,
        });
    }

    quotes
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cep(s: &str) -> PostalCode {
        PostalCode::parse(s).unwrap()
    }

    #[test]
    fn test_region_for_each_digit() {
        let expected = [
            ShippingRegion::Metro,
            ShippingRegion::Southeast,
            ShippingRegion::Southeast,
            ShippingRegion::Southeast,
            ShippingRegion::NorthNortheast,
            ShippingRegion::NorthNortheast,
            ShippingRegion::NorthNortheast,
            ShippingRegion::CenterWest,
            ShippingRegion::South,
            ShippingRegion::South,
        ];
        for (digit, region) in expected.iter().enumerate() {
            let code = format!("{digit}0000000");
            assert_eq!(region_for(&cep(&code)), *region, "digit {digit}");
        }
    }

    #[test]
    fn test_same_leading_digit_same_tier() {
        let a = fallback_quotes(&cep("20040-020"));
        let b = fallback_quotes(&cep("29999-999"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_variant_prices_and_days() {
        let quotes = fallback_quotes(&cep("70040-010"));
        assert_eq!(quotes.len(), 3);

        assert_eq!(quotes[0].price, Money::from_cents(3_290));
        assert_eq!(quotes[0].delivery_days, 8);

        // 3290 × 1.8 = 5922
        assert_eq!(quotes[1].price, Money::from_cents(5_922));
        assert_eq!(quotes[1].delivery_days, 4);

        // 3290 × 1.3 = 4277
        assert_eq!(quotes[2].price, Money::from_cents(4_277));
        assert_eq!(quotes[2].delivery_days, 6);
    }

    #[test]
    fn test_moto_only_in_metro_range() {
        assert!(is_same_day_metro(&cep("01000-000")));
        assert!(is_same_day_metro(&cep("05999-999")));
        assert!(!is_same_day_metro(&cep("00999-999")));
        assert!(!is_same_day_metro(&cep("06000-000")));

        // Digit 0 but outside the courier range: metro tier, no moto.
        let osasco = fallback_quotes(&cep("06010-000"));
        assert_eq!(region_for(&cep("06010-000")), ShippingRegion::Metro);
        assert!(osasco.iter().all(|q| q.id != "moto"));

        let paulista = fallback_quotes(&cep("01310-100"));
        let moto = paulista.last().unwrap();
        assert_eq!(moto.id, "moto");
        assert_eq!(moto.delivery_days, 0);
        assert_eq!(moto.price, MOTO_PRICE);
    }
}
