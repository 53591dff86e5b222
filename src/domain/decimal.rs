//! Lossless money type backed by rust_decimal.
//!
//! Order amounts are persisted as integer minor units (cents); conversion
//! helpers here keep threshold comparisons exact.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minor units per major currency unit.
const MINOR_UNITS: i64 = 100;

/// Lossless decimal amount.
///
/// Serializes to a JSON number so condition payloads read `"min_order_amount": 200`.
/// The number is an `f64`, so values beyond ~15 significant digits do not
/// survive a serialize/parse round trip; parsing itself is lossless.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    /// Create a Decimal from a RustDecimal.
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Parse plain or exponent notation (`1e21`, `2.5E-1`).
    ///
    /// # Errors
    /// Returns an error if the string is neither form or does not fit.
    pub fn from_str_lenient(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s)
            .or_else(|_| RustDecimal::from_scientific(s))
            .map(Decimal)
    }

    /// Build from a whole number of major units.
    pub fn from_i64(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }

    /// Build from an integer count of minor units (cents).
    pub fn from_minor_units(cents: i64) -> Self {
        Decimal(RustDecimal::new(cents, 2))
    }

    /// Convert to minor units, rounding toward positive infinity.
    ///
    /// For integer-cent amounts `a`, `a >= self` holds exactly when
    /// `a_cents >= self.to_minor_units_ceil()`. Returns `None` on overflow.
    pub fn to_minor_units_ceil(&self) -> Option<i64> {
        self.0
            .checked_mul(RustDecimal::from(MINOR_UNITS))
            .and_then(|cents| cents.ceil().to_i64())
    }

    /// Convert to minor units, rounding half to even. Returns `None` on overflow.
    pub fn to_minor_units(&self) -> Option<i64> {
        self.0
            .checked_mul(RustDecimal::from(MINOR_UNITS))
            .and_then(|cents| cents.round().to_i64())
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    /// Get the underlying RustDecimal.
    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.0.is_zero() && self.0.is_sign_negative()
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}
