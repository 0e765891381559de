//! # Quantity Module
//!
//! Numeric parsing at the report boundary.
//!
//! ## Why Parse Explicitly?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Report cells arrive as text:  "24", " 0.5 ", "", "n/a"                 │
//! │                                                                         │
//! │  Deferring to arithmetic would let "" or "n/a" travel until the first  │
//! │  multiplication. Instead every number is parsed and validated once,    │
//! │  where it enters the system, and rejected with its field name.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use wms_core::quantity::{parse_factor, ToQuantity};
//!
//! assert_eq!(parse_factor("24").unwrap(), 24.0);
//! assert!(parse_factor("0").is_err());
//!
//! assert_eq!(3_i32.to_quantity().unwrap(), 3.0);
//! assert_eq!("2.5".to_quantity().unwrap(), 2.5);
//! assert!("abc".to_quantity().is_err());
//! ```

use crate::error::{CoreError, CoreResult};

fn invalid(field: &str, value: impl Into<String>, reason: &str) -> CoreError {
    CoreError::InvalidNumber {
        field: field.to_string(),
        value: value.into(),
        reason: reason.to_string(),
    }
}

/// Parses a conversion factor.
///
/// ## Rules
/// - Surrounding whitespace is ignored
/// - Must be a finite number
/// - Must be greater than zero
pub fn parse_factor(raw: &str) -> CoreResult<f64> {
    let trimmed = raw.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| invalid("factor", raw, "not a number"))?;

    if !value.is_finite() {
        return Err(invalid("factor", raw, "must be finite"));
    }
    if value <= 0.0 {
        return Err(invalid("factor", raw, "must be greater than zero"));
    }

    Ok(value)
}

/// Parses a quantity. Zero and negative values are allowed.
pub fn parse_quantity(raw: &str) -> CoreResult<f64> {
    let trimmed = raw.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| invalid("quantity", raw, "not a number"))?;
    check_finite(value)
}

fn check_finite(value: f64) -> CoreResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid("quantity", value.to_string(), "must be finite"))
    }
}

// =============================================================================
// ToQuantity
// =============================================================================

/// Anything a caller may hand the converter as a quantity.
///
/// Integers widen to `f64` and must fit its 53-bit mantissa, floats are checked for finiteness and text is
/// parsed with [`parse_quantity`].
pub trait ToQuantity {
    fn to_quantity(&self) -> CoreResult<f64>;
}

impl ToQuantity for f64 {
    fn to_quantity(&self) -> CoreResult<f64> {
        check_finite(*self)
    }
}

impl ToQuantity for f32 {
    fn to_quantity(&self) -> CoreResult<f64> {
        check_finite(f64::from(*self))
    }
}

macro_rules! int_quantity {
    ($($ty:ty),*) => {
        $(
            impl ToQuantity for $ty {
                fn to_quantity(&self) -> CoreResult<f64> {
                    Ok(f64::from(*self))
                }
            }
        )*
    };
}

int_quantity!(i32, u32);

/// Largest integer magnitude an `f64` holds exactly.
const MAX_EXACT_INT: u64 = 1 << 53;

fn exact_int(magnitude: u64, value: f64, raw: impl ToString) -> CoreResult<f64> {
    if magnitude > MAX_EXACT_INT {
        return Err(invalid("quantity", raw.to_string(), "too large to convert exactly"));
    }
    Ok(value)
}

impl ToQuantity for i64 {
    fn to_quantity(&self) -> CoreResult<f64> {
        exact_int(self.unsigned_abs(), *self as f64, self)
    }
}

impl ToQuantity for u64 {
    fn to_quantity(&self) -> CoreResult<f64> {
        exact_int(*self, *self as f64, self)
    }
}

impl ToQuantity for usize {
    fn to_quantity(&self) -> CoreResult<f64> {
        let magnitude = u64::try_from(*self).unwrap_or(u64::MAX);
        exact_int(magnitude, *self as f64, self)
    }
}

impl ToQuantity for str {
    fn to_quantity(&self) -> CoreResult<f64> {
        parse_quantity(self)
    }
}

impl ToQuantity for &str {
    fn to_quantity(&self) -> CoreResult<f64> {
        parse_quantity(self)
    }
}

impl ToQuantity for String {
    fn to_quantity(&self) -> CoreResult<f64> {
        parse_quantity(self)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
