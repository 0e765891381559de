//! # Error Types
//!
//! Domain-specific error types for wms-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  wms-core errors (this file)                                           │
//! │  └── CoreError        - Conversion, lookup and parsing failures        │
//! │                                                                         │
//! │  wms-report errors (separate crate)                                    │
//! │  └── ReportError      - Upstream fetch failures                        │
//! │                                                                         │
//! │  wms-db errors (separate crate)                                        │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: CoreError → ReportError / job error → anyhow (binary)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item code, unit, raw value)
//! 3. Every failure is a hard stop: the converter never substitutes a value

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised by the conversion engine and the row parsers feeding it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// The item code was never seen in either source report.
    #[error("Item {item} has no known conversions")]
    UnknownItem { item: String },

    /// The unit is not the base unit and no listed edge starts from it.
    ///
    /// ## When This Occurs
    /// ```text
    /// WIDGET1: base = eaches, edges = [cases -> eaches]
    ///
    /// convert("WIDGET1", "pallets", 2)
    ///      │
    ///      ▼
    /// no edge with from_unit == "pallets"
    ///      │
    ///      ▼
    /// NoConversionPath { item: "WIDGET1", unit: "pallets" }
    /// ```
    #[error("No conversion path from {unit} for item {item}")]
    NoConversionPath { item: String, unit: String },

    /// The item appears in the ratio report but never received a base unit.
    #[error("Item {item} has no base unit of measure")]
    MissingBaseUnit { item: String },

    /// The item was quarantined when the table was built.
    #[error("Item {item} was rejected when the conversion table was built: {reason}")]
    RejectedItem { item: String, reason: String },

    /// The converter followed more edges than the item has.
    #[error("Conversion for item {item} exceeded {hops} hops starting from {unit}")]
    ConversionCycle {
        item: String,
        unit: String,
        hops: usize,
    },

    /// A numeric cell or argument failed to parse or validate.
    #[error("{field} has invalid numeric value '{value}': {reason}")]
    InvalidNumber {
        field: String,
        value: String,
        reason: String,
    },

    /// A report row had fewer cells than required.
    #[error("{report} row has {actual} cells, expected at least {expected}")]
    MalformedRow {
        report: String,
        expected: usize,
        actual: usize,
    },
}

impl CoreError {
    /// Returns true when the table simply has no answer for the request
    /// (item never seen, or unit not reachable).
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            CoreError::UnknownItem { .. } | CoreError::NoConversionPath { .. }
        )
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
