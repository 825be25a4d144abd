//! # Error Types
//!
//! Domain-specific error types for syncbridge-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  syncbridge-core errors (this file)                                    │
//! │  ├── CoreError        - Value parsing and domain errors                │
//! │  └── ValidationError  - A record is unfit to be written                │
//! │                                                                         │
//! │  syncbridge-db errors (separate crate)                                 │
//! │  └── DbError          - Source store failures                          │
//! │                                                                         │
//! │  syncbridge-sync errors (separate crate)                               │
//! │  ├── GatewayError     - Target session failures                        │
//! │  ├── RecordError      - One record failed, batch continues             │
//! │  └── SyncError        - The run cannot start or continue               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The mapper itself never returns an error: a missing optional field is
//! replaced by a documented default and reported as a `MappingDefault`.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An amount string could not be read as a decimal money value.
    ///
    /// ## When This Occurs
    /// - Remote ledger amounts sent as text with stray characters
    /// - More than one decimal separator
    #[error("Invalid amount '{value}': {reason}")]
    InvalidAmount { value: String, reason: String },

    /// A tax rate is negative or not a finite number.
    #[error("Invalid tax rate: {0}")]
    InvalidTaxRate(String),

    /// A ledger entry kind that is neither customer nor supplier.
    #[error("Unknown payment kind: '{0}'")]
    UnknownPaymentKind(String),

    /// A date range whose start is after its end.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: String, end: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Record validation errors.
///
/// Raised before a remote record enters its write transaction, so a record
/// failing validation never touches the Source store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A field exceeds the Source column width.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Two line items share the same line number.
    #[error("Duplicate line number {line_no}")]
    DuplicateLineNo { line_no: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_wraps_into_core_error() {
        let err: CoreError = ValidationError::Required {
            field: "invoice_number".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Validation error: invoice_number is required");
    }
}
