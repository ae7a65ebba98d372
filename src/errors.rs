//! Error types for the validation pipeline.
//!
//! Two classes of failure exist:
//! - Configuration errors (bad bounds, mismatched defaults, invalid
//!   output-format combinations) are raised eagerly, before any row is
//!   processed, and are always fatal.
//! - Per-row errors (null violations, cast failures, shape errors, ...)
//!   are intercepted by the row processor and skipped or propagated
//!   according to the stop-on-error budget.

use std::fmt;

use thiserror::Error;

/// Result type for all validation operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Severity classification for parse errors.
///
/// `Row` errors are subject to the stop-on-error budget; `Fatal` errors
/// abort the pass unconditionally and must never be swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Per-row failure, governed by the error budget
    Row,
    /// Configuration or internal failure, aborts unconditionally
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Row => write!(f, "ROW"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Errors produced while configuring validators or validating rows
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    // ==================
    // Configuration / internal errors (fatal)
    // ==================
    /// Invalid internal state or contract violation
    #[error("unexpected system error: {0}")]
    System(String),

    /// A column's validator failed to compile
    #[error("failed to build schema for column '{column}': {source}")]
    SchemaBuild {
        /// Name of the offending column
        column: String,
        /// Underlying compile failure
        #[source]
        source: Box<ParseError>,
    },

    /// A bound, default, or allowed value does not match the column type
    #[error("{found} value cannot be used as {role} of a {expected} column")]
    UnsupportedType {
        /// What the value was meant to be (default, bound, allowed value)
        role: &'static str,
        /// The column's declared type
        expected: &'static str,
        /// The offending value's type or description
        found: String,
    },

    // ==================
    // Per-value errors (budget-governed)
    // ==================
    /// Null or empty value in a non-nullable field
    #[error("null value in non-nullable field")]
    NullViolation,

    /// Value is missing from the configured allow-list
    #[error("value '{value}' is not part of the allowed value set")]
    NotInSet {
        /// The rejected value
        value: String,
    },

    /// Value compares above the configured maximum
    #[error("value '{value}' is higher than the maximum allowed value '{max}'")]
    AboveMaximum {
        /// The rejected value
        value: String,
        /// The configured bound
        max: String,
    },

    /// Value compares below the configured minimum
    #[error("value '{value}' is lower than the minimum allowed value '{min}'")]
    BelowMinimum {
        /// The rejected value
        value: String,
        /// The configured bound
        min: String,
    },

    /// Value does not match the configured pattern
    #[error("value '{value}' does not match the expected pattern '{pattern}'")]
    PatternMismatch {
        /// The rejected value
        value: String,
        /// The configured pattern
        pattern: String,
    },

    /// Value could not be cast to the column's declared type
    #[error("value '{value}' could not be cast to {target}")]
    TypeCast {
        /// The offending value
        value: String,
        /// The target type name
        target: &'static str,
    },

    /// Value matched none of the accepted datetime formats
    #[error("value '{value}' does not match any of the accepted datetime formats {formats:?}")]
    DatetimeFormat {
        /// The offending value
        value: String,
        /// The accepted formats, in declared order
        formats: Vec<String>,
    },

    // ==================
    // Per-row errors (budget-governed)
    // ==================
    /// Row could not be decoded as a JSON object
    #[error("row {line} is not a valid JSON object: {reason}")]
    JsonDecode {
        /// 1-based row number
        line: u64,
        /// Decoder message
        reason: String,
    },

    /// Row carries more fields/keys than the schema declares
    #[error("row {line} has {found} fields but the schema declares {declared} columns")]
    RowShape {
        /// 1-based row number
        line: u64,
        /// Fields or keys found in the row
        found: usize,
        /// Columns declared by the schema
        declared: usize,
    },

    /// Failure raised by a user-supplied check, propagated unclassified
    #[error("{0}")]
    Custom(String),
}

impl ParseError {
    /// Returns the severity class for this error
    pub fn severity(&self) -> Severity {
        match self {
            ParseError::System(_)
            | ParseError::SchemaBuild { .. }
            | ParseError::UnsupportedType { .. } => Severity::Fatal,
            _ => Severity::Row,
        }
    }

    /// Returns whether this error bypasses the stop-on-error budget
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}
