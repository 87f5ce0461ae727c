//! # Filter Errors
//!
//! Error taxonomy for filter parsing and compilation. Every variant is a
//! caller error surfaced immediately from `subscribe`; none is retried.

use thiserror::Error;

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Filter parsing and compilation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// Filter is empty
    #[error("Empty filter")]
    Empty,

    /// Unknown operator key
    #[error("Unknown filter operator: {0}")]
    UnknownOperator(String),

    /// A required attribute is missing from an operator
    #[error("Operator {operator} requires attribute {attribute}")]
    MissingAttribute {
        /// Operator name
        operator: &'static str,
        /// Missing attribute name
        attribute: &'static str,
    },

    /// Operator value must be an array
    #[error("Operator {0} expects an array of values")]
    NotAnArray(&'static str),

    /// Operand shape does not match what the operator expects
    #[error("Malformed {operator} operand: {reason}")]
    Malformed {
        /// Operator name
        operator: &'static str,
        /// What was wrong
        reason: String,
    },

    /// Malformed range bounds
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Malformed geo coordinate
    #[error("Invalid geo coordinate: {0}")]
    InvalidGeoCoordinate(String),

    /// Malformed distance literal
    #[error("Invalid distance: {0}")]
    InvalidDistance(String),

    /// Filter nesting exceeds the configured depth
    #[error("Filter nesting exceeds maximum depth of {0}")]
    TooDeep(usize),

    /// Filter holds more leaf conditions than allowed
    #[error("Filter exceeds maximum of {0} conditions")]
    TooManyConditions(usize),
}
