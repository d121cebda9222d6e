//! Error types for spendwatch.

/// Result type for input validation.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Errors raised while turning raw input into domain values.
///
/// These are always detected before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The user identifier is not a non-negative integer.
    #[error("invalid user id: {0}")]
    InvalidUserId(String),

    /// The amount could not be parsed as a decimal.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The amount is below zero.
    #[error("amount must not be negative: {0}")]
    NegativeAmount(String),

    /// The age is below zero.
    #[error("invalid age: {0}")]
    InvalidAge(i64),
}
