//! Identifier types for spendwatch.
//!
//! User identifiers are the integer primary keys of the `user_info` table.
//! Only non-negative values are accepted, matching what the HTTP path accepts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// A user identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct UserId(i64);

impl UserId {
    /// Create a user ID from a raw integer.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidUserId` if the value is negative.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value < 0 {
            return Err(ValidationError::InvalidUserId(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Return the underlying integer.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl FromStr for UserId {
    type Err = ValidationError;

    /// Parse plain decimal digits. Signs, whitespace and other characters are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidUserId(s.to_string()));
        }
        let value = s
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidUserId(s.to_string()))?;
        Ok(Self(value))
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for UserId {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}
