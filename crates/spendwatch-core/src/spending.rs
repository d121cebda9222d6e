//! Spending records.
//!
//! This module defines the three persisted entities (users, spending events,
//! the high-spender ledger) and the outcome of a high-spender write.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::{Amount, UserId};

/// Total spending a user must strictly exceed to be recorded as a high spender.
pub const HIGH_SPENDER_THRESHOLD: Decimal = Decimal::ONE_THOUSAND;

/// Identity data for a user.
///
/// Users are created outside the aggregation paths; those only read them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// The user ID.
    pub user_id: UserId,

    /// Display name.
    pub name: String,

    /// Contact email.
    pub email: String,

    /// Age in years, used for band aggregation.
    pub age: i64,
}

impl UserInfo {
    /// Create a user record.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidAge` if `age` is negative.
    pub fn new(
        user_id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
        age: i64,
    ) -> Result<Self, ValidationError> {
        if age < 0 {
            return Err(ValidationError::InvalidAge(age));
        }
        Ok(Self {
            user_id,
            name: name.into(),
            email: email.into(),
            age,
        })
    }
}

/// A single spending entry. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingEvent {
    /// The user who spent the money.
    pub user_id: UserId,

    /// How much was spent.
    pub amount: Amount,

    /// Calendar year of the spending.
    pub year: i32,
}

impl SpendingEvent {
    /// Create a spending event.
    #[must_use]
    pub const fn new(user_id: UserId, amount: Amount, year: i32) -> Self {
        Self {
            user_id,
            amount,
            year,
        }
    }
}

/// Sum of all spending recorded for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserTotal {
    /// The user ID.
    pub user_id: UserId,

    /// Sum of every spending event for the user.
    pub total_spending: Amount,
}

/// An entry in the high-spender ledger.
///
/// At most one entry exists per user; the first write wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighSpenderRecord {
    /// The user ID (ledger primary key).
    pub user_id: UserId,

    /// Total spending reported when the entry was written.
    pub total_spending: Amount,
}

impl HighSpenderRecord {
    /// Create a ledger entry candidate.
    #[must_use]
    pub const fn new(user_id: UserId, total_spending: Amount) -> Self {
        Self {
            user_id,
            total_spending,
        }
    }

    /// Whether the total strictly exceeds [`HIGH_SPENDER_THRESHOLD`].
    #[must_use]
    pub fn qualifies(&self) -> bool {
        self.total_spending.as_decimal() > HIGH_SPENDER_THRESHOLD
    }
}

/// Result of a conditional high-spender write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighSpenderOutcome {
    /// The entry was written.
    Inserted,

    /// The total did not exceed the threshold; nothing was written.
    BelowThreshold,

    /// An entry for the user already exists; it was left untouched.
    AlreadyExists,
}
