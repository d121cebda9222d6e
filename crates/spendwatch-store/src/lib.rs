//! SQLite storage layer for spendwatch.
//!
//! This crate persists users, spending events and the high-spender ledger, and
//! implements the aggregation queries on top of them.
//!
//! # Architecture
//!
//! The storage uses three tables:
//!
//! - `user_info`: user identity records, keyed by `user_id`
//! - `user_spending`: append-only spending events (amounts as decimal text)
//! - `high_spenders`: at most one ledger row per `user_id`
//!
//! Every operation checks a connection out of the pool for its own duration.
//! The connection goes back to the pool when the operation returns, whatever
//! the outcome.
//!
//! # Example
//!
//! ```no_run
//! use spendwatch_core::{HighSpenderRecord, UserId};
//! use spendwatch_store::{SpendingStore, SqliteStore};
//!
//! # async fn run() -> spendwatch_store::Result<()> {
//! let store = SqliteStore::open("/tmp/spendwatch.db", 5).await?;
//!
//! let user_id = UserId::new(7).unwrap();
//! let total = store.total_spent(user_id).await?;
//!
//! let record = HighSpenderRecord::new(user_id, "1500.00".parse().unwrap());
//! let outcome = store.record_high_spender_if_eligible(&record).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod schema;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use spendwatch_core::{
    AgeBandReport, HighSpenderOutcome, HighSpenderRecord, SpendingEvent, UserId, UserInfo,
    UserTotal,
};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer so handlers and tests do not depend
/// on a particular database.
#[async_trait]
pub trait SpendingStore: Send + Sync {
    // =========================================================================
    // Aggregations
    // =========================================================================

    /// Sum every spending event for a user.
    ///
    /// Returns `None` when the user has no spending rows at all. Never mutates.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn total_spent(&self, user_id: UserId) -> Result<Option<UserTotal>>;

    /// Average spending per event for each band in [`spendwatch_core::AGE_BANDS`].
    ///
    /// The report always has one entry per band; empty bands average to zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn average_spending_by_age_band(&self) -> Result<AgeBandReport>;

    // =========================================================================
    // High-Spender Ledger
    // =========================================================================

    /// Write a ledger entry if the total exceeds the threshold.
    ///
    /// Below-threshold totals are rejected without touching the database.
    /// An existing entry for the user is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn record_high_spender_if_eligible(
        &self,
        record: &HighSpenderRecord,
    ) -> Result<HighSpenderOutcome>;

    /// Get the ledger entry for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_high_spender(&self, user_id: UserId) -> Result<Option<HighSpenderRecord>>;

    // =========================================================================
    // Data Loading
    // =========================================================================

    /// Insert a user record.
    ///
    /// # Errors
    ///
    /// - `StoreError::Conflict` if a user with the same ID exists.
    /// - Any other error if the database operation fails.
    async fn put_user(&self, user: &UserInfo) -> Result<()>;

    /// Append a spending event.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn record_spending(&self, event: &SpendingEvent) -> Result<()>;
}
