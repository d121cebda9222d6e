//! Core types and utilities for spendwatch.
//!
//! This crate provides the domain types shared by the store and the HTTP service:
//!
//! - **Identifiers**: `UserId`
//! - **Money**: `Amount` (non-negative exact decimal)
//! - **Records**: `UserInfo`, `SpendingEvent`, `HighSpenderRecord`
//! - **Aggregation**: `AgeBand`, `AGE_BANDS`, `AgeBandReport`
//!
//! # Amounts
//!
//! Amounts are exact decimals kept at the precision the caller supplied.
//! They are persisted as decimal text and summed with `rust_decimal`, so sums
//! never pick up floating point error.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bands;
pub mod error;
pub mod ids;
pub mod money;
pub mod spending;

pub use bands::{AgeBand, AgeBandReport, BandAverage, AGE_BANDS};
pub use error::{Result, ValidationError};
pub use ids::UserId;
pub use money::Amount;
pub use spending::{
    HighSpenderOutcome, HighSpenderRecord, SpendingEvent, UserInfo, UserTotal,
    HIGH_SPENDER_THRESHOLD,
};
