//! Spendwatch HTTP API Service.
//!
//! This crate exposes the spending store over HTTP:
//!
//! - Total spending per user
//! - Average spending per age band
//! - High-spender ledger writes
//!
//! Handlers are thin: they parse path input into core types, call one
//! `SpendingStore` operation and map the result onto a status code.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
