//! API handlers.

pub mod health;
pub mod high_spenders;
pub mod spending;
