//! High-spender ledger handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use spendwatch_core::{Amount, HighSpenderOutcome, HighSpenderRecord, UserId};
use spendwatch_store::SpendingStore;

use crate::error::{ApiError, MessageResponse};
use crate::state::AppState;

/// Message returned when the ledger entry was written.
pub const INSERTED: &str = "User data successfully inserted";

/// Message returned when the total does not exceed the threshold.
pub const BELOW_THRESHOLD: &str = "User spending does not meet threshold";

/// Message returned when the user is already in the ledger.
pub const ALREADY_EXISTS: &str = "User already exists in high spenders";

/// Record a user as a high spender if their total exceeds the threshold.
///
/// Both path segments are validated before the store is touched.
pub async fn write_high_spender(
    State(state): State<Arc<AppState>>,
    Path((user_id, total_spending)): Path<(String, String)>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let user_id: UserId = user_id.parse()?;
    let total_spending: Amount = total_spending.parse()?;

    let record = HighSpenderRecord::new(user_id, total_spending);

    match state.store.record_high_spender_if_eligible(&record).await? {
        HighSpenderOutcome::Inserted => Ok((
            StatusCode::CREATED,
            Json(MessageResponse::new(INSERTED)),
        )),
        HighSpenderOutcome::BelowThreshold => Err(ApiError::BadRequest(BELOW_THRESHOLD.into())),
        HighSpenderOutcome::AlreadyExists => Err(ApiError::Conflict(ALREADY_EXISTS.into())),
    }
}
