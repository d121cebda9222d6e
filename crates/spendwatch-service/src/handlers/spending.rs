//! Spending aggregation handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use spendwatch_core::{AgeBandReport, UserId, UserTotal};
use spendwatch_store::SpendingStore;

use crate::error::ApiError;
use crate::state::AppState;

/// Message returned when a user has no spending rows.
pub const NO_SPENDING: &str = "User has spent 0.00";

/// Get the total spending for a user.
pub async fn total_spent(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserTotal>, ApiError> {
    let user_id: UserId = user_id.parse()?;

    let total = state
        .store
        .total_spent(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(NO_SPENDING.into()))?;

    tracing::debug!(
        user_id = %user_id,
        total_spending = %total.total_spending,
        "Total spending computed"
    );

    Ok(Json(total))
}

/// Get the average spending per age band.
pub async fn average_spending_by_age(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AgeBandReport>, ApiError> {
    let report = state.store.average_spending_by_age_band().await?;
    Ok(Json(report))
}
