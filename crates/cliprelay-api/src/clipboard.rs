use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

use cliprelay_types::api::SubmitEntryRequest;
use cliprelay_types::models::HistoryEntry;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// Submission endpoint used by the client poller.
pub async fn submit_entry(
    State(state): State<AppState>,
    payload: Result<Json<SubmitEntryRequest>, JsonRejection>,
) -> Result<Json<HistoryEntry>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::invalid_body("Invalid clipboard data", e))?;
    if req.user_id.is_empty() {
        return Err(ApiError::Validation("Invalid clipboard data".into()));
    }

    let entry = run_db(&state, move |db| db.append_entry(&req.user_id, &req.content)).await?;
    Ok(Json(entry))
}

pub async fn list_entries(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let entries = run_db(&state, move |db| db.list_entries(&user_id)).await?;
    Ok(Json(entries))
}
