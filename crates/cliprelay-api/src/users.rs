use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use tracing::info;

use cliprelay_types::api::{CreateUserRequest, SyncResponse};
use cliprelay_types::models::User;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// Record the identity triple handed over by the identity provider.
/// Re-submitting an existing id refreshes email and name.
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::invalid_body("Invalid user data", e))?;
    if req.id.is_empty() {
        return Err(ApiError::Validation("Invalid user data".into()));
    }

    let user = run_db(&state, move |db| db.create_user(&req.id, &req.email, &req.name)).await?;
    info!("User {} signed in", user.id);
    Ok(Json(user))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let lookup = user_id.clone();
    run_db(&state, move |db| db.get_user(&lookup))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("User not found: {}", user_id)))
}

/// Explicit sync marker. Unknown users are not an error.
pub async fn sync(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<SyncResponse>, ApiError> {
    let now = chrono::Utc::now();
    run_db(&state, move |db| db.update_last_synced(&user_id, now)).await?;
    Ok(Json(SyncResponse { success: true }))
}
