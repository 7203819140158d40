use axum::{Json, extract::State};

use cliprelay_types::api::HealthResponse;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        connections: state.relay.registry().len().await,
    })
}
