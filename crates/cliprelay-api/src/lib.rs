pub mod clipboard;
pub mod error;
pub mod health;
pub mod state;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// REST routes. The WebSocket gateway is mounted separately by the server.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/google", post(users::create_user))
        .route("/api/users/{user_id}", get(users::get_user))
        .route("/api/sync/{user_id}", post(users::sync))
        .route("/api/clipboard", post(clipboard::submit_entry))
        .route("/api/clipboard/{user_id}", get(clipboard::list_entries))
        .route("/health", get(health::health))
        .with_state(state)
}
