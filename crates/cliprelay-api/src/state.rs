use std::sync::Arc;

use tracing::error;

use cliprelay_db::Database;
use cliprelay_gateway::Relay;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub relay: Relay,
}

/// Run a blocking DB call off the async runtime. The relay never waits on this.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Persistence(anyhow::anyhow!("storage task failed"))
        })?
        .map_err(ApiError::Persistence)
}
