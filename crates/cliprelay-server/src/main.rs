use std::sync::Arc;

use tracing::info;

use cliprelay_api::AppStateInner;
use cliprelay_db::Database;
use cliprelay_gateway::{ConnectionRegistry, Relay};
use cliprelay_server::{ServerConfig, app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cliprelay=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let db = Database::open(&config.db_path)?;
    let relay = Relay::new(ConnectionRegistry::new());
    let state = Arc::new(AppStateInner { db, relay });

    let addr = config.bind_addr()?;
    info!("Clipboard relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state, &config)).await?;

    Ok(())
}
