use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use cliprelay_api::AppState;
use cliprelay_gateway::{Relay, connection};

use crate::config::ServerConfig;

#[derive(Clone)]
struct GatewayState {
    relay: Relay,
    outbound_buffer: usize,
    max_message_bytes: usize,
}

/// Full HTTP surface: REST routes plus the `/ws` real-time channel.
pub fn app(state: AppState, config: &ServerConfig) -> Router {
    let ws_route = Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(GatewayState {
            relay: state.relay.clone(),
            outbound_buffer: config.outbound_buffer,
            max_message_bytes: config.max_message_bytes,
        });

    cliprelay_api::router(state)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn ws_upgrade(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.max_message_size(state.max_message_bytes)
        .on_upgrade(move |socket| {
            connection::handle_connection(socket, state.relay, state.outbound_buffer)
        })
}
