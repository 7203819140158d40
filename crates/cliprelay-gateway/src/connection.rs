use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use cliprelay_types::events::ServerEvent;

use crate::relay::Relay;
use crate::session::Session;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Drive one WebSocket from upgrade to close.
///
/// A writer task drains the connection's bounded outbound queue (fed by the
/// relay) and runs the heartbeat; this task reads frames into the session.
/// Whichever side finishes first ends the connection, and the session is
/// always unregistered on the way out.
pub async fn handle_connection(socket: WebSocket, relay: Relay, outbound_buffer: usize) {
    let (sender, mut receiver) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(outbound_buffer);

    let mut session = Session::new(relay, outbound_tx);
    let conn_id = session.conn_id();
    info!("Connection {} opened", conn_id);

    let pong_received = Arc::new(AtomicBool::new(true));
    let mut send_task = tokio::spawn(run_writer(sender, outbound_rx, pong_received.clone()));

    tokio::select! {
        _ = &mut send_task => {}
        _ = run_reader(&mut receiver, &mut session, &pong_received) => send_task.abort(),
    }

    session.close().await;
    info!("Connection {} closed", conn_id);
}

async fn run_writer(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<ServerEvent>,
    pong_received: Arc<AtomicBool>,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut missed_heartbeats: u8 = 0;

    loop {
        tokio::select! {
            event = outbound_rx.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode outbound event: {}", e);
                        continue;
                    }
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if pong_received.swap(false, Ordering::Acquire) {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                        break;
                    }
                }
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn run_reader(
    receiver: &mut SplitStream<WebSocket>,
    session: &mut Session,
    pong_received: &AtomicBool,
) {
    let conn_id = session.conn_id();

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Connection {} read error: {}", conn_id, e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                if let Err(e) = session.handle_text(text.as_str()).await {
                    warn!("Connection {}: {}", conn_id, e);
                }
            }
            Message::Binary(data) => {
                warn!("Connection {}: ignoring {}-byte binary frame", conn_id, data.len());
            }
            Message::Pong(_) => {
                pong_received.store(true, Ordering::Release);
            }
            Message::Close(_) => break,
            Message::Ping(_) => {}
        }
    }
}
