use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use cliprelay_types::events::{ClientCommand, ServerEvent};

use crate::error::GatewayError;
use crate::registry::ConnId;
use crate::relay::Relay;

/// Per-connection protocol state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Only `register` is accepted.
    Unregistered,
    /// Bound to a user; `preview` is relayed, `register` is refused.
    Registered { user_id: String, device_id: String },
    /// Terminal. The registry entry is gone.
    Closed,
}

/// Protocol handler for one connection, independent of the socket it rides on.
pub struct Session {
    conn_id: ConnId,
    relay: Relay,
    outbound: mpsc::Sender<ServerEvent>,
    state: SessionState,
}

impl Session {
    /// `outbound` is the queue the connection's writer drains; siblings push into it.
    pub fn new(relay: Relay, outbound: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            relay,
            outbound,
            state: SessionState::Unregistered,
        }
    }

    pub fn conn_id(&self) -> ConnId {
        self.conn_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Parse and dispatch one text frame. Errors are reported to the caller for
    /// logging only; the connection stays open.
    pub async fn handle_text(&mut self, text: &str) -> Result<(), GatewayError> {
        let cmd = serde_json::from_str::<ClientCommand>(text).map_err(|e| {
            GatewayError::Protocol(format!(
                "bad message ({} bytes): {:?} error at line {} column {}",
                text.len(),
                e.classify(),
                e.line(),
                e.column()
            ))
        })?;
        self.handle_command(cmd).await
    }

    pub async fn handle_command(&mut self, cmd: ClientCommand) -> Result<(), GatewayError> {
        match cmd {
            ClientCommand::Register { user_id, device_id } => self.register(user_id, device_id).await,
            ClientCommand::Preview { content } => self.preview(&content).await,
        }
    }

    async fn register(&mut self, user_id: String, device_id: Option<String>) -> Result<(), GatewayError> {
        match &self.state {
            SessionState::Unregistered => {}
            SessionState::Registered {
                user_id: bound_user,
                device_id: bound_device,
            } => {
                return Err(GatewayError::RegistrationConflict {
                    conn_id: self.conn_id,
                    user_id: bound_user.clone(),
                    device_id: bound_device.clone(),
                });
            }
            SessionState::Closed => {
                return Err(GatewayError::Protocol("register on closed session".into()));
            }
        }

        if user_id.is_empty() {
            return Err(GatewayError::Protocol("register with empty userId".into()));
        }

        let device_id = self
            .relay
            .registry()
            .register(self.conn_id, &user_id, device_id, self.outbound.clone())
            .await?;
        info!("Connection {} registered as {}/{}", self.conn_id, user_id, device_id);
        self.state = SessionState::Registered { user_id, device_id };
        Ok(())
    }

    async fn preview(&self, content: &str) -> Result<(), GatewayError> {
        let SessionState::Registered { user_id, device_id } = &self.state else {
            return Err(GatewayError::Protocol(match self.state {
                SessionState::Closed => "preview on closed session".into(),
                _ => "preview before register".into(),
            }));
        };

        let report = self
            .relay
            .publish(self.conn_id, user_id, device_id, content)
            .await;
        debug!(
            "Connection {} preview relayed to {} sibling(s)",
            self.conn_id, report.delivered
        );
        Ok(())
    }

    /// Remove this connection from the registry. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Some(reg) = self.relay.registry().unregister(self.conn_id).await {
            info!("Connection {} ({}/{}) unregistered", self.conn_id, reg.user_id, reg.device_id);
        }
        self.state = SessionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(relay: &Relay) -> (Session, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(8);
        (Session::new(relay.clone(), tx), rx)
    }

    async fn registered(relay: &Relay, user: &str, device: &str) -> (Session, mpsc::Receiver<ServerEvent>) {
        let (mut s, rx) = session(relay);
        let msg = format!(r#"{{"type":"register","userId":"{user}","deviceId":"{device}"}}"#);
        s.handle_text(&msg).await.unwrap();
        (s, rx)
    }

    #[tokio::test]
    async fn sibling_receives_preview_and_source_does_not() {
        let relay = Relay::default();
        let (mut a, mut a_rx) = registered(&relay, "u1", "d1").await;
        let (_b, mut b_rx) = registered(&relay, "u1", "d2").await;

        a.handle_text(r#"{"type":"preview","content":"hello"}"#).await.unwrap();

        assert_eq!(
            b_rx.try_recv().unwrap(),
            ServerEvent::Preview {
                content: "hello".into(),
                source_device: "d1".into(),
            }
        );
        assert!(a_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn register_without_device_id_gets_generated_one() {
        let relay = Relay::default();
        let (mut s, _rx) = session(&relay);
        s.handle_text(r#"{"type":"register","userId":"u1"}"#).await.unwrap();

        match s.state() {
            SessionState::Registered { user_id, device_id } => {
                assert_eq!(user_id, "u1");
                assert!(!device_id.is_empty());
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn unregistered_session_ignores_preview() {
        let relay = Relay::default();
        let (_b, mut b_rx) = registered(&relay, "u1", "d2").await;
        let (mut s, _rx) = session(&relay);

        let err = s
            .handle_text(r#"{"type":"preview","content":"early"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Protocol(_)));
        assert_eq!(s.state(), &SessionState::Unregistered);
        assert!(b_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_messages_are_dropped_without_state_change() {
        let relay = Relay::default();
        let (mut a, _a_rx) = registered(&relay, "u1", "d1").await;
        let (_b, mut b_rx) = registered(&relay, "u1", "d2").await;

        for raw in ["not json", r#"{"content":"x"}"#, r#"{"type":"preview"}"#, r#"{"type":"nope"}"#] {
            let err = a.handle_text(raw).await.unwrap_err();
            assert!(matches!(err, GatewayError::Protocol(_)), "{raw}");
        }

        assert!(matches!(a.state(), SessionState::Registered { .. }));
        assert!(b_rx.try_recv().is_err());

        // Still usable afterwards
        a.handle_text(r#"{"type":"preview","content":"ok"}"#).await.unwrap();
        assert!(b_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn empty_user_id_is_rejected() {
        let relay = Relay::default();
        let (mut s, _rx) = session(&relay);
        let err = s.handle_text(r#"{"type":"register","userId":""}"#).await.unwrap_err();
        assert!(matches!(err, GatewayError::Protocol(_)));
        assert!(relay.registry().is_empty().await);
    }

    #[tokio::test]
    async fn second_register_is_refused() {
        let relay = Relay::default();
        let (mut s, _rx) = registered(&relay, "u1", "d1").await;

        let err = s
            .handle_text(r#"{"type":"register","userId":"u2","deviceId":"d9"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::RegistrationConflict { .. }));
        assert_eq!(
            s.state(),
            &SessionState::Registered {
                user_id: "u1".into(),
                device_id: "d1".into(),
            }
        );
        assert_eq!(relay.registry().len().await, 1);
    }

    #[tokio::test]
    async fn close_unregisters_once() {
        let relay = Relay::default();
        let (mut a, _a_rx) = registered(&relay, "u1", "d1").await;
        let (mut b, _b_rx) = registered(&relay, "u1", "d2").await;

        b.close().await;
        b.close().await;
        assert_eq!(b.state(), &SessionState::Closed);
        assert_eq!(relay.registry().len().await, 1);
        assert!(b.handle_text(r#"{"type":"preview","content":"x"}"#).await.is_err());

        a.close().await;
        assert!(relay.registry().is_empty().await);
    }

    #[tokio::test]
    async fn close_before_register_is_a_no_op() {
        let relay = Relay::default();
        let (mut s, _rx) = session(&relay);
        s.close().await;
        assert_eq!(s.state(), &SessionState::Closed);
    }

    #[tokio::test]
    async fn bad_frame_error_does_not_echo_content() {
        let relay = Relay::default();
        let (mut a, _a_rx) = registered(&relay, "u1", "d1").await;

        for raw in [
            r#"{"type":"preview","content":"hunter2""#,
            r#"{"type":"preview","content":["hunter2"]}"#,
            r#"{"type":"hunter2","content":"x"}"#,
        ] {
            let err = a.handle_text(raw).await.unwrap_err();
            let shown = err.to_string();
            assert!(!shown.contains("hunter2"), "{shown}");
            assert!(shown.contains(&format!("{} bytes", raw.len())), "{shown}");
        }
    }
}
