use thiserror::Error;

use crate::registry::ConnId;

/// Failures inside the real-time gateway. None of these close a connection;
/// the session loop logs them and keeps reading.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Unparseable, unknown, or out-of-state message
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("connection {conn_id} is already registered as {user_id}/{device_id}")]
    RegistrationConflict {
        conn_id: ConnId,
        user_id: String,
        device_id: String,
    },

    /// One sibling could not take the event; other siblings are unaffected
    #[error("delivery to device {device_id} ({conn_id}) failed: {reason}")]
    Delivery {
        conn_id: ConnId,
        device_id: String,
        reason: &'static str,
    },
}
