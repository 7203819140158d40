use tokio::sync::mpsc::error::TrySendError;
use tracing::{trace, warn};

use cliprelay_types::events::ServerEvent;

use crate::error::GatewayError;
use crate::registry::{ConnId, ConnectionRegistry};

/// Outcome of one fan-out, mainly for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans preview events out to the other devices of the same user.
#[derive(Clone, Default)]
pub struct Relay {
    registry: ConnectionRegistry,
}

impl Relay {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Push a preview to every sibling of `(user_id, device_id)`.
    ///
    /// Sends never wait: a sibling whose outbound queue is full or closed is
    /// logged and skipped, and the rest of the batch still goes out. The
    /// registry lock is released before any send.
    pub async fn publish(
        &self,
        source: ConnId,
        user_id: &str,
        device_id: &str,
        content: &str,
    ) -> PublishReport {
        let siblings = self.registry.lookup_siblings(user_id, device_id).await;

        let event = ServerEvent::Preview {
            content: content.to_string(),
            source_device: device_id.to_string(),
        };

        let mut report = PublishReport::default();
        for sibling in siblings.into_iter().filter(|s| s.conn_id != source) {
            match sibling.tx.try_send(event.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    let reason = match e {
                        TrySendError::Full(_) => "outbound queue full",
                        TrySendError::Closed(_) => "connection closed",
                    };
                    let err = GatewayError::Delivery {
                        conn_id: sibling.conn_id,
                        device_id: sibling.device_id,
                        reason,
                    };
                    warn!("{}", err);
                    report.failed += 1;
                }
            }
        }

        trace!(
            "{}/{} preview ({} bytes) -> {} delivered, {} failed",
            user_id,
            device_id,
            content.len(),
            report.delivered,
            report.failed
        );

        report
    }
}
