use serde::{Deserialize, Serialize};

/// Commands sent FROM client TO server over the real-time channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientCommand {
    /// Bind this connection to a user. `deviceId` is generated server-side when absent.
    #[serde(rename_all = "camelCase")]
    Register {
        user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        device_id: Option<String>,
    },

    /// Live clipboard sample to fan out to the user's other devices
    Preview { content: String },
}

/// Events sent FROM server TO client over the real-time channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// Clipboard preview relayed from a sibling device of the same user
    #[serde(rename_all = "camelCase")]
    Preview {
        content: String,
        source_device: String,
    },
}
