use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user as supplied by the identity provider, plus sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// One durable clipboard snippet. `id` and `timestamp` are server-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub user_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
