//! Database row types. These map directly to SQLite rows and stay distinct
//! from the wire models in cliprelay-types.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use cliprelay_types::models::{HistoryEntry, User};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub last_synced_at: Option<String>,
}

pub struct EntryRow {
    pub id: i64,
    pub user_id: String,
    pub content: String,
    pub timestamp: String,
}

/// Fixed-width RFC 3339 so lexical order in SQLite equals chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let ts = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Corrupt timestamp '{}'", raw))?;
    Ok(ts.with_timezone(&Utc))
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        let last_synced_at = row
            .last_synced_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            last_synced_at,
        })
    }
}

impl TryFrom<EntryRow> for HistoryEntry {
    type Error = anyhow::Error;

    fn try_from(row: EntryRow) -> Result<Self> {
        let timestamp = parse_timestamp(&row.timestamp)
            .with_context(|| format!("on clipboard entry {}", row.id))?;

        Ok(HistoryEntry {
            id: row.id,
            user_id: row.user_id,
            content: row.content,
            timestamp,
        })
    }
}
