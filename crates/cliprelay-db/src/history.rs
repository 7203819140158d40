//! Append-only clipboard history, scoped per user.

use anyhow::Result;
use chrono::{SubsecRound, Utc};
use rusqlite::Connection;
use tracing::debug;

use cliprelay_types::models::HistoryEntry;

use crate::Database;
use crate::models::{EntryRow, format_timestamp};
use crate::queries::set_last_synced;

impl Database {
    /// Record a snippet and stamp the owner's `last_synced_at` in one transaction.
    pub fn append_entry(&self, user_id: &str, content: &str) -> Result<HistoryEntry> {
        let (id, now) = self.with_conn_mut(|conn| {
            // Taken under the writer lock so timestamp order follows id order.
            // Stored at microsecond precision; truncate so the returned entry matches a later read.
            let now = Utc::now().trunc_subsecs(6);

            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO clipboard_entries (user_id, content, timestamp) VALUES (?1, ?2, ?3)",
                (user_id, content, format_timestamp(now)),
            )?;
            let id = tx.last_insert_rowid();
            set_last_synced(&tx, user_id, now)?;
            tx.commit()?;
            Ok((id, now))
        })?;

        debug!("Appended clipboard entry {} for {} ({} bytes)", id, user_id, content.len());

        Ok(HistoryEntry {
            id,
            user_id: user_id.to_string(),
            content: content.to_string(),
            timestamp: now,
        })
    }

    /// Most recent first; ties on timestamp fall back to id.
    pub fn list_entries(&self, user_id: &str) -> Result<Vec<HistoryEntry>> {
        self.with_conn(|conn| query_entries(conn, user_id))?
            .into_iter()
            .map(HistoryEntry::try_from)
            .collect()
    }
}

fn query_entries(conn: &Connection, user_id: &str) -> Result<Vec<EntryRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, content, timestamp
         FROM clipboard_entries
         WHERE user_id = ?1
         ORDER BY timestamp DESC, id DESC",
    )?;

    let rows = stmt
        .query_map([user_id], |row| {
            Ok(EntryRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                content: row.get(2)?,
                timestamp: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
