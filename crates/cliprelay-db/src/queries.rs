use crate::Database;
use crate::models::{UserRow, format_timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use cliprelay_types::models::User;

impl Database {
    // -- Users --

    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))?
            .map(User::try_from)
            .transpose()
    }

    /// Insert or refresh an identity. An existing user keeps its `last_synced_at`.
    pub fn create_user(&self, id: &str, email: &str, name: &str) -> Result<User> {
        let row = self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET email = excluded.email, name = excluded.name",
                (id, email, name),
            )?;
            query_user(conn, id)?.ok_or_else(|| anyhow::anyhow!("User vanished after upsert: {}", id))
        })?;

        User::try_from(row)
    }

    /// Returns false when no such user exists.
    pub fn update_last_synced(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| set_last_synced(conn, id, at))
    }
}

pub(crate) fn set_last_synced(conn: &Connection, id: &str, at: DateTime<Utc>) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE users SET last_synced_at = ?1 WHERE id = ?2",
        (format_timestamp(at), id),
    )?;
    Ok(updated > 0)
}

fn query_user(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, email, name, last_synced_at FROM users WHERE id = ?1")?;

    let row = stmt
        .query_row([id], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                last_synced_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
