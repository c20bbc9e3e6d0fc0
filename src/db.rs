//! Database module for Quill
//!
//! Persists every conversation in a single ordered message log and publishes
//! the full record set to subscribers after each write.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Snapshots buffered per subscriber before it is reported as lagging
const SNAPSHOT_CAPACITY: usize = 64;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    snapshots: broadcast::Sender<Snapshot>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        run_migrations(&conn)?;
        let (snapshots, _) = broadcast::channel(SNAPSHOT_CAPACITY);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            snapshots,
        })
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    // ==================== Writes ====================

    /// Append a message and return its assigned id
    pub fn append(&self, message: &NewMessage) -> DbResult<MessageId> {
        let conn = self.conn()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO messages (text, is_user, conversation_id, pending, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.text,
                message.is_user,
                message.conversation_id.0,
                message.pending,
                now.to_rfc3339(),
            ],
        )?;
        let id = MessageId(conn.last_insert_rowid());

        tracing::debug!(
            message_id = %id,
            conv_id = %message.conversation_id,
            is_user = message.is_user,
            pending = message.pending,
            "Appended message"
        );

        self.publish(&conn);
        Ok(id)
    }

    /// Rewrite text and pending flag of an existing message.
    ///
    /// Returns `false` (and publishes nothing) when the id does not exist.
    pub fn update(&self, id: MessageId, text: &str, pending: bool) -> DbResult<bool> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE messages SET text = ?1, pending = ?2 WHERE id = ?3",
            params![text, pending, id.0],
        )?;

        if updated == 0 {
            tracing::debug!(message_id = %id, "Update skipped, message not found");
            return Ok(false);
        }

        self.publish(&conn);
        Ok(true)
    }

    /// Delete a message. Returns `false` when the id does not exist.
    pub fn delete_by_id(&self, id: MessageId) -> DbResult<bool> {
        let conn = self.conn()?;

        let deleted = conn.execute("DELETE FROM messages WHERE id = ?1", params![id.0])?;

        if deleted == 0 {
            return Ok(false);
        }

        tracing::debug!(message_id = %id, "Deleted message");
        self.publish(&conn);
        Ok(true)
    }

    /// Remove placeholders left pending by a previous process that never
    /// resolved them. Run once at startup.
    pub fn discard_pending(&self) -> DbResult<usize> {
        let conn = self.conn()?;

        let deleted = conn.execute("DELETE FROM messages WHERE pending = 1", [])?;

        if deleted > 0 {
            tracing::info!(count = deleted, "Discarded orphaned reply placeholders");
            self.publish(&conn);
        }
        Ok(deleted)
    }

    // ==================== Reads ====================

    /// Messages of one conversation, ordered by id
    pub fn list_by_conversation(&self, conversation_id: ConversationId) -> DbResult<Vec<Message>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, text, is_user, conversation_id, pending, created_at
             FROM messages WHERE conversation_id = ?1 ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id.0], parse_message_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Every message in the store, ordered by id
    pub fn list_all(&self) -> DbResult<Vec<Message>> {
        let conn = self.conn()?;
        query_all(&conn)
    }

    /// Subscribe to the live ordered view of the whole store.
    ///
    /// The subscription yields the current snapshot first, then one snapshot
    /// per committed write.
    pub fn observe_all(&self) -> DbResult<Subscription> {
        let conn = self.conn()?;
        // Subscribing under the lock means no write can slip between the
        // initial snapshot and the first update.
        let initial: Snapshot = query_all(&conn)?.into();
        let updates = BroadcastStream::new(self.snapshots.subscribe());
        Ok(Subscription {
            initial: Some(initial),
            updates: Some(updates),
        })
    }

    /// Live subscriptions currently attached to the store
    #[allow(dead_code)] // Used in tests
    pub fn subscriber_count(&self) -> usize {
        self.snapshots.receiver_count()
    }

    /// Publish the committed state. Called with the connection still locked so
    /// snapshots go out in commit order.
    ///
    /// The write has already committed by now, so a failed snapshot query is
    /// logged and skipped rather than reported as a failed write.
    fn publish(&self, conn: &Connection) {
        if self.snapshots.receiver_count() == 0 {
            return;
        }
        match query_all(conn) {
            Ok(messages) => {
                // Only fails when every receiver has gone away in the meantime
                let _ = self.snapshots.send(messages.into());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read snapshot after write, observers not notified");
            }
        }
    }
}

/// Live view handle returned by [`Database::observe_all`]
pub struct Subscription {
    initial: Option<Snapshot>,
    updates: Option<BroadcastStream<Snapshot>>,
}

impl Subscription {
    /// Wait for the next snapshot. Returns `None` once unsubscribed or once
    /// every database handle has been dropped.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }

        let updates = self.updates.as_mut()?;
        while let Some(item) = updates.next().await {
            match item {
                Ok(snapshot) => return Some(snapshot),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    // Every snapshot is complete, so skipping ahead loses nothing
                    tracing::warn!(skipped, "Subscriber fell behind store updates");
                }
            }
        }

        self.updates = None;
        None
    }

    /// Detach from the store
    pub fn unsubscribe(&mut self) {
        self.initial = None;
        self.updates = None;
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_active(&self) -> bool {
        self.initial.is_some() || self.updates.is_some()
    }
}

fn run_migrations(conn: &Connection) -> DbResult<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version != SCHEMA_VERSION {
        if version != 0 {
            tracing::warn!(
                found = version,
                expected = SCHEMA_VERSION,
                "Schema version changed, recreating message log"
            );
        }
        conn.execute_batch(DROP_SCHEMA)?;
    }

    conn.execute_batch(SCHEMA)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

fn query_all(conn: &Connection) -> DbResult<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, text, is_user, conversation_id, pending, created_at
         FROM messages ORDER BY id ASC",
    )?;

    let rows = stmt.query_map([], parse_message_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
}

/// Parse a message row from the database
fn parse_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: MessageId(row.get(0)?),
        text: row.get(1)?,
        is_user: row.get(2)?,
        conversation_id: ConversationId(row.get(3)?),
        pending: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
