// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All operations are serialized through tokio-rusqlite's single background
//! thread. Multi-step read-or-create operations (default conversation, active
//! grant) run inside one `call` closure, which makes them atomic with respect
//! to every other database operation in the process. Do NOT create additional
//! `Connection` instances for writes.

use goblin_core::GoblinError;
use tracing::info;

/// Convert a tokio-rusqlite error into [`GoblinError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error) -> GoblinError {
    GoblinError::Storage {
        source: Box::new(e),
    }
}

/// Current UTC time formatted the way every table stores timestamps.
///
/// A fixed millisecond precision keeps lexicographic ordering equal to
/// chronological ordering, so SQL string comparisons on timestamps are sound.
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Handle to the SQLite database backing all persistent state.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, GoblinError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_tr_err)?;
        let db = Self { conn };
        db.initialize().await?;
        info!(path, "database opened");
        Ok(db)
    }

    /// Open an in-memory database with migrations applied. Test use only.
    pub async fn open_in_memory() -> Result<Self, GoblinError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(map_tr_err)?;
        let db = Self { conn };
        db.initialize().await?;
        Ok(db)
    }

    async fn initialize(&self) -> Result<(), GoblinError> {
        self.conn
            .call(|conn| {
                conn.pragma_update(None, "journal_mode", "WAL")?;
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.pragma_update(None, "busy_timeout", 5000)?;
                crate::migrations::run_migrations(conn)
                    .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the database, flushing pending writes.
    pub async fn close(self) -> Result<(), GoblinError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}
