// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only turn log operations.
//!
//! There is deliberately no update or delete path: a turn is immutable once
//! recorded.

use goblin_core::{GoblinError, Role};
use rusqlite::params;

use crate::database::{map_tr_err, now_timestamp, Database};
use crate::models::Turn;
use crate::queries::role_from_column;

fn map_turn_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Turn> {
    let role_text: String = row.get(3)?;
    Ok(Turn {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        user_id: row.get(2)?,
        role: role_from_column(3, &role_text)?,
        content: row.get(4)?,
        tokens: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const TURN_COLUMNS: &str = "id, conversation_id, user_id, role, content, tokens, created_at";

/// Append a turn and bump the conversation's `last_activity_at`.
///
/// Both writes happen in one closure so an appended turn is never observed
/// with a stale conversation timestamp.
pub async fn append(
    db: &Database,
    conversation_id: i64,
    user_id: i64,
    role: Role,
    content: &str,
    tokens: i64,
) -> Result<Turn, GoblinError> {
    let content = content.to_string();
    db.connection()
        .call(move |conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO turns (conversation_id, user_id, role, content, tokens, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    conversation_id,
                    user_id,
                    role.to_string(),
                    content,
                    tokens,
                    now
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.execute(
                "UPDATE conversations SET last_activity_at = ?2 WHERE id = ?1",
                params![conversation_id, now],
            )?;
            Ok(Turn {
                id,
                conversation_id,
                user_id,
                role,
                content,
                tokens,
                created_at: now,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// The most recent `limit` turns of a conversation, in chronological order.
pub async fn latest(
    db: &Database,
    conversation_id: i64,
    limit: i64,
) -> Result<Vec<Turn>, GoblinError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TURN_COLUMNS} FROM turns
                 WHERE conversation_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![conversation_id, limit], map_turn_row)?;
            let mut turns = Vec::new();
            for row in rows {
                turns.push(row?);
            }
            // Fetched newest-first; flip to chronological.
            turns.reverse();
            Ok(turns)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of turns recorded for a conversation.
pub async fn count(db: &Database, conversation_id: i64) -> Result<i64, GoblinError> {
    db.connection()
        .call(move |conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM turns WHERE conversation_id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}
