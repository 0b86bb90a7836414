// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation and project operations.
//!
//! Conversations are never hard-deleted by the pipeline; appends bump
//! `last_activity_at` and may update the rolling summary.

use goblin_core::GoblinError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, now_timestamp, Database};
use crate::models::{Conversation, Project};

/// Title marking the conversation used when the caller names none.
pub const DEFAULT_TITLE: &str = "Default";

const CONVERSATION_COLUMNS: &str =
    "id, user_id, project_id, title, summary, last_activity_at";

fn map_conversation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        project_id: row.get(2)?,
        title: row.get(3)?,
        summary: row.get(4)?,
        last_activity_at: row.get(5)?,
    })
}

/// Resolve the user's default conversation, creating it on first message.
///
/// Runs as one closure on the writer thread; combined with the partial unique
/// index on `(user_id) WHERE title = 'Default'` this upholds the "exactly one
/// default" invariant under concurrent calls.
pub async fn get_or_create_default(
    db: &Database,
    user_id: i64,
) -> Result<Conversation, GoblinError> {
    db.connection()
        .call(move |conn| {
            let existing = conn
                .query_row(
                    &format!(
                        "SELECT {CONVERSATION_COLUMNS} FROM conversations
                         WHERE user_id = ?1 AND title = ?2"
                    ),
                    params![user_id, DEFAULT_TITLE],
                    map_conversation_row,
                )
                .optional()?;
            if let Some(conversation) = existing {
                return Ok(conversation);
            }

            let now = now_timestamp();
            conn.execute(
                "INSERT INTO conversations (user_id, title, last_activity_at)
                 VALUES (?1, ?2, ?3)",
                params![user_id, DEFAULT_TITLE, now],
            )?;
            Ok(Conversation {
                id: conn.last_insert_rowid(),
                user_id,
                project_id: None,
                title: Some(DEFAULT_TITLE.to_string()),
                summary: None,
                last_activity_at: now,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Create a new (non-default) conversation.
pub async fn create(
    db: &Database,
    user_id: i64,
    title: Option<&str>,
    project_id: Option<i64>,
) -> Result<Conversation, GoblinError> {
    let title = title.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO conversations (user_id, project_id, title, last_activity_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, project_id, title, now],
            )?;
            Ok(Conversation {
                id: conn.last_insert_rowid(),
                user_id,
                project_id,
                title,
                summary: None,
                last_activity_at: now,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a conversation only if it belongs to the given user.
pub async fn get_owned(
    db: &Database,
    conversation_id: i64,
    user_id: i64,
) -> Result<Option<Conversation>, GoblinError> {
    db.connection()
        .call(move |conn| {
            let conversation = conn
                .query_row(
                    &format!(
                        "SELECT {CONVERSATION_COLUMNS} FROM conversations
                         WHERE id = ?1 AND user_id = ?2"
                    ),
                    params![conversation_id, user_id],
                    map_conversation_row,
                )
                .optional()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// Update the rolling summary of a conversation.
pub async fn set_summary(
    db: &Database,
    conversation_id: i64,
    summary: &str,
) -> Result<(), GoblinError> {
    let summary = summary.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET summary = ?2 WHERE id = ?1",
                params![conversation_id, summary],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Create a project (used by tests and the profile/project surfaces).
pub async fn create_project(
    db: &Database,
    user_id: i64,
    title: &str,
    summary: Option<&str>,
) -> Result<Project, GoblinError> {
    let title = title.to_string();
    let summary = summary.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO projects (user_id, title, summary, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, title, summary, now],
            )?;
            Ok(Project {
                id: conn.last_insert_rowid(),
                user_id,
                title,
                summary,
                created_at: now,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a project by id.
pub async fn get_project(
    db: &Database,
    project_id: i64,
) -> Result<Option<Project>, GoblinError> {
    db.connection()
        .call(move |conn| {
            let project = conn
                .query_row(
                    "SELECT id, user_id, title, summary, created_at
                     FROM projects WHERE id = ?1",
                    params![project_id],
                    |row| {
                        Ok(Project {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            title: row.get(2)?,
                            summary: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(project)
        })
        .await
        .map_err(map_tr_err)
}

/// Attach an existing conversation to a project.
pub async fn set_project(
    db: &Database,
    conversation_id: i64,
    project_id: i64,
) -> Result<(), GoblinError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET project_id = ?2 WHERE id = ?1",
                params![conversation_id, project_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
