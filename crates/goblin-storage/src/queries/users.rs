// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User registry and profile operations.

use goblin_core::GoblinError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, now_timestamp, Database};
use crate::models::{User, UserProfile};

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        username: row.get(2)?,
        first_name: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const USER_COLUMNS: &str = "id, telegram_id, username, first_name, created_at";

/// Resolve a user by external identity, creating the record on first contact.
///
/// The select-or-insert runs in one closure on the single writer thread, so
/// two concurrent calls for the same new sender produce exactly one row.
pub async fn find_or_create(
    db: &Database,
    telegram_id: &str,
    username: Option<&str>,
    first_name: Option<&str>,
) -> Result<User, GoblinError> {
    let telegram_id = telegram_id.to_string();
    let username = username.map(str::to_string);
    let first_name = first_name.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let existing = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?1"),
                    params![telegram_id],
                    map_user_row,
                )
                .optional()?;
            if let Some(user) = existing {
                return Ok(user);
            }

            let created_at = now_timestamp();
            conn.execute(
                "INSERT INTO users (telegram_id, username, first_name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![telegram_id, username, first_name, created_at],
            )?;
            Ok(User {
                id: conn.last_insert_rowid(),
                telegram_id,
                username,
                first_name,
                created_at,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a user by external identity without creating one.
pub async fn get_by_telegram_id(
    db: &Database,
    telegram_id: &str,
) -> Result<Option<User>, GoblinError> {
    let telegram_id = telegram_id.to_string();
    db.connection()
        .call(move |conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?1"),
                    params![telegram_id],
                    map_user_row,
                )
                .optional()?;
            Ok(user)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a user by internal id.
pub async fn get_by_id(db: &Database, user_id: i64) -> Result<Option<User>, GoblinError> {
    db.connection()
        .call(move |conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                    params![user_id],
                    map_user_row,
                )
                .optional()?;
            Ok(user)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch the profile attached to a user, if any.
pub async fn get_profile(
    db: &Database,
    user_id: i64,
) -> Result<Option<UserProfile>, GoblinError> {
    db.connection()
        .call(move |conn| {
            let profile = conn
                .query_row(
                    "SELECT id, user_id, name, about, preferences, updated_at
                     FROM user_profiles WHERE user_id = ?1",
                    params![user_id],
                    |row| {
                        Ok(UserProfile {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            name: row.get(2)?,
                            about: row.get(3)?,
                            preferences: row.get(4)?,
                            updated_at: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(profile)
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace the profile for a user.
pub async fn upsert_profile(
    db: &Database,
    user_id: i64,
    name: Option<&str>,
    about: Option<&str>,
    preferences: Option<&str>,
) -> Result<(), GoblinError> {
    let name = name.map(str::to_string);
    let about = about.map(str::to_string);
    let preferences = preferences.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO user_profiles (user_id, name, about, preferences, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (user_id) DO UPDATE SET
                     name = excluded.name,
                     about = excluded.about,
                     preferences = excluded.preferences,
                     updated_at = excluded.updated_at",
                params![user_id, name, about, preferences, now_timestamp()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
