// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Grant (quota) operations.
//!
//! Every compound operation here is one closure on the writer thread, which
//! serializes it against all other grant operations for every user. The
//! partial unique index `idx_grants_one_active` additionally enforces the
//! "at most one active grant per user" invariant at the schema level.

use goblin_core::GoblinError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, now_timestamp, Database};
use crate::models::Grant;

const GRANT_COLUMNS: &str = "id, user_id, plan_id, messages_left, start_at, end_at, is_active";

fn map_grant_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Grant> {
    Ok(Grant {
        id: row.get(0)?,
        user_id: row.get(1)?,
        plan_id: row.get(2)?,
        messages_left: row.get(3)?,
        start_at: row.get(4)?,
        end_at: row.get(5)?,
        is_active: row.get(6)?,
    })
}

fn select_active(conn: &rusqlite::Connection, user_id: i64) -> rusqlite::Result<Option<Grant>> {
    conn.query_row(
        &format!("SELECT {GRANT_COLUMNS} FROM grants WHERE user_id = ?1 AND is_active = 1"),
        params![user_id],
        map_grant_row,
    )
    .optional()
}

fn insert_active(
    conn: &rusqlite::Connection,
    user_id: i64,
    plan_id: i64,
    messages_left: i64,
    end_at: Option<&str>,
) -> rusqlite::Result<Grant> {
    let start_at = now_timestamp();
    conn.execute(
        "INSERT INTO grants (user_id, plan_id, messages_left, start_at, end_at, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)",
        params![user_id, plan_id, messages_left, start_at, end_at],
    )?;
    Ok(Grant {
        id: conn.last_insert_rowid(),
        user_id,
        plan_id,
        messages_left,
        start_at,
        end_at: end_at.map(str::to_string),
        is_active: true,
    })
}

/// The user's currently active grant, if any.
pub async fn get_active(db: &Database, user_id: i64) -> Result<Option<Grant>, GoblinError> {
    db.connection()
        .call(move |conn| {
            let grant = select_active(conn, user_id)?;
            Ok(grant)
        })
        .await
        .map_err(map_tr_err)
}

/// Return the active grant, creating one on `plan_id` if none exists.
pub async fn ensure_active(
    db: &Database,
    user_id: i64,
    plan_id: i64,
    messages_limit: i64,
) -> Result<Grant, GoblinError> {
    db.connection()
        .call(move |conn| {
            if let Some(grant) = select_active(conn, user_id)? {
                return Ok(grant);
            }
            let grant = insert_active(conn, user_id, plan_id, messages_limit, None)?;
            Ok(grant)
        })
        .await
        .map_err(map_tr_err)
}

/// Resolve the grant that authorizes the user's next message.
///
/// Creates a default grant if none exists. If the active grant carries an
/// `end_at` that has passed, it is deactivated and a fresh default grant is
/// issued in its place, all within the same closure.
pub async fn resolve_for_consume(
    db: &Database,
    user_id: i64,
    default_plan_id: i64,
    default_allotment: i64,
) -> Result<Grant, GoblinError> {
    db.connection()
        .call(move |conn| {
            let now = now_timestamp();
            match select_active(conn, user_id)? {
                None => {
                    let grant =
                        insert_active(conn, user_id, default_plan_id, default_allotment, None)?;
                    Ok(grant)
                }
                Some(grant) => {
                    let expired = grant.end_at.as_deref().is_some_and(|end| end < now.as_str());
                    if !expired {
                        return Ok(grant);
                    }
                    conn.execute(
                        "UPDATE grants SET is_active = 0 WHERE id = ?1",
                        params![grant.id],
                    )?;
                    let fresh =
                        insert_active(conn, user_id, default_plan_id, default_allotment, None)?;
                    Ok(fresh)
                }
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Decrement `messages_left` by one on the active grant, floored at zero.
///
/// No-op if there is no active grant or the balance is already zero; never
/// raises for either case.
pub async fn debit(db: &Database, user_id: i64) -> Result<(), GoblinError> {
    db.connection()
        .call(move |conn| {
            let _changed = conn.execute(
                "UPDATE grants SET messages_left = messages_left - 1
                 WHERE user_id = ?1 AND is_active = 1 AND messages_left > 0",
                params![user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Add `amount` messages to the user's active grant, if one exists.
pub async fn credit(db: &Database, user_id: i64, amount: i64) -> Result<(), GoblinError> {
    db.connection()
        .call(move |conn| {
            let _changed = conn.execute(
                "UPDATE grants SET messages_left = messages_left + ?2
                 WHERE user_id = ?1 AND is_active = 1",
                params![user_id, amount],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Deactivate all active grants for the user and issue a new one.
pub async fn upgrade(
    db: &Database,
    user_id: i64,
    plan_id: i64,
    messages_limit: i64,
    end_at: Option<String>,
) -> Result<Grant, GoblinError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE grants SET is_active = 0 WHERE user_id = ?1 AND is_active = 1",
                params![user_id],
            )?;
            let grant =
                insert_active(conn, user_id, plan_id, messages_limit, end_at.as_deref())?;
            Ok(grant)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of active grants for a user. Test aid for the invariant checks.
pub async fn active_count(db: &Database, user_id: i64) -> Result<i64, GoblinError> {
    db.connection()
        .call(move |conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM grants WHERE user_id = ?1 AND is_active = 1",
                params![user_id],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{plans, users};

    async fn setup() -> (Database, i64, crate::models::Plan) {
        let db = Database::open_in_memory().await.unwrap();
        plans::seed_defaults(&db).await.unwrap();
        let user = users::find_or_create(&db, "tg-1", None, None).await.unwrap();
        let free = plans::get_by_name(&db, "Free").await.unwrap().unwrap();
        (db, user.id, free)
    }

    #[tokio::test]
    async fn ensure_active_creates_then_reuses() {
        let (db, user_id, free) = setup().await;

        let first = ensure_active(&db, user_id, free.id, free.messages_limit)
            .await
            .unwrap();
        assert_eq!(first.messages_left, 10);

        let second = ensure_active(&db, user_id, free.id, free.messages_limit)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(active_count(&db, user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_ensure_yields_single_active_grant() {
        let (db, user_id, free) = setup().await;

        let (a, b) = tokio::join!(
            ensure_active(&db, user_id, free.id, free.messages_limit),
            ensure_active(&db, user_id, free.id, free.messages_limit),
        );
        assert_eq!(a.unwrap().id, b.unwrap().id);
        assert_eq!(active_count(&db, user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn expired_grant_is_replaced_before_balance_check() {
        let (db, user_id, free) = setup().await;
        let premium = plans::get_by_name(&db, "Premium").await.unwrap().unwrap();

        // Expired premium grant with plenty of balance left.
        upgrade(
            &db,
            user_id,
            premium.id,
            premium.messages_limit,
            Some("2020-01-01T00:00:00.000Z".to_string()),
        )
        .await
        .unwrap();

        let grant = resolve_for_consume(&db, user_id, free.id, free.messages_limit)
            .await
            .unwrap();
        assert_eq!(grant.plan_id, free.id);
        assert_eq!(grant.messages_left, 10);
        assert_eq!(active_count(&db, user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn debit_floors_at_zero() {
        let (db, user_id, free) = setup().await;
        let grant = ensure_active(&db, user_id, free.id, 2).await.unwrap();

        for _ in 0..5 {
            debit(&db, user_id).await.unwrap();
        }

        let after = get_active(&db, user_id).await.unwrap().unwrap();
        assert_eq!(after.id, grant.id);
        assert_eq!(after.messages_left, 0);
    }

    #[tokio::test]
    async fn debit_without_grant_is_noop() {
        let (db, user_id, _free) = setup().await;
        debit(&db, user_id).await.unwrap();
        assert!(get_active(&db, user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upgrade_supersedes_active_grant() {
        let (db, user_id, free) = setup().await;
        let premium = plans::get_by_name(&db, "Premium").await.unwrap().unwrap();

        let _free_grant = ensure_active(&db, user_id, free.id, free.messages_limit)
            .await
            .unwrap();
        let upgraded = upgrade(
            &db,
            user_id,
            premium.id,
            premium.messages_limit,
            Some("2099-01-01T00:00:00.000Z".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(upgraded.messages_left, 1000);
        assert_eq!(active_count(&db, user_id).await.unwrap(), 1);
        let active = get_active(&db, user_id).await.unwrap().unwrap();
        assert_eq!(active.id, upgraded.id);
    }

    #[tokio::test]
    async fn credit_adds_to_active_grant_only() {
        let (db, user_id, free) = setup().await;
        ensure_active(&db, user_id, free.id, free.messages_limit)
            .await
            .unwrap();

        credit(&db, user_id, 5).await.unwrap();
        let active = get_active(&db, user_id).await.unwrap().unwrap();
        assert_eq!(active.messages_left, 15);
    }
}
