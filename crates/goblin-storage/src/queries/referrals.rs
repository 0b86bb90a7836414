// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Referral record operations.
//!
//! `bonus_given` flips false to true exactly once per record; the conditional
//! update in [`mark_bonus_given`] is the sole correctness mechanism, so every
//! crediting path must go through it and honor its return value.

use goblin_core::GoblinError;
use rusqlite::params;

use crate::database::{map_tr_err, now_timestamp, Database};
use crate::models::Referral;

const REFERRAL_COLUMNS: &str = "id, referrer_id, referee_id, bonus_given, created_at";

fn map_referral_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Referral> {
    Ok(Referral {
        id: row.get(0)?,
        referrer_id: row.get(1)?,
        referee_id: row.get(2)?,
        bonus_given: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Record a referral at first contact. Returns `true` if a new record was
/// created, `false` if the (referrer, referee) pair already existed.
pub async fn create_if_absent(
    db: &Database,
    referrer_id: i64,
    referee_id: i64,
) -> Result<bool, GoblinError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO referrals (referrer_id, referee_id, bonus_given, created_at)
                 VALUES (?1, ?2, 0, ?3)",
                params![referrer_id, referee_id, now_timestamp()],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// All unresolved referral records where the given user is the referee.
pub async fn pending_for_referee(
    db: &Database,
    referee_id: i64,
) -> Result<Vec<Referral>, GoblinError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REFERRAL_COLUMNS} FROM referrals
                 WHERE referee_id = ?1 AND bonus_given = 0"
            ))?;
            let rows = stmt.query_map(params![referee_id], map_referral_row)?;
            let mut referrals = Vec::new();
            for row in rows {
                referrals.push(row?);
            }
            Ok(referrals)
        })
        .await
        .map_err(map_tr_err)
}

/// Conditionally flip `bonus_given` for one record.
///
/// Returns `true` only for the single caller that performed the false→true
/// transition; concurrent evaluators observe `false` and must not credit.
pub async fn mark_bonus_given(db: &Database, referral_id: i64) -> Result<bool, GoblinError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE referrals SET bonus_given = 1 WHERE id = ?1 AND bonus_given = 0",
                params![referral_id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Total and resolved referral counts for a referrer.
pub async fn stats_for_referrer(
    db: &Database,
    referrer_id: i64,
) -> Result<(i64, i64), GoblinError> {
    db.connection()
        .call(move |conn| {
            let (total, processed) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(bonus_given), 0) FROM referrals
                 WHERE referrer_id = ?1",
                params![referrer_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok((total, processed))
        })
        .await
        .map_err(map_tr_err)
}
