// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plan catalog operations.

use goblin_core::GoblinError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::Plan;
use crate::queries::plan_kind_from_column;

const PLAN_COLUMNS: &str = "id, name, kind, messages_limit, duration_days, price, is_active";

fn map_plan_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Plan> {
    let kind_text: String = row.get(2)?;
    Ok(Plan {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: plan_kind_from_column(2, &kind_text)?,
        messages_limit: row.get(3)?,
        duration_days: row.get(4)?,
        price: row.get(5)?,
        is_active: row.get(6)?,
    })
}

/// Seed the built-in Free and Premium plans if they do not exist yet.
///
/// Run at startup; idempotent via the unique plan name.
pub async fn seed_defaults(db: &Database) -> Result<(), GoblinError> {
    db.connection()
        .call(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO plans (name, kind, messages_limit, duration_days, price, is_active)
                 VALUES ('Free', 'package', 10, NULL, 0, 1)",
                [],
            )?;
            conn.execute(
                "INSERT OR IGNORE INTO plans (name, kind, messages_limit, duration_days, price, is_active)
                 VALUES ('Premium', 'subscription', 1000, 30, 9.99, 1)",
                [],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a plan by its unique name.
pub async fn get_by_name(db: &Database, name: &str) -> Result<Option<Plan>, GoblinError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let plan = conn
                .query_row(
                    &format!("SELECT {PLAN_COLUMNS} FROM plans WHERE name = ?1"),
                    params![name],
                    map_plan_row,
                )
                .optional()?;
            Ok(plan)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a plan by id.
pub async fn get_by_id(db: &Database, plan_id: i64) -> Result<Option<Plan>, GoblinError> {
    db.connection()
        .call(move |conn| {
            let plan = conn
                .query_row(
                    &format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = ?1"),
                    params![plan_id],
                    map_plan_row,
                )
                .optional()?;
            Ok(plan)
        })
        .await
        .map_err(map_tr_err)
}
