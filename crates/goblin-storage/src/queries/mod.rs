// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query operations, one module per entity.
//!
//! Every function here is a single `conn.call` closure, so each operation
//! (including compound read-or-create ones) executes atomically on the
//! database's single writer thread.

pub mod conversations;
pub mod grants;
pub mod plans;
pub mod referrals;
pub mod turns;
pub mod users;

use std::str::FromStr;

use goblin_core::Role;

use crate::models::PlanKind;

/// Map a stored role column back to [`Role`], surfacing bad data as a
/// conversion failure instead of a panic.
pub(crate) fn role_from_column(idx: usize, value: &str) -> rusqlite::Result<Role> {
    Role::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Map a stored plan kind column back to [`PlanKind`].
pub(crate) fn plan_kind_from_column(idx: usize, value: &str) -> rusqlite::Result<PlanKind> {
    PlanKind::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
