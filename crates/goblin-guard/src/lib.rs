// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory abuse guard and ephemeral per-sender state.
//!
//! Nothing in this crate touches storage: abuse counters and quiz state are
//! best-effort process-local state, reset on restart by design. Both are
//! keyed per sender and sharded through `dashmap` so concurrent admits for
//! the same sender cannot race past a threshold check.

pub mod abuse;
pub mod ttl_store;

pub use abuse::{AbuseGuard, GuardLimits, Verdict};
pub use ttl_store::TtlStore;
