// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Goblin assistant backend.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed query operations for
//! users, conversations, turns, plans, grants, and referrals.
//!
//! The Conversation Store of the message pipeline is
//! [`queries::conversations`] + [`queries::turns`]: an append-only turn log
//! plus mutable per-conversation metadata (summary, activity timestamp).

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::{now_timestamp, Database};
pub use models::*;
