// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! Timestamps are RFC 3339 strings with fixed millisecond precision (see
//! [`crate::database::now_timestamp`]), so string ordering is chronological
//! ordering.

use goblin_core::Role;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A registered end user, keyed by external (Telegram) identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub telegram_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub created_at: String,
}

/// Free-form profile data embedded into the context as a system turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub name: Option<String>,
    pub about: Option<String>,
    pub preferences: Option<String>,
    pub updated_at: String,
}

/// Optional grouping of conversations with its own rolling summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub created_at: String,
}

/// A logical thread of turns between one user and the assistant.
///
/// The conversation titled `Default` is the one used when the caller names no
/// explicit conversation; a partial unique index guarantees there is at most
/// one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub user_id: i64,
    pub project_id: Option<i64>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub last_activity_at: String,
}

/// One immutable message within a conversation.
///
/// Ordering is by `created_at` ascending with the AUTOINCREMENT `id` as the
/// tie-break, so insertion order is total even within one millisecond.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: i64,
    pub conversation_id: i64,
    pub user_id: i64,
    pub role: Role,
    pub content: String,
    pub tokens: i64,
    pub created_at: String,
}

/// Whether a plan is a one-off package or a recurring subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    Package,
    Subscription,
}

/// A catalog entry defining an allotment size, price, and optional duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    pub kind: PlanKind,
    pub messages_limit: i64,
    pub duration_days: Option<i64>,
    pub price: f64,
    pub is_active: bool,
}

/// A user's current allotment of remaining replies under a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub id: i64,
    pub user_id: i64,
    pub plan_id: i64,
    pub messages_left: i64,
    pub start_at: String,
    pub end_at: Option<String>,
    pub is_active: bool,
}

/// A tracked referrer/referee relationship, resolved into a bonus exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referral {
    pub id: i64,
    pub referrer_id: i64,
    pub referee_id: i64,
    pub bonus_given: bool,
    pub created_at: String,
}
