// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Goblin assistant backend.

use thiserror::Error;

/// The primary error type used across all Goblin crates.
#[derive(Debug, Error)]
pub enum GoblinError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generation backend errors (API failure, malformed response, rate limiting).
    ///
    /// Never crosses the Generation Gateway boundary: the gateway converts
    /// these into a fixed apology reply before the pipeline sees them.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A referenced entity (conversation, user, plan) does not exist or does
    /// not belong to the caller.
    #[error("{entity} not found")]
    NotFound { entity: String },

    /// The user's active grant has no messages left.
    #[error("quota exhausted on plan {plan}: {messages_left} messages left")]
    QuotaExhausted { plan: String, messages_left: i64 },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GoblinError {
    /// Shorthand for a [`GoblinError::NotFound`] with the given entity name.
    pub fn not_found(entity: impl Into<String>) -> Self {
        GoblinError::NotFound {
            entity: entity.into(),
        }
    }
}
