// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Goblin workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The author of a conversation turn.
///
/// Stored as lowercase text in the database and sent verbatim to the
/// generation backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One entry in the context window sent to the generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub role: Role,
    pub content: String,
}

impl ContextEntry {
    /// Creates a context entry with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system entry.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// An inbound end-user message, already extracted from the transport.
///
/// `sender_id` is the external (transport-level) identity; the pipeline
/// resolves or creates the internal user record from it.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// External sender identity (e.g. the Telegram user id as a string).
    pub sender_id: String,
    /// Optional transport username.
    pub username: Option<String>,
    /// Optional display name.
    pub first_name: Option<String>,
    /// The message text.
    pub text: String,
}

impl InboundMessage {
    /// Creates an inbound text message with only a sender id and text.
    pub fn text(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            username: None,
            first_name: None,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_display_is_lowercase() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(Role::System.to_string(), "system");
    }

    #[test]
    fn role_parses_from_stored_text() {
        assert_eq!(Role::from_str("user").unwrap(), Role::User);
        assert_eq!(Role::from_str("assistant").unwrap(), Role::Assistant);
        assert_eq!(Role::from_str("system").unwrap(), Role::System);
        assert!(Role::from_str("moderator").is_err());
    }

    #[test]
    fn role_serde_round_trip() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let parsed: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Role::Assistant);
    }

    #[test]
    fn context_entry_constructors() {
        let entry = ContextEntry::system("You are helpful.");
        assert_eq!(entry.role, Role::System);
        assert_eq!(entry.content, "You are helpful.");
    }
}
