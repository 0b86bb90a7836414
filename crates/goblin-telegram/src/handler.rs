// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message routing and content extraction.
//!
//! Converts incoming Telegram messages into the transport-agnostic
//! [`InboundMessage`] the pipeline consumes, and parses the `/start` deep-link
//! payload used for referral intake.

use goblin_core::InboundMessage;
use teloxide::prelude::*;
use teloxide::types::ChatKind;

/// Whether the message came from a group or supergroup chat.
pub fn is_group(msg: &Message) -> bool {
    !matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Extract the sender identity and text into an [`InboundMessage`].
///
/// `None` when the message has no sender (e.g. channel posts) or no text.
pub fn to_inbound(msg: &Message) -> Option<InboundMessage> {
    let user = msg.from()?;
    let text = msg.text()?;
    Some(InboundMessage {
        sender_id: user.id.0.to_string(),
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        text: text.to_string(),
    })
}

/// Sender id of a message, for guard and quiz keys on non-text updates.
pub fn sender_id(msg: &Message) -> Option<String> {
    msg.from().map(|user| user.id.0.to_string())
}

/// Parse the referrer id out of a `/start ref_<id>` command.
///
/// Returns `None` for a bare `/start` or an unrecognized payload.
pub fn parse_start_referrer(text: &str) -> Option<&str> {
    let payload = text.strip_prefix("/start")?.trim();
    let id = payload.strip_prefix("ref_")?;
    (!id.is_empty()).then_some(id)
}

/// Whether a document is an image the vision backend can read.
pub fn is_image_document(mime_type: Option<&str>) -> bool {
    mime_type.is_some_and(|mime| mime.starts_with("image/"))
}
