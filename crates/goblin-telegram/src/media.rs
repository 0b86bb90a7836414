// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram file resolution for the vision flows.
//!
//! The generation backend takes image URLs, so instead of downloading media
//! we resolve a Telegram file id into the Bot API's public file URL and hand
//! that through.

use goblin_core::GoblinError;
use teloxide::prelude::*;
use teloxide::types::PhotoSize;

/// Resolve a file id into a directly fetchable Bot API file URL.
pub async fn file_url(bot: &Bot, token: &str, file_id: &str) -> Result<String, GoblinError> {
    let file = bot
        .get_file(file_id.to_string())
        .await
        .map_err(|e| GoblinError::Provider {
            message: format!("failed to resolve Telegram file: {e}"),
            source: Some(Box::new(e)),
        })?;
    Ok(format!(
        "https://api.telegram.org/file/bot{token}/{}",
        file.path
    ))
}

/// The largest variant of a photo; Telegram orders sizes ascending.
pub fn largest_photo(photos: &[PhotoSize]) -> Option<&PhotoSize> {
    photos.last()
}
