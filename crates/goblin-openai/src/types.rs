// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/response types for the OpenAI chat-completions API.

use goblin_core::ContextEntry;
use serde::{Deserialize, Serialize};

/// A chat-completions request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// One message in the request, text-only or multimodal.
#[derive(Debug, Clone, Serialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: ApiContent,
}

impl ApiMessage {
    pub fn text(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: ApiContent::Text(content.into()),
        }
    }

    /// A user message carrying a prompt plus one image reference.
    pub fn with_image(prompt: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: ApiContent::Parts(vec![
                ContentPart::Text {
                    text: prompt.into(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.into(),
                    },
                },
            ]),
        }
    }
}

impl From<&ContextEntry> for ApiMessage {
    fn from(entry: &ContextEntry) -> Self {
        ApiMessage::text(entry.role.to_string(), entry.content.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ApiContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Fixed sampling parameters per operation kind.
///
/// Conversational replies get a creative setting with a generous cap; image
/// analysis sits lower; text extraction is near-deterministic for fidelity.
#[derive(Debug, Clone, Copy)]
pub struct GenParams {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl GenParams {
    pub const CHAT: Self = Self {
        temperature: 0.7,
        max_tokens: 2000,
    };
    pub const VISION: Self = Self {
        temperature: 0.3,
        max_tokens: 1000,
    };
    pub const EXTRACT: Self = Self {
        temperature: 0.1,
        max_tokens: 2000,
    };
}

/// A successful chat-completions response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

/// Error envelope returned by the API on failure statuses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type", default)]
    pub type_: String,
    pub message: String,
}
