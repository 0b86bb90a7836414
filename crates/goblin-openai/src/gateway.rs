// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The infallible generation gateway over [`OpenAiClient`].
//!
//! The pipeline must always record something and release its slot, so none of
//! these operations surface errors: a failed or timed-out backend call becomes
//! a fixed apology reply.

use async_trait::async_trait;
use goblin_core::{ContextEntry, GenerationBackend};
use tracing::warn;

use crate::client::OpenAiClient;
use crate::types::{ApiMessage, GenParams};

/// Reply used when a conversational completion fails.
pub const CHAT_APOLOGY: &str =
    "Sorry, I couldn't come up with a reply just now. Please try again in a moment.";

/// Reply used when image analysis fails.
pub const IMAGE_APOLOGY: &str =
    "Sorry, I couldn't analyze that image. Please try again in a moment.";

/// Reply used when text extraction fails.
pub const EXTRACT_APOLOGY: &str =
    "Sorry, I couldn't read the text in that image. Please try again in a moment.";

const DEFAULT_IMAGE_PROMPT: &str = "Describe this image in detail.";
const EXTRACT_PROMPT: &str =
    "Extract all text from this image verbatim. Reply with the text only.";

/// Stateless adapter from the pipeline's generation contract to the OpenAI
/// client.
#[derive(Debug, Clone)]
pub struct OpenAiGateway {
    client: OpenAiClient,
}

impl OpenAiGateway {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GenerationBackend for OpenAiGateway {
    async fn chat(&self, context: &[ContextEntry]) -> String {
        let messages = context.iter().map(ApiMessage::from).collect();
        match self.client.complete(messages, GenParams::CHAT).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "chat completion failed, using apology reply");
                CHAT_APOLOGY.to_string()
            }
        }
    }

    async fn analyze_image(&self, image_url: &str, prompt: Option<&str>) -> String {
        let prompt = prompt.unwrap_or(DEFAULT_IMAGE_PROMPT);
        let messages = vec![ApiMessage::with_image(prompt, image_url)];
        match self.client.complete(messages, GenParams::VISION).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "image analysis failed, using apology reply");
                IMAGE_APOLOGY.to_string()
            }
        }
    }

    async fn extract_text(&self, image_url: &str) -> String {
        let messages = vec![ApiMessage::with_image(EXTRACT_PROMPT, image_url)];
        match self.client.complete(messages, GenParams::EXTRACT).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "text extraction failed, using apology reply");
                EXTRACT_APOLOGY.to_string()
            }
        }
    }
}
