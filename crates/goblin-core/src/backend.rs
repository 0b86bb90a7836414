// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The generation backend seam between the pipeline and the LLM provider.

use async_trait::async_trait;

use crate::types::ContextEntry;

/// Adapter for the external text/vision generation backend.
///
/// Every method is infallible from the caller's perspective: on any backend
/// failure (network, rate limit, timeout, malformed response) implementations
/// return a fixed apology string instead of an error. The pipeline must
/// always be able to record *something* and release the slot, so failures are
/// absorbed here rather than propagated.
#[async_trait]
pub trait GenerationBackend: Send + Sync + 'static {
    /// Generates a conversational reply for the given ordered context.
    async fn chat(&self, context: &[ContextEntry]) -> String;

    /// Describes the image at `image_url`, optionally steered by `prompt`.
    async fn analyze_image(&self, image_url: &str, prompt: Option<&str>) -> String;

    /// Extracts text from the image at `image_url` (OCR-style, near-deterministic).
    async fn extract_text(&self, image_url: &str) -> String;
}
