// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted generation backend for deterministic testing.
//!
//! `MockBackend` implements `GenerationBackend` with pre-configured replies,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use goblin_core::{ContextEntry, GenerationBackend};

/// A recorded image operation (analyze or extract).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCall {
    pub image_url: String,
    pub prompt: Option<String>,
}

/// A mock generation backend that returns pre-configured replies.
///
/// Replies are popped from a FIFO queue shared by all three operations. When
/// the queue is empty, a default "mock reply" text is returned. Every chat
/// call's context and every image call's arguments are captured for
/// assertions.
pub struct MockBackend {
    replies: Arc<Mutex<VecDeque<String>>>,
    contexts: Arc<Mutex<Vec<Vec<ContextEntry>>>>,
    image_calls: Arc<Mutex<Vec<ImageCall>>>,
}

impl MockBackend {
    /// Create a new mock backend with an empty reply queue.
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            contexts: Arc::new(Mutex::new(Vec::new())),
            image_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock backend pre-loaded with the given replies.
    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            contexts: Arc::new(Mutex::new(Vec::new())),
            image_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a reply to the end of the queue.
    pub async fn push_reply(&self, text: impl Into<String>) {
        self.replies.lock().await.push_back(text.into());
    }

    /// Contexts of every `chat` call so far, in call order.
    pub async fn contexts(&self) -> Vec<Vec<ContextEntry>> {
        self.contexts.lock().await.clone()
    }

    /// Arguments of every image call so far, in call order.
    pub async fn image_calls(&self) -> Vec<ImageCall> {
        self.image_calls.lock().await.clone()
    }

    async fn next_reply(&self) -> String {
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock reply".to_string())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn chat(&self, context: &[ContextEntry]) -> String {
        self.contexts.lock().await.push(context.to_vec());
        self.next_reply().await
    }

    async fn analyze_image(&self, image_url: &str, prompt: Option<&str>) -> String {
        self.image_calls.lock().await.push(ImageCall {
            image_url: image_url.to_string(),
            prompt: prompt.map(str::to_string),
        });
        self.next_reply().await
    }

    async fn extract_text(&self, image_url: &str) -> String {
        self.image_calls.lock().await.push(ImageCall {
            image_url: image_url.to_string(),
            prompt: None,
        });
        self.next_reply().await
    }
}
