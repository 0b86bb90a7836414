// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Injectable sampling policy for group-chat replies.
//!
//! The bot answers only a bounded fraction of group-chat messages. The draw
//! is injectable so tests can pin it instead of depending on an unseeded RNG.

use std::sync::Arc;

/// A source of uniform draws in `[0, 1)`.
#[derive(Clone)]
pub struct Sampler {
    draw: Arc<dyn Fn() -> f64 + Send + Sync>,
}

impl Sampler {
    /// A sampler backed by the thread-local RNG.
    pub fn random() -> Self {
        Self {
            draw: Arc::new(|| rand::random::<f64>()),
        }
    }

    /// A sampler with a fixed draw function, for deterministic tests.
    pub fn fixed(value: f64) -> Self {
        Self {
            draw: Arc::new(move || value),
        }
    }

    /// Whether to reply, given the configured probability.
    pub fn should_reply(&self, probability: f64) -> bool {
        (self.draw)() < probability
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::random()
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler").finish_non_exhaustive()
    }
}
