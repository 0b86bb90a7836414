// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The number-guessing quiz mini-game.
//!
//! Pending answers live in a time-bounded keyed store, one per sender, so an
//! abandoned game simply evaporates instead of lingering in handler state.

use std::time::Duration;

use goblin_guard::TtlStore;
use rand::Rng;

/// Bounds of the secret number, inclusive.
pub const QUIZ_RANGE: std::ops::RangeInclusive<i64> = 1..=10;

/// How long a started game waits for an answer.
const PENDING_TTL: Duration = Duration::from_secs(300);

/// Result of one guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessOutcome {
    Correct { answer: i64 },
    Wrong { answer: i64 },
}

/// Per-sender guessing game over a [`TtlStore`].
pub struct QuizGame {
    pending: TtlStore<String, i64>,
}

impl QuizGame {
    pub fn new() -> Self {
        Self {
            pending: TtlStore::new(PENDING_TTL),
        }
    }

    /// Start a game for `sender` with a random secret.
    pub fn start(&self, sender: &str) -> String {
        self.start_with(sender, rand::thread_rng().gen_range(QUIZ_RANGE))
    }

    /// Start a game with a chosen secret, used by tests.
    pub fn start_with(&self, sender: &str, secret: i64) -> String {
        self.pending.insert(sender.to_string(), secret);
        format!(
            "I'm thinking of a number between {} and {}. What's your guess?",
            QUIZ_RANGE.start(),
            QUIZ_RANGE.end()
        )
    }

    /// Whether `sender` has a live game waiting for an answer.
    pub fn has_pending(&self, sender: &str) -> bool {
        self.pending.get(&sender.to_string()).is_some()
    }

    /// Consume the pending game with a guess. `None` if no game is live.
    pub fn guess(&self, sender: &str, guess: i64) -> Option<GuessOutcome> {
        let answer = self.pending.take(&sender.to_string())?;
        if guess == answer {
            Some(GuessOutcome::Correct { answer })
        } else {
            Some(GuessOutcome::Wrong { answer })
        }
    }
}

impl Default for QuizGame {
    fn default() -> Self {
        Self::new()
    }
}
