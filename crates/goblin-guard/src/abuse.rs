// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window rate limiter with escalating warnings and a temporary ban.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};

/// Thresholds for the abuse state machine.
#[derive(Debug, Clone, Copy)]
pub struct GuardLimits {
    /// Length of the counting window.
    pub window: Duration,
    /// Messages admitted per window before warnings start.
    pub max_messages: u32,
    /// Warnings issued before the sender is banned.
    pub max_warnings: u32,
    /// How long a ban lasts.
    pub ban: Duration,
}

impl Default for GuardLimits {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_messages: 5,
            max_warnings: 3,
            ban: Duration::from_secs(600),
        }
    }
}

/// Outcome of admitting one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The message proceeds into the pipeline.
    Allow,
    /// Suppressed; the sender gets warning number `number` out of the
    /// configured maximum.
    Warn { number: u32 },
    /// Suppressed; the sender is banned for `remaining` more.
    ///
    /// `just_banned` is true only on the admit that entered the ban state, so
    /// the transport can send the ban notice once and stay silent afterwards.
    Banned { just_banned: bool, remaining: Duration },
}

#[derive(Debug)]
struct SenderState {
    window_start: Instant,
    count: u32,
    warnings: u32,
    banned_until: Option<Instant>,
}

impl SenderState {
    fn fresh(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 1,
            warnings: 0,
            banned_until: None,
        }
    }
}

/// Per-sender sliding-window counter with escalating penalties.
///
/// Each sender gets a fixed window; once the per-window message count exceeds
/// the threshold, further messages are suppressed with numbered warnings, and
/// the final warning escalates to a timed ban. Warnings accumulate across
/// windows, so repeat offenders keep escalating toward the ban. Bans clear
/// themselves: the first admit after expiry starts over from a clean window
/// with zero warnings.
///
/// State is held in a sharded map, so a check-then-increment for one sender
/// is atomic while admits for different senders proceed in parallel.
#[derive(Debug, Default)]
pub struct AbuseGuard {
    limits: GuardLimits,
    states: DashMap<String, SenderState>,
}

impl AbuseGuard {
    pub fn new(limits: GuardLimits) -> Self {
        Self {
            limits,
            states: DashMap::new(),
        }
    }

    /// Admit one message from `sender` and return the verdict.
    pub fn admit(&self, sender: &str) -> Verdict {
        self.admit_at(sender, Instant::now())
    }

    /// [`Self::admit`] with an explicit clock, used by tests to drive the
    /// window and ban timers deterministically.
    pub fn admit_at(&self, sender: &str, now: Instant) -> Verdict {
        let mut entry = match self.states.entry(sender.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(SenderState::fresh(now));
                return Verdict::Allow;
            }
            Entry::Occupied(occupied) => occupied,
        };
        let state = entry.get_mut();

        if let Some(until) = state.banned_until {
            if now < until {
                return Verdict::Banned {
                    just_banned: false,
                    remaining: until - now,
                };
            }
            // Ban served; start over.
            *state = SenderState::fresh(now);
            return Verdict::Allow;
        }

        if now.duration_since(state.window_start) >= self.limits.window {
            // New counting window; warnings stick until a ban is served.
            state.window_start = now;
            state.count = 1;
            return Verdict::Allow;
        }

        state.count += 1;
        if state.count <= self.limits.max_messages {
            return Verdict::Allow;
        }

        state.warnings += 1;
        if state.warnings < self.limits.max_warnings {
            warn!(sender, warning = state.warnings, "sender warned");
            return Verdict::Warn {
                number: state.warnings,
            };
        }

        state.banned_until = Some(now + self.limits.ban);
        info!(sender, ban_secs = self.limits.ban.as_secs(), "sender banned");
        Verdict::Banned {
            just_banned: true,
            remaining: self.limits.ban,
        }
    }

    /// Drop all state for `sender`, as if they had never written.
    pub fn forget(&self, sender: &str) {
        self.states.remove(sender);
    }
}
