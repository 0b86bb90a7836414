// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded conversation context assembly.
//!
//! Builds the ordered `{role, content}` sequence handed to the generation
//! backend: system preamble turns first (identity, profile snapshot,
//! summaries), then a fixed-size window of recent history. No compaction
//! happens here; overflow beyond the window is simply not included.

pub mod assembler;

pub use assembler::{ContextAssembler, HISTORY_LIMIT};
