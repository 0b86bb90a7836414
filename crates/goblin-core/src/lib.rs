// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Goblin assistant backend.
//!
//! This crate provides the error taxonomy, the domain value types shared
//! across the workspace, and the [`GenerationBackend`] trait that decouples
//! the message pipeline from the concrete LLM provider.

pub mod backend;
pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use backend::GenerationBackend;
pub use error::GoblinError;
pub use types::{ContextEntry, InboundMessage, Role};
