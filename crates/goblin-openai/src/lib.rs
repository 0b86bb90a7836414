// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI chat-completions gateway.
//!
//! [`client::OpenAiClient`] is the fallible HTTP layer; [`gateway::OpenAiGateway`]
//! wraps it into the infallible [`goblin_core::GenerationBackend`] contract
//! the pipeline consumes: any failure becomes a fixed apology reply, never an
//! error.

pub mod client;
pub mod gateway;
pub mod types;

pub use client::OpenAiClient;
pub use gateway::OpenAiGateway;
