// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message pipeline orchestrator.
//!
//! For every inbound message the pipeline gates it through the abuse guard
//! and the quota ledger, assembles the context, calls the generation backend,
//! persists both turns, debits the quota, and evaluates referral bonuses,
//! in that order. An error terminal is reachable from any step.

pub mod pipeline;
pub mod referral;

pub use pipeline::{MessagePipeline, Outcome, PipelineState};
pub use referral::ReferralBonusApplier;
