// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Goblin integration tests.
//!
//! Provides a scripted generation backend and a storage harness for fast,
//! deterministic, CI-runnable tests without external services.

pub mod harness;
pub mod mock_backend;

pub use harness::TestHarness;
pub use mock_backend::MockBackend;
