// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota ledger: per-user remaining-message balance and plan expiry.
//!
//! The ledger owns the grant lifecycle: creation of the default grant on
//! first need, expiry rollover, debit after a completed exchange, referral
//! bonus credit, and plan upgrades. At most one grant per user is active at
//! any time; the storage layer's single writer thread plus a partial unique
//! index uphold that invariant under concurrent calls.

pub mod ledger;

pub use ledger::{PlanInfo, QuotaLedger};
