// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage harness for integration tests.

use std::sync::Arc;

use goblin_core::GoblinError;
use goblin_storage::queries::{plans, users};
use goblin_storage::{Database, User};

use crate::mock_backend::MockBackend;

/// An in-memory database with the default plan catalog seeded, plus a shared
/// scripted backend.
pub struct TestHarness {
    pub db: Database,
    pub backend: Arc<MockBackend>,
}

impl TestHarness {
    /// Open a fresh in-memory database with Free/Premium plans seeded.
    pub async fn new() -> Result<Self, GoblinError> {
        let db = Database::open_in_memory().await?;
        plans::seed_defaults(&db).await?;
        Ok(Self {
            db,
            backend: Arc::new(MockBackend::new()),
        })
    }

    /// Same, with the backend pre-loaded with replies.
    pub async fn with_replies(replies: Vec<String>) -> Result<Self, GoblinError> {
        let db = Database::open_in_memory().await?;
        plans::seed_defaults(&db).await?;
        Ok(Self {
            db,
            backend: Arc::new(MockBackend::with_replies(replies)),
        })
    }

    /// Register a user by external id.
    pub async fn user(&self, telegram_id: &str) -> Result<User, GoblinError> {
        users::find_or_create(&self.db, telegram_id, None, None).await
    }
}
