// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context window construction from persisted state.

use goblin_core::{ContextEntry, GoblinError};
use goblin_storage::queries::{conversations, turns, users};
use goblin_storage::Database;
use tracing::debug;

/// How many persisted turns are replayed into the context.
pub const HISTORY_LIMIT: i64 = 10;

/// Builds the bounded context window for a generation call.
///
/// Entry order is fixed: identity system turn, then the profile snapshot,
/// conversation summary, and project summary when present, then the last
/// [`HISTORY_LIMIT`] turns in chronological order with role and content
/// verbatim.
#[derive(Clone)]
pub struct ContextAssembler {
    db: Database,
    system_prompt: String,
}

impl ContextAssembler {
    pub fn new(db: Database, system_prompt: String) -> Self {
        Self { db, system_prompt }
    }

    /// Assemble the context for one generation call.
    ///
    /// Fails with [`GoblinError::NotFound`] when the conversation does not
    /// exist or belongs to another user.
    pub async fn build_context(
        &self,
        user_id: i64,
        conversation_id: i64,
    ) -> Result<Vec<ContextEntry>, GoblinError> {
        let conversation = conversations::get_owned(&self.db, conversation_id, user_id)
            .await?
            .ok_or_else(|| GoblinError::not_found(format!("conversation {conversation_id}")))?;

        let mut context = vec![ContextEntry::system(self.system_prompt.clone())];

        if let Some(profile) = users::get_profile(&self.db, user_id).await? {
            let snapshot = serde_json::json!({
                "name": profile.name,
                "about": profile.about,
                "preferences": profile.preferences,
            });
            context.push(ContextEntry::system(format!("User profile: {snapshot}")));
        }

        if let Some(summary) = conversation.summary.as_deref().filter(|s| !s.is_empty()) {
            context.push(ContextEntry::system(format!(
                "Conversation summary: {summary}"
            )));
        }

        if let Some(project_id) = conversation.project_id {
            if let Some(project) = conversations::get_project(&self.db, project_id).await? {
                if let Some(summary) = project.summary.as_deref().filter(|s| !s.is_empty()) {
                    context.push(ContextEntry::system(format!("Project summary: {summary}")));
                }
            }
        }

        let history = turns::latest(&self.db, conversation_id, HISTORY_LIMIT).await?;
        context.extend(
            history
                .into_iter()
                .map(|turn| ContextEntry::new(turn.role, turn.content)),
        );

        debug!(
            user_id,
            conversation_id,
            entries = context.len(),
            "context assembled"
        );
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goblin_core::Role;
    use goblin_storage::queries::{conversations, turns, users};

    const PROMPT: &str = "You are a helpful AI assistant.";

    async fn setup() -> (Database, ContextAssembler, i64, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = users::find_or_create(&db, "tg-1", None, None).await.unwrap();
        let conversation = conversations::get_or_create_default(&db, user.id)
            .await
            .unwrap();
        let assembler = ContextAssembler::new(db.clone(), PROMPT.to_string());
        (db, assembler, user.id, conversation.id)
    }

    #[tokio::test]
    async fn bare_conversation_yields_identity_only() {
        let (_db, assembler, user_id, conversation_id) = setup().await;

        let context = assembler
            .build_context(user_id, conversation_id)
            .await
            .unwrap();
        assert_eq!(context, vec![ContextEntry::system(PROMPT)]);
    }

    #[tokio::test]
    async fn full_conversation_yields_thirteen_entries() {
        let (db, assembler, user_id, conversation_id) = setup().await;

        users::upsert_profile(&db, user_id, Some("Alice"), Some("likes chess"), None)
            .await
            .unwrap();
        conversations::set_summary(&db, conversation_id, "talked about openings")
            .await
            .unwrap();
        for i in 1..=15 {
            turns::append(
                &db,
                conversation_id,
                user_id,
                if i % 2 == 1 { Role::User } else { Role::Assistant },
                &format!("turn {i}"),
                0,
            )
            .await
            .unwrap();
        }

        let context = assembler
            .build_context(user_id, conversation_id)
            .await
            .unwrap();

        // identity + profile + summary + last 10 turns
        assert_eq!(context.len(), 13);
        assert_eq!(context[0], ContextEntry::system(PROMPT));
        assert!(context[1].content.starts_with("User profile:"));
        assert!(context[1].content.contains("likes chess"));
        assert_eq!(
            context[2].content,
            "Conversation summary: talked about openings"
        );
        // Turns 6..=15 in original chronological order.
        for (offset, i) in (6..=15).enumerate() {
            assert_eq!(context[3 + offset].content, format!("turn {i}"));
        }
    }

    #[tokio::test]
    async fn project_summary_slots_in_after_conversation_summary() {
        let (db, assembler, user_id, _) = setup().await;

        let project = conversations::create_project(&db, user_id, "Thesis", Some("chapter 3"))
            .await
            .unwrap();
        let conversation = conversations::create(&db, user_id, Some("research"), Some(project.id))
            .await
            .unwrap();
        conversations::set_summary(&db, conversation.id, "literature review")
            .await
            .unwrap();

        let context = assembler
            .build_context(user_id, conversation.id)
            .await
            .unwrap();
        assert_eq!(context.len(), 3);
        assert_eq!(context[1].content, "Conversation summary: literature review");
        assert_eq!(context[2].content, "Project summary: chapter 3");
    }

    #[tokio::test]
    async fn empty_summary_is_skipped() {
        let (db, assembler, user_id, conversation_id) = setup().await;
        conversations::set_summary(&db, conversation_id, "").await.unwrap();

        let context = assembler
            .build_context(user_id, conversation_id)
            .await
            .unwrap();
        assert_eq!(context.len(), 1);
    }

    #[tokio::test]
    async fn foreign_conversation_is_not_found() {
        let (db, assembler, _, conversation_id) = setup().await;
        let other = users::find_or_create(&db, "tg-2", None, None).await.unwrap();

        let err = assembler
            .build_context(other.id, conversation_id)
            .await
            .unwrap_err();
        assert!(matches!(err, GoblinError::NotFound { .. }));
    }

    #[tokio::test]
    async fn history_roles_come_through_verbatim() {
        let (db, assembler, user_id, conversation_id) = setup().await;

        turns::append(&db, conversation_id, user_id, Role::User, "hi", 0)
            .await
            .unwrap();
        turns::append(&db, conversation_id, user_id, Role::Assistant, "hello!", 0)
            .await
            .unwrap();

        let context = assembler
            .build_context(user_id, conversation_id)
            .await
            .unwrap();
        assert_eq!(context[1], ContextEntry::new(Role::User, "hi"));
        assert_eq!(context[2], ContextEntry::new(Role::Assistant, "hello!"));
    }
}
