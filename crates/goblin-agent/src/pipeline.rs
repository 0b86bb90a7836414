// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-message pipeline state machine.
//!
//! One pipeline run handles one inbound message end to end. Many runs execute
//! concurrently across senders; per-user read-or-create invariants are upheld
//! by the storage layer, and turn appends within a conversation land in the
//! order their runs reached the persistence step.

use std::future::Future;
use std::sync::Arc;

use goblin_core::{GenerationBackend, GoblinError, InboundMessage, Role};
use goblin_context::ContextAssembler;
use goblin_guard::{AbuseGuard, Verdict};
use goblin_quota::QuotaLedger;
use goblin_storage::queries::{conversations, turns, users};
use goblin_storage::Database;
use metrics::counter;
use strum::Display;
use tracing::{debug, error, info, warn};

use crate::referral::ReferralBonusApplier;

/// Steps of one pipeline run, in order. `Error` is reachable from any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PipelineState {
    Received,
    AbuseChecked,
    QuotaChecked,
    ContextBuilt,
    Generated,
    Persisted,
    QuotaDebited,
    BonusEvaluated,
    Done,
    Error,
}

/// What the transport should send back for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A generated assistant reply; both turns were persisted.
    Reply(String),
    /// An out-of-band notice (warning, quota, failure); no reply generated.
    Notice(String),
    /// Nothing at all; the message was suppressed.
    Silent,
}

/// Notice sent when a storage fault aborts the run.
pub const FAILURE_NOTICE: &str =
    "Something went wrong on my side. Your message was saved; please try again.";

/// Notice sent on unsupported voice messages.
pub const VOICE_NOTICE: &str = "Voice messages aren't supported yet. Please type your question.";

/// Composes the guard, ledger, assembler, backend, store, and bonus applier
/// into the per-message state machine.
#[derive(Clone)]
pub struct MessagePipeline {
    db: Database,
    guard: Arc<AbuseGuard>,
    ledger: QuotaLedger,
    assembler: ContextAssembler,
    backend: Arc<dyn GenerationBackend>,
    bonus_applier: ReferralBonusApplier,
}

impl MessagePipeline {
    pub fn new(
        db: Database,
        guard: Arc<AbuseGuard>,
        ledger: QuotaLedger,
        assembler: ContextAssembler,
        backend: Arc<dyn GenerationBackend>,
        bonus_applier: ReferralBonusApplier,
    ) -> Self {
        Self {
            db,
            guard,
            ledger,
            assembler,
            backend,
            bonus_applier,
        }
    }

    /// Run one inbound text message through the full pipeline.
    ///
    /// Never returns an error to the transport: every failure mode resolves
    /// into an [`Outcome`] the transport can act on directly.
    pub async fn handle_message(&self, inbound: &InboundMessage) -> Outcome {
        counter!("goblin_messages_received_total").increment(1);
        let mut state = PipelineState::Received;

        // RECEIVED -> ABUSE_CHECKED
        match self.guard.admit(&inbound.sender_id) {
            Verdict::Allow => state = self.advance(state, PipelineState::AbuseChecked),
            Verdict::Warn { number } => {
                counter!("goblin_messages_suppressed_total").increment(1);
                self.advance(state, PipelineState::Done);
                return Outcome::Notice(warning_notice(number));
            }
            Verdict::Banned {
                just_banned,
                remaining,
            } => {
                counter!("goblin_messages_suppressed_total").increment(1);
                self.advance(state, PipelineState::Done);
                if just_banned {
                    return Outcome::Notice(ban_notice(remaining.as_secs()));
                }
                return Outcome::Silent;
            }
        }

        // ABUSE_CHECKED -> QUOTA_CHECKED
        let user = match self.resolve_user(inbound).await {
            Ok(user) => user,
            Err(e) => return self.fail(state, e),
        };
        match self.ledger.can_consume(user.id).await {
            Ok(true) => state = self.advance(state, PipelineState::QuotaChecked),
            Ok(false) => {
                counter!("goblin_quota_declined_total").increment(1);
                self.advance(state, PipelineState::Done);
                return match self.ledger.plan_info(user.id).await {
                    Ok(info) => Outcome::Notice(quota_notice(&info.plan, info.messages_left)),
                    Err(e) => self.fail(state, e),
                };
            }
            Err(e) => return self.fail(state, e),
        }

        // QUOTA_CHECKED -> CONTEXT_BUILT: persist the inbound turn first so
        // it survives any later fault, then build the window including it.
        let conversation = match self.with_retry(|| {
            conversations::get_or_create_default(&self.db, user.id)
        })
        .await
        {
            Ok(conversation) => conversation,
            Err(e) => return self.fail(state, e),
        };
        if let Err(e) = self
            .with_retry(|| {
                turns::append(
                    &self.db,
                    conversation.id,
                    user.id,
                    Role::User,
                    &inbound.text,
                    0,
                )
            })
            .await
        {
            return self.fail(state, e);
        }
        let context = match self
            .with_retry(|| self.assembler.build_context(user.id, conversation.id))
            .await
        {
            Ok(context) => context,
            Err(e) => return self.fail(state, e),
        };
        state = self.advance(state, PipelineState::ContextBuilt);

        // CONTEXT_BUILT -> GENERATED: the backend never fails (worst case it
        // answers with its apology text), so this step always advances.
        let reply = self.backend.chat(&context).await;
        state = self.advance(state, PipelineState::Generated);

        // GENERATED -> PERSISTED
        if let Err(e) = self
            .with_retry(|| {
                turns::append(&self.db, conversation.id, user.id, Role::Assistant, &reply, 0)
            })
            .await
        {
            // The assistant turn never landed, so the debit is skipped.
            return self.fail(state, e);
        }
        state = self.advance(state, PipelineState::Persisted);

        // PERSISTED -> QUOTA_DEBITED
        if let Err(e) = self.ledger.debit(user.id).await {
            return self.fail(state, e);
        }
        state = self.advance(state, PipelineState::QuotaDebited);

        // QUOTA_DEBITED -> BONUS_EVALUATED
        match self.bonus_applier.apply_pending(user.id).await {
            Ok(applied) if applied > 0 => {
                counter!("goblin_referral_bonuses_total").increment(applied as u64);
            }
            Ok(_) => {}
            Err(e) => return self.fail(state, e),
        }
        state = self.advance(state, PipelineState::BonusEvaluated);

        self.advance(state, PipelineState::Done);
        counter!("goblin_messages_processed_total").increment(1);
        info!(
            user_id = user.id,
            conversation_id = conversation.id,
            "message processed"
        );
        Outcome::Reply(reply)
    }

    /// Run an image operation through the same guard and quota gates.
    ///
    /// Image exchanges debit exactly one message but do not append turns; the
    /// reply is not part of any conversation's history.
    pub async fn handle_image(
        &self,
        inbound: &InboundMessage,
        image_url: &str,
        prompt: Option<&str>,
        extract: bool,
    ) -> Outcome {
        counter!("goblin_messages_received_total").increment(1);
        let state = PipelineState::Received;

        match self.guard.admit(&inbound.sender_id) {
            Verdict::Allow => {}
            Verdict::Warn { number } => {
                counter!("goblin_messages_suppressed_total").increment(1);
                return Outcome::Notice(warning_notice(number));
            }
            Verdict::Banned {
                just_banned,
                remaining,
            } => {
                counter!("goblin_messages_suppressed_total").increment(1);
                if just_banned {
                    return Outcome::Notice(ban_notice(remaining.as_secs()));
                }
                return Outcome::Silent;
            }
        }

        let user = match self.resolve_user(inbound).await {
            Ok(user) => user,
            Err(e) => return self.fail(state, e),
        };
        match self.ledger.can_consume(user.id).await {
            Ok(true) => {}
            Ok(false) => {
                counter!("goblin_quota_declined_total").increment(1);
                return match self.ledger.plan_info(user.id).await {
                    Ok(info) => Outcome::Notice(quota_notice(&info.plan, info.messages_left)),
                    Err(e) => self.fail(state, e),
                };
            }
            Err(e) => return self.fail(state, e),
        }

        let reply = if extract {
            self.backend.extract_text(image_url).await
        } else {
            self.backend.analyze_image(image_url, prompt).await
        };

        if let Err(e) = self.ledger.debit(user.id).await {
            return self.fail(state, e);
        }
        if let Err(e) = self.bonus_applier.apply_pending(user.id).await {
            return self.fail(state, e);
        }

        counter!("goblin_messages_processed_total").increment(1);
        info!(user_id = user.id, extract, "image processed");
        Outcome::Reply(reply)
    }

    async fn resolve_user(
        &self,
        inbound: &InboundMessage,
    ) -> Result<goblin_storage::User, GoblinError> {
        self.with_retry(|| {
            users::find_or_create(
                &self.db,
                &inbound.sender_id,
                inbound.username.as_deref(),
                inbound.first_name.as_deref(),
            )
        })
        .await
    }

    /// Retry a storage operation at most once before giving up.
    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T, GoblinError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GoblinError>>,
    {
        match op().await {
            Ok(value) => Ok(value),
            Err(first) => {
                warn!(error = %first, "storage operation failed, retrying once");
                op().await
            }
        }
    }

    fn advance(&self, from: PipelineState, to: PipelineState) -> PipelineState {
        debug!(from = %from, to = %to, "pipeline transition");
        to
    }

    fn fail(&self, from: PipelineState, e: GoblinError) -> Outcome {
        counter!("goblin_pipeline_errors_total").increment(1);
        error!(from = %from, error = %e, "pipeline run aborted");
        self.advance(from, PipelineState::Error);
        Outcome::Notice(FAILURE_NOTICE.to_string())
    }
}

fn warning_notice(number: u32) -> String {
    format!("You're sending messages too quickly. Warning {number}: please slow down.")
}

fn ban_notice(secs: u64) -> String {
    format!(
        "You've been temporarily blocked for {} minutes for sending too many messages.",
        secs.div_ceil(60)
    )
}

fn quota_notice(plan: &str, messages_left: i64) -> String {
    format!(
        "You've used up your message allowance on the {plan} plan ({messages_left} left). \
         Upgrade to keep chatting."
    )
}
