// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server startup: storage, pipeline wiring, and the polling loop.

use std::sync::Arc;
use std::time::Duration;

use goblin_agent::{MessagePipeline, ReferralBonusApplier};
use goblin_config::GoblinConfig;
use goblin_context::ContextAssembler;
use goblin_core::GoblinError;
use goblin_guard::{AbuseGuard, GuardLimits};
use goblin_openai::{OpenAiClient, OpenAiGateway};
use goblin_quota::QuotaLedger;
use goblin_storage::queries::plans;
use goblin_storage::Database;
use goblin_telegram::sampler::Sampler;
use goblin_telegram::GoblinBot;
use tracing::info;

/// Bring everything up and run until the polling loop stops.
pub async fn run(config: GoblinConfig) -> Result<(), GoblinError> {
    let db = Database::open(&config.storage.database_path).await?;
    plans::seed_defaults(&db).await?;
    info!(path = %config.storage.database_path, "storage ready");

    let api_key = config.openai.api_key.as_deref().ok_or_else(|| {
        GoblinError::Config("openai.api_key is required (or set GOBLIN_OPENAI_API_KEY)".into())
    })?;
    let client = OpenAiClient::new(
        api_key,
        config.openai.model.clone(),
        Duration::from_secs(config.openai.request_timeout_secs),
    )?;
    let backend = Arc::new(OpenAiGateway::new(client));

    let guard = Arc::new(AbuseGuard::new(GuardLimits {
        window: Duration::from_secs(config.guard.window_secs),
        max_messages: config.guard.max_messages,
        max_warnings: config.guard.max_warnings,
        ban: Duration::from_secs(config.guard.ban_secs),
    }));
    let ledger = QuotaLedger::new(db.clone(), config.quota.default_plan.clone());
    let assembler = ContextAssembler::new(db.clone(), config.agent.system_prompt.clone());
    let applier =
        ReferralBonusApplier::new(db.clone(), ledger.clone(), config.quota.referral_bonus);

    let pipeline = MessagePipeline::new(
        db.clone(),
        guard,
        ledger.clone(),
        assembler,
        backend,
        applier.clone(),
    );

    let bot = GoblinBot::new(
        config.telegram.clone(),
        db.clone(),
        pipeline,
        ledger,
        applier,
        Sampler::random(),
    )?;

    info!(agent = %config.agent.name, "goblin is up");
    bot.dispatch().await;

    db.close().await?;
    Ok(())
}
