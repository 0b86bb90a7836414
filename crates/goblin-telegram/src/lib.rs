// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport adapter for the Goblin assistant backend.
//!
//! Runs the teloxide long-polling loop, converts updates into pipeline calls,
//! and handles the transport-level commands (`/start` with referral intake,
//! `/plan`, `/referral`, `/quiz`) plus the group-chat sampling policy.

pub mod handler;
pub mod media;
pub mod quiz;
pub mod sampler;

use std::sync::Arc;

use goblin_agent::{pipeline::VOICE_NOTICE, MessagePipeline, Outcome, ReferralBonusApplier};
use goblin_config::model::TelegramConfig;
use goblin_core::{GoblinError, InboundMessage};
use goblin_quota::QuotaLedger;
use goblin_storage::queries::users;
use goblin_storage::Database;
use teloxide::prelude::*;
use tracing::{debug, info, warn};

use crate::quiz::{GuessOutcome, QuizGame};
use crate::sampler::Sampler;

/// Everything one update handler invocation needs.
pub struct BotState {
    pub pipeline: MessagePipeline,
    pub ledger: QuotaLedger,
    pub applier: ReferralBonusApplier,
    pub quiz: QuizGame,
    pub sampler: Sampler,
    pub config: TelegramConfig,
    pub db: Database,
    token: String,
}

/// The long-polling Telegram bot.
pub struct GoblinBot {
    bot: Bot,
    state: Arc<BotState>,
}

impl GoblinBot {
    /// Build the bot. Requires `config.bot_token`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: TelegramConfig,
        db: Database,
        pipeline: MessagePipeline,
        ledger: QuotaLedger,
        applier: ReferralBonusApplier,
        sampler: Sampler,
    ) -> Result<Self, GoblinError> {
        let token = config
            .bot_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                GoblinError::Config("telegram.bot_token is required for the Telegram bot".into())
            })?;

        let bot = Bot::new(&token);
        let state = Arc::new(BotState {
            pipeline,
            ledger,
            applier,
            quiz: QuizGame::new(),
            sampler,
            config,
            db,
            token,
        });
        Ok(Self { bot, state })
    }

    /// Run long polling until shutdown.
    pub async fn dispatch(self) {
        info!("starting Telegram long polling");
        let state = self.state;
        let handler = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
            let state = state.clone();
            async move {
                state.handle(&bot, &msg).await;
                respond(())
            }
        });

        Dispatcher::builder(self.bot, handler)
            // Silently ignore non-message updates.
            .default_handler(|_| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

impl BotState {
    async fn handle(&self, bot: &Bot, msg: &Message) {
        let Some(sender) = handler::sender_id(msg) else {
            debug!(chat_id = msg.chat.id.0, "ignoring message without sender");
            return;
        };

        if msg.voice().is_some() {
            self.send(bot, msg, VOICE_NOTICE).await;
            return;
        }

        if let Some(photos) = msg.photo() {
            self.handle_photo(bot, msg, &sender, photos).await;
            return;
        }

        if let Some(doc) = msg.document() {
            let mime = doc.mime_type.as_ref().map(|m| m.to_string());
            if handler::is_image_document(mime.as_deref()) {
                self.handle_image_document(bot, msg, &sender, &doc.file.id).await;
            } else {
                debug!(sender, "ignoring non-image document");
            }
            return;
        }

        let Some(inbound) = handler::to_inbound(msg) else {
            debug!(sender, "ignoring unsupported message type");
            return;
        };

        // In group chats only a sampled fraction of plain messages gets a
        // reply; commands and quiz guesses are routed ahead of the gate.
        let sampled_out = handler::is_group(msg)
            && !self
                .sampler
                .should_reply(self.config.group_reply_probability);

        match route_text(&inbound.text, self.quiz.has_pending(&sender), sampled_out) {
            TextRoute::Start => self.handle_start(bot, msg, &inbound).await,
            TextRoute::Plan => self.handle_plan(bot, msg, &inbound).await,
            TextRoute::Referral => self.handle_referral(bot, msg, &inbound).await,
            TextRoute::QuizStart => {
                let question = self.quiz.start(&sender);
                self.send(bot, msg, &question).await;
            }
            TextRoute::QuizGuess(guess) => match self.quiz.guess(&sender, guess) {
                Some(outcome) => self.send(bot, msg, &quiz_text(&outcome)).await,
                // Pending answer expired between the check and the take.
                None => {
                    let outcome = self.pipeline.handle_message(&inbound).await;
                    self.deliver(bot, msg, outcome).await;
                }
            },
            TextRoute::Dropped => {
                debug!(chat_id = msg.chat.id.0, "group message not sampled");
            }
            TextRoute::Pipeline => {
                let outcome = self.pipeline.handle_message(&inbound).await;
                self.deliver(bot, msg, outcome).await;
            }
        }
    }

    async fn handle_photo(
        &self,
        bot: &Bot,
        msg: &Message,
        sender: &str,
        photos: &[teloxide::types::PhotoSize],
    ) {
        let Some(photo) = media::largest_photo(photos) else {
            return;
        };
        let url = match media::file_url(bot, &self.token, &photo.file.id).await {
            Ok(url) => url,
            Err(e) => {
                warn!(sender, error = %e, "failed to resolve photo file");
                return;
            }
        };
        let inbound = self.inbound_for_media(msg, sender);
        let outcome = self
            .pipeline
            .handle_image(&inbound, &url, msg.caption(), false)
            .await;
        self.deliver(bot, msg, outcome).await;
    }

    async fn handle_image_document(&self, bot: &Bot, msg: &Message, sender: &str, file_id: &str) {
        let url = match media::file_url(bot, &self.token, file_id).await {
            Ok(url) => url,
            Err(e) => {
                warn!(sender, error = %e, "failed to resolve document file");
                return;
            }
        };
        let inbound = self.inbound_for_media(msg, sender);
        let outcome = self.pipeline.handle_image(&inbound, &url, None, true).await;
        self.deliver(bot, msg, outcome).await;
    }

    async fn handle_start(&self, bot: &Bot, msg: &Message, inbound: &InboundMessage) {
        let user = match users::find_or_create(
            &self.db,
            &inbound.sender_id,
            inbound.username.as_deref(),
            inbound.first_name.as_deref(),
        )
        .await
        {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "failed to register user on /start");
                return;
            }
        };

        if let Some(referrer) = handler::parse_start_referrer(&inbound.text) {
            match self.applier.record(referrer, user.id).await {
                Ok(true) => debug!(user_id = user.id, referrer, "referral recorded"),
                Ok(false) => debug!(user_id = user.id, referrer, "referral ignored"),
                Err(e) => warn!(error = %e, "failed to record referral"),
            }
        }

        self.send(bot, msg, &welcome_text(inbound.first_name.as_deref()))
            .await;
    }

    async fn handle_plan(&self, bot: &Bot, msg: &Message, inbound: &InboundMessage) {
        let text = match users::find_or_create(
            &self.db,
            &inbound.sender_id,
            inbound.username.as_deref(),
            inbound.first_name.as_deref(),
        )
        .await
        {
            Ok(user) => match self.ledger.plan_info(user.id).await {
                Ok(info) => plan_text(&info.plan, info.messages_left, info.end_at.as_deref()),
                Err(e) => {
                    warn!(error = %e, "failed to look up plan info");
                    return;
                }
            },
            Err(e) => {
                warn!(error = %e, "failed to resolve user for /plan");
                return;
            }
        };
        self.send(bot, msg, &text).await;
    }

    async fn handle_referral(&self, bot: &Bot, msg: &Message, inbound: &InboundMessage) {
        let user = match users::find_or_create(
            &self.db,
            &inbound.sender_id,
            inbound.username.as_deref(),
            inbound.first_name.as_deref(),
        )
        .await
        {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "failed to resolve user for /referral");
                return;
            }
        };
        match self.applier.stats(user.id).await {
            Ok(stats) => {
                let link = referral_link(&self.config.bot_username, &inbound.sender_id);
                self.send(
                    bot,
                    msg,
                    &referral_text(stats.total, stats.processed, &link),
                )
                .await;
            }
            Err(e) => warn!(error = %e, "failed to load referral stats"),
        }
    }

    fn inbound_for_media(&self, msg: &Message, sender: &str) -> InboundMessage {
        let user = msg.from();
        InboundMessage {
            sender_id: sender.to_string(),
            username: user.and_then(|u| u.username.clone()),
            first_name: user.map(|u| u.first_name.clone()),
            text: msg.caption().unwrap_or_default().to_string(),
        }
    }

    async fn deliver(&self, bot: &Bot, msg: &Message, outcome: Outcome) {
        match outcome {
            Outcome::Reply(text) | Outcome::Notice(text) => self.send(bot, msg, &text).await,
            Outcome::Silent => {}
        }
    }

    async fn send(&self, bot: &Bot, msg: &Message, text: &str) {
        if let Err(e) = bot.send_message(msg.chat.id, text).await {
            warn!(chat_id = msg.chat.id.0, error = %e, "failed to send message");
        }
    }
}

/// Where a text message goes after extraction.
#[derive(Debug, PartialEq, Eq)]
enum TextRoute {
    Start,
    Plan,
    Referral,
    QuizStart,
    QuizGuess(i64),
    Dropped,
    Pipeline,
}

/// Route a text message. Commands and pending quiz guesses always get
/// handled; the sampling gate only drops plain pipeline traffic.
fn route_text(text: &str, has_pending_quiz: bool, sampled_out: bool) -> TextRoute {
    if text.starts_with("/start") {
        return TextRoute::Start;
    }
    if text == "/plan" {
        return TextRoute::Plan;
    }
    if text == "/referral" {
        return TextRoute::Referral;
    }
    if text == "/quiz" {
        return TextRoute::QuizStart;
    }
    if has_pending_quiz {
        if let Ok(guess) = text.trim().parse::<i64>() {
            return TextRoute::QuizGuess(guess);
        }
    }
    if sampled_out {
        return TextRoute::Dropped;
    }
    TextRoute::Pipeline
}

fn welcome_text(first_name: Option<&str>) -> String {
    match first_name {
        Some(name) => format!(
            "Hi {name}! I'm your AI assistant. Send me a message and I'll reply; \
             /plan shows your remaining messages."
        ),
        None => "Hi! I'm your AI assistant. Send me a message and I'll reply; \
                 /plan shows your remaining messages."
            .to_string(),
    }
}

fn plan_text(plan: &str, messages_left: i64, end_at: Option<&str>) -> String {
    match end_at {
        Some(end) => {
            format!("You're on the {plan} plan: {messages_left} messages left, valid until {end}.")
        }
        None => format!("You're on the {plan} plan: {messages_left} messages left."),
    }
}

fn referral_link(bot_username: &str, telegram_id: &str) -> String {
    format!("https://t.me/{bot_username}?start=ref_{telegram_id}")
}

fn referral_text(total: i64, processed: i64, link: &str) -> String {
    format!(
        "You've invited {total} friends; {processed} earned you a bonus so far.\n\
         Share your link to get extra messages: {link}"
    )
}

fn quiz_text(outcome: &GuessOutcome) -> String {
    match outcome {
        GuessOutcome::Correct { answer } => {
            format!("Correct! It was {answer}. Nicely done.")
        }
        GuessOutcome::Wrong { answer } => {
            format!("Not quite. It was {answer}. Send /quiz to play again.")
        }
    }
}
