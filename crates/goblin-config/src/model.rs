// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Goblin assistant backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Goblin configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GoblinConfig {
    /// Assistant identity and behavior settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// OpenAI API settings.
    #[serde(default)]
    pub openai: OpenaiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Usage quota settings.
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Abuse guard settings.
    #[serde(default)]
    pub guard: GuardConfig,
}

/// Assistant identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// The identity line injected as the first system turn of every context.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_agent_name() -> String {
    "goblin".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful AI assistant with memory and multiple working modes.".to_string()
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables Telegram integration.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Telegram user ids allowed to use admin commands.
    #[serde(default)]
    pub admin_ids: Vec<String>,

    /// Public bot username, used to build referral deep links.
    #[serde(default = "default_bot_username")]
    pub bot_username: String,

    /// Probability of replying to a group-chat message (0.0 disables).
    #[serde(default = "default_group_reply_probability")]
    pub group_reply_probability: f64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            admin_ids: Vec::new(),
            bot_username: default_bot_username(),
            group_reply_probability: default_group_reply_probability(),
        }
    }
}

fn default_bot_username() -> String {
    "goblin_ai_bot".to_string()
}

fn default_group_reply_probability() -> f64 {
    0.1
}

/// OpenAI API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenaiConfig {
    /// OpenAI API key. `None` requires the environment variable override.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier used for all generation calls.
    #[serde(default = "default_model")]
    pub model: String,

    /// Hard timeout for a single generation call, in seconds. A call that
    /// exceeds this falls back to the apology reply.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for OpenaiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "goblin.db".to_string()
}

/// Usage quota configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// Name of the plan granted to users who have no active grant.
    #[serde(default = "default_plan_name")]
    pub default_plan: String,

    /// Messages credited to a referrer per resolved referral.
    #[serde(default = "default_referral_bonus")]
    pub referral_bonus: i64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            default_plan: default_plan_name(),
            referral_bonus: default_referral_bonus(),
        }
    }
}

fn default_plan_name() -> String {
    "Free".to_string()
}

fn default_referral_bonus() -> i64 {
    5
}

/// Abuse guard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// Sliding window length, in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Messages admitted per window before warnings start.
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,

    /// Warnings issued before the sender is banned.
    #[serde(default = "default_max_warnings")]
    pub max_warnings: u32,

    /// Ban duration, in seconds.
    #[serde(default = "default_ban_secs")]
    pub ban_secs: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_messages: default_max_messages(),
            max_warnings: default_max_warnings(),
            ban_secs: default_ban_secs(),
        }
    }
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_messages() -> u32 {
    5
}

fn default_max_warnings() -> u32 {
    3
}

fn default_ban_secs() -> u64 {
    600
}
