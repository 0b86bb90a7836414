// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./goblin.toml` > `~/.config/goblin/goblin.toml` >
//! `/etc/goblin/goblin.toml` with environment variable overrides via the
//! `GOBLIN_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::GoblinConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/goblin/goblin.toml` (system-wide)
/// 3. `~/.config/goblin/goblin.toml` (user XDG config)
/// 4. `./goblin.toml` (local directory)
/// 5. `GOBLIN_*` environment variables
pub fn load_config() -> Result<GoblinConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GoblinConfig::default()))
        .merge(Toml::file("/etc/goblin/goblin.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("goblin/goblin.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("goblin.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from an inline TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<GoblinConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GoblinConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GoblinConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GoblinConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `GOBLIN_TELEGRAM_BOT_TOKEN` must map to
/// `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("GOBLIN_").map(|key| {
        // `key` is the lowercased env var name with the prefix stripped.
        // Example: GOBLIN_TELEGRAM_BOT_TOKEN -> "telegram_bot_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("openai_", "openai.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("quota_", "quota.", 1)
            .replacen("guard_", "guard.", 1);
        mapped.into()
    })
}
