// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./buildchat.toml` > `~/.config/buildchat/buildchat.toml`
//! > `/etc/buildchat/buildchat.toml` with environment variable overrides via
//! the `BUILDCHAT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::BuildchatConfig;

/// Config sections addressable from the environment, most specific first.
const ENV_SECTIONS: &[&str] = &["general", "im_proxy", "im", "notify"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/buildchat/buildchat.toml` (system-wide)
/// 3. `~/.config/buildchat/buildchat.toml` (user XDG config)
/// 4. `./buildchat.toml` (local directory)
/// 5. `BUILDCHAT_*` environment variables
pub fn load_config() -> Result<BuildchatConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<BuildchatConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BuildchatConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BuildchatConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BuildchatConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BuildchatConfig::default()))
        .merge(Toml::file("/etc/buildchat/buildchat.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("buildchat/buildchat.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("buildchat.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` because key names contain
/// underscores: `BUILDCHAT_IM_COMMAND_PREFIX` must map to
/// `im.command_prefix`, and `BUILDCHAT_IM_PROXY_HOST` to `im.proxy.host`.
fn env_provider() -> Env {
    Env::prefixed("BUILDCHAT_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    ENV_SECTIONS
        .iter()
        .find_map(|section| {
            key.strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|rest| format!("{}.{rest}", section.replace('_', ".")))
        })
        .unwrap_or_else(|| key.to_string())
}
