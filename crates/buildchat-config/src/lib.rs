// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loading and checking of `buildchat.toml`.
//!
//! Files are layered from `/etc`, the user config directory and the working
//! directory, then `BUILDCHAT_*` variables override them. Unknown keys are
//! rejected. Every problem is reported as a [`ConfigError`] that miette can
//! render with the offending line and a suggested key.
//!
//! ```no_run
//! let config = buildchat_config::load_and_validate().expect("config errors");
//! println!("IM server: {}", config.im.server);
//! ```

use std::path::Path;

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::BuildchatConfig;

/// Name of a TOML source paired with its text.
type Source = (String, String);

/// Loads the layered configuration and validates it.
pub fn load_and_validate() -> Result<BuildchatConfig, Vec<ConfigError>> {
    checked(loader::load_config(), layered_sources)
}

/// Loads `path` (plus env overrides) instead of the layered files.
pub fn load_and_validate_path(path: &Path) -> Result<BuildchatConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Loads configuration from TOML text. Used by tests and embedders.
pub fn load_and_validate_str(toml_content: &str) -> Result<BuildchatConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validates a loaded config, or turns the figment error into diagnostics.
/// Sources are only read on failure, for span lookup.
fn checked(
    loaded: Result<BuildchatConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<Source>,
) -> Result<BuildchatConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

fn read_source(path: &Path) -> Option<Source> {
    let content = std::fs::read_to_string(path).ok()?;
    Some((path.display().to_string(), content))
}

/// The files [`loader::load_config`] may have read, most specific first.
fn layered_sources() -> Vec<Source> {
    let local = std::env::current_dir()
        .map(|dir| dir.join("buildchat.toml"))
        .unwrap_or_else(|_| "buildchat.toml".into());
    let user = dirs::config_dir().map(|dir| dir.join("buildchat").join("buildchat.toml"));
    let system = Path::new("/etc/buildchat/buildchat.toml").to_path_buf();

    [Some(local), user, Some(system)]
        .into_iter()
        .flatten()
        .filter_map(|path| read_source(&path))
        .collect()
}
