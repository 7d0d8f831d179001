// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: non-empty identities, parseable recipient strings, proxy
//! completeness and consistent reconnect timing.

use buildchat_core::BuildchatError;
use buildchat_core::target::TargetResolver;

use crate::diagnostic::ConfigError;
use crate::model::{BuildchatConfig, ProxyKind};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &BuildchatConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let im = &config.im;

    for (key, value) in [
        ("im.server", &im.server),
        ("im.username", &im.username),
        ("im.nickname", &im.nickname),
        ("im.command_prefix", &im.command_prefix),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            });
        }
    }

    if im.port == 0 {
        errors.push(ConfigError::Validation {
            message: "im.port must be between 1 and 65535".to_string(),
        });
    }

    if im.lock_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "im.lock_timeout_secs must be at least 1".to_string(),
        });
    }

    if im.reconnect_unit_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "im.reconnect_unit_secs must be at least 1".to_string(),
        });
    }

    if let Some(max) = im.reconnect_max_secs
        && max < im.reconnect_unit_secs
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "im.reconnect_max_secs ({max}) must not be smaller than im.reconnect_unit_secs ({})",
                im.reconnect_unit_secs
            ),
        });
    }

    if im.proxy.kind != ProxyKind::None {
        if im.proxy.host.as_deref().is_none_or(|h| h.trim().is_empty()) {
            errors.push(ConfigError::Validation {
                message: "im.proxy.host is required when im.proxy.kind is set".to_string(),
            });
        }
        if im.proxy.port.is_none_or(|p| p == 0) {
            errors.push(ConfigError::Validation {
                message: "im.proxy.port is required when im.proxy.kind is set".to_string(),
            });
        }
    }

    let resolver = config.target_resolver();

    for raw in im.initial_groups.split_whitespace() {
        check_group(&resolver, "im.initial_groups", raw, &mut errors);
    }

    for (i, room) in im.rooms.iter().enumerate() {
        check_group(&resolver, &format!("im.rooms[{i}].address"), &room.address, &mut errors);
    }

    for (author, address) in &config.notify.user_addresses {
        let key = format!("notify.user_addresses.{author}");
        match resolver.parse(address) {
            Ok(Some(_)) => {}
            Ok(None) => errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            }),
            Err(e) => errors.push(target_error(&key, e)),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_group(resolver: &TargetResolver, key: &str, raw: &str, errors: &mut Vec<ConfigError>) {
    match resolver.parse(raw) {
        Ok(Some(target)) if target.is_group() => {}
        Ok(Some(_)) => errors.push(ConfigError::InvalidTarget {
            key: key.to_string(),
            target: raw.to_string(),
            reason: format!(
                "not a room; prefix it with `*` or use an address containing `{}`",
                resolver.group_marker()
            ),
        }),
        Ok(None) => errors.push(ConfigError::Validation {
            message: format!("{key} must not be empty"),
        }),
        Err(e) => errors.push(target_error(key, e)),
    }
}

fn target_error(key: &str, err: BuildchatError) -> ConfigError {
    match err {
        BuildchatError::InvalidTarget { target, reason } => ConfigError::InvalidTarget {
            key: key.to_string(),
            target,
            reason,
        },
        other => ConfigError::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RoomConfig;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors.iter().any(|e| e.to_string().contains(needle))
    }

    #[test]
    fn default_config_validates() {
        let config = BuildchatConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_nickname_fails_validation() {
        let mut config = BuildchatConfig::default();
        config.im.nickname = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "im.nickname"));
    }

    #[test]
    fn malformed_initial_group_is_reported_with_its_key() {
        let mut config = BuildchatConfig::default();
        config.im.default_group_suffix = Some("conference.example.org".into());
        config.im.initial_groups = "*ops *a@b@c".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ConfigError::InvalidTarget { key, target, .. }
                if key == "im.initial_groups" && target == "*a@b@c"
        ));
    }

    #[test]
    fn direct_address_in_initial_groups_is_rejected() {
        let mut config = BuildchatConfig::default();
        config.im.initial_groups = "alice@example.org".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "not a room"));
    }

    #[test]
    fn invalid_room_address_is_reported() {
        let mut config = BuildchatConfig::default();
        config.im.rooms.push(RoomConfig {
            address: "*".into(),
            password: None,
            notification_only: true,
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "im.rooms[0].address"));
    }

    #[test]
    fn proxy_requires_host_and_port() {
        let mut config = BuildchatConfig::default();
        config.im.proxy.kind = ProxyKind::Socks;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "im.proxy.host"));
        assert!(has_message(&errors, "im.proxy.port"));
    }

    #[test]
    fn reconnect_cap_below_unit_fails() {
        let mut config = BuildchatConfig::default();
        config.im.reconnect_unit_secs = 60;
        config.im.reconnect_max_secs = Some(30);
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "reconnect_max_secs"));
    }

    #[test]
    fn user_addresses_must_parse() {
        let mut config = BuildchatConfig::default();
        config
            .notify
            .user_addresses
            .insert("alice".into(), "alice@@example.org".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "notify.user_addresses.alice"));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = BuildchatConfig::default();
        config.im.server = String::new();
        config.im.port = 0;
        config.im.command_prefix = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
