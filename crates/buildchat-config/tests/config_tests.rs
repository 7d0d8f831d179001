// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the buildchat configuration system.

use buildchat_config::diagnostic::ConfigError;
use buildchat_config::model::{BuildchatConfig, ProxyKind, StrategyName};
use buildchat_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_buildchat_config() {
    let toml = r#"
[general]
log_level = "debug"

[im]
server = "jabber.example.org"
port = 5223
username = "ci"
password = "hunter2"
nickname = "jenkins"
default_direct_suffix = "example.org"
default_group_suffix = "conference.example.org"
command_prefix = "?"
initial_groups = "*ops   *dev"
reconnect_unit_secs = 30
reconnect_max_secs = 600

[[im.rooms]]
address = "*announce"
notification_only = true

[im.proxy]
kind = "http"
host = "proxy.local"
port = 3128

[notify]
strategy = "change"
notify_suspects = true
notify_fixers = true
notify_on_start = true
default_author_suffix = "@example.org"

[notify.user_addresses]
alice = "alice@jabber.example.org"
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should load and validate");
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.im.server, "jabber.example.org");
    assert_eq!(config.im.port, 5223);
    assert_eq!(config.im.nickname, "jenkins");
    assert_eq!(config.im.command_prefix, "?");
    assert_eq!(config.im.rooms.len(), 1);
    assert!(config.im.rooms[0].notification_only);
    assert_eq!(config.im.proxy.kind, ProxyKind::Http);
    assert_eq!(config.notify.strategy, StrategyName::Change);
    assert!(config.notify.notify_suspects);
    assert_eq!(
        config.notify.user_addresses.get("alice").map(String::as_str),
        Some("alice@jabber.example.org")
    );

    let groups = config
        .target_resolver()
        .parse_list(&config.im.initial_groups)
        .unwrap();
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g.is_group()));

    let announce = config
        .target_resolver()
        .parse("*announce")
        .unwrap()
        .unwrap();
    assert!(announce.is_notification_only());
}

/// Unknown field in [im] section produces an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_field_in_im_produces_suggestion() {
    let toml = r#"
[im]
comand_prefix = "!"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { key, suggestion: Some(s), span: Some(_), .. }
            if key == "comand_prefix" && s == "command_prefix"
    )));
}

/// An explicit config file is read, and its diagnostics point into that file.
#[test]
fn explicit_path_is_loaded_and_spans_point_into_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ci.toml");

    std::fs::write(&path, "[im]\nnickname = \"jenkins\"\n").unwrap();
    let config = load_and_validate_path(&path).unwrap();
    assert_eq!(config.im.nickname, "jenkins");

    std::fs::write(&path, "[im]\nnicknam = \"jenkins\"\n").unwrap();
    let errors = load_and_validate_path(&path).expect_err("should reject unknown field");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { key, suggestion: Some(s), span: Some(_), .. }
            if key == "nicknam" && s == "nickname"
    )));
}

/// Unknown field in [notify] section is rejected by figment.
#[test]
fn unknown_field_in_notify_produces_error() {
    let toml = r#"
[notify]
stratgy = "all"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("stratgy"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Unknown strategy names are rejected.
#[test]
fn unknown_strategy_is_rejected() {
    let toml = r#"
[notify]
strategy = "sometimes"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.im.server, "localhost");
    assert_eq!(config.im.port, 5222);
    assert_eq!(config.im.nickname, "buildchat");
    assert_eq!(config.im.command_prefix, "!");
    assert!(config.im.initial_groups.is_empty());
    assert!(config.im.password.is_none());
    assert_eq!(config.notify.strategy, StrategyName::All);
    assert!(!config.notify.notify_suspects);
}

/// Environment-style dotted overrides reach nested keys.
#[test]
fn dotted_overrides_reach_nested_keys() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let toml_content = r#"
[im]
server = "from-toml"
"#;

    let config: BuildchatConfig = Figment::new()
        .merge(Serialized::defaults(BuildchatConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("im.server", "from-env"))
        .merge(("im.proxy.kind", "socks"))
        .extract()
        .expect("should merge env override");

    assert_eq!(config.im.server, "from-env");
    assert_eq!(config.im.proxy.kind, ProxyKind::Socks);
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: BuildchatConfig = Figment::new()
        .merge(Serialized::defaults(BuildchatConfig::default()))
        .merge(Toml::file("/nonexistent/path/buildchat.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.im.server, "localhost");
}

/// Invalid recipient strings surface as configuration-time errors.
#[test]
fn invalid_initial_group_fails_validation() {
    let toml = r#"
[im]
initial_groups = "*ops@conference.example.org *bad@@x"
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject malformed room");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::InvalidTarget { target, .. } if target == "*bad@@x")));
}

/// Wrong value types are rejected with a diagnostic naming the key.
#[test]
fn wrong_type_names_key() {
    let toml = r#"
[im]
port = "not-a-number"
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject wrong type");
    assert!(errors.iter().any(|e| e.to_string().contains("port")));
}
