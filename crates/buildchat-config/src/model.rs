// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for buildchat.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;
use std::time::Duration;

use buildchat_core::target::{DEFAULT_GROUP_MARKER, RoomSettings, TargetResolver};
use serde::{Deserialize, Serialize};

/// Top-level buildchat configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BuildchatConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// IM server, account and chat behavior.
    #[serde(default)]
    pub im: ImConfig,

    /// Build notification policy.
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl BuildchatConfig {
    /// Builds the target resolver described by the `[im]` section.
    pub fn target_resolver(&self) -> TargetResolver {
        self.im.target_resolver()
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// IM server connection, account and chat configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ImConfig {
    /// IM server host name.
    #[serde(default = "default_server")]
    pub server: String,

    /// IM server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Account user name (local part or full address).
    #[serde(default = "default_nickname")]
    pub username: String,

    /// Account password. `None` requires the environment variable.
    #[serde(default)]
    pub password: Option<String>,

    /// Resource bound after authentication.
    #[serde(default = "default_resource")]
    pub resource: String,

    /// Nickname used in rooms; also addresses the bot (`nick: status`).
    #[serde(default = "default_nickname")]
    pub nickname: String,

    /// Suffix appended to direct recipients written without a domain.
    #[serde(default)]
    pub default_direct_suffix: Option<String>,

    /// Suffix appended to `*room` recipients written without a domain.
    #[serde(default)]
    pub default_group_suffix: Option<String>,

    /// Address substring that marks a recipient as a room.
    #[serde(default = "default_group_marker")]
    pub group_marker: String,

    /// Prefix that turns a chat message into a bot command.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Whitespace-separated rooms joined on every connect.
    #[serde(default)]
    pub initial_groups: String,

    /// Per-room settings that a recipient string cannot express.
    #[serde(default)]
    pub rooms: Vec<RoomConfig>,

    /// Accept any server certificate. Only for self-signed test servers.
    #[serde(default)]
    pub accept_all_certificates: bool,

    /// Free-text status line broadcast with presence.
    #[serde(default = "default_status_message")]
    pub status_message: String,

    /// Upper bound on waiting for the connection lock when sending.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// Pause before the first reconnection attempt after a loss.
    #[serde(default = "default_reconnect_grace_secs")]
    pub reconnect_grace_secs: u64,

    /// First backoff interval; doubled after each consecutive failure.
    #[serde(default = "default_reconnect_unit_secs")]
    pub reconnect_unit_secs: u64,

    /// Optional cap on the backoff interval. Unbounded when unset.
    #[serde(default)]
    pub reconnect_max_secs: Option<u64>,

    /// Direct chat sessions unused for this long are dropped.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,

    /// Drop history replayed by rooms on join before it reaches the bot.
    #[serde(default = "default_true")]
    pub discard_backlog: bool,

    /// Outbound proxy settings.
    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl Default for ImConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            username: default_nickname(),
            password: None,
            resource: default_resource(),
            nickname: default_nickname(),
            default_direct_suffix: None,
            default_group_suffix: None,
            group_marker: default_group_marker(),
            command_prefix: default_command_prefix(),
            initial_groups: String::new(),
            rooms: Vec::new(),
            accept_all_certificates: false,
            status_message: default_status_message(),
            lock_timeout_secs: default_lock_timeout_secs(),
            reconnect_grace_secs: default_reconnect_grace_secs(),
            reconnect_unit_secs: default_reconnect_unit_secs(),
            reconnect_max_secs: None,
            session_idle_secs: default_session_idle_secs(),
            discard_backlog: true,
            proxy: ProxyConfig::default(),
        }
    }
}

impl ImConfig {
    /// Builds a resolver carrying the default suffixes, the group marker and
    /// every configured room's password and notification-only flag.
    pub fn target_resolver(&self) -> TargetResolver {
        let base = TargetResolver::new()
            .with_direct_suffix(self.default_direct_suffix.as_deref())
            .with_group_suffix(self.default_group_suffix.as_deref())
            .with_group_marker(self.group_marker.clone());

        // Rooms are keyed by their resolved address so that `*ops` and
        // `ops@conference.example.org` name the same room.
        self.rooms.iter().fold(base.clone(), |resolver, room| {
            let address = match base.parse(&room.address) {
                Ok(Some(target)) => target.address().to_string(),
                _ => room.address.clone(),
            };
            resolver.with_room(
                &address,
                RoomSettings {
                    password: room.password.clone(),
                    notification_only: room.notification_only,
                },
            )
        })
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn reconnect_grace(&self) -> Duration {
        Duration::from_secs(self.reconnect_grace_secs)
    }

    pub fn reconnect_unit(&self) -> Duration {
        Duration::from_secs(self.reconnect_unit_secs)
    }

    pub fn reconnect_max(&self) -> Option<Duration> {
        self.reconnect_max_secs.map(Duration::from_secs)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

fn default_server() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5222
}

fn default_resource() -> String {
    "buildchat".to_string()
}

fn default_nickname() -> String {
    "buildchat".to_string()
}

fn default_group_marker() -> String {
    DEFAULT_GROUP_MARKER.to_string()
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_status_message() -> String {
    "Watching your builds".to_string()
}

fn default_lock_timeout_secs() -> u64 {
    5
}

fn default_reconnect_grace_secs() -> u64 {
    10
}

fn default_reconnect_unit_secs() -> u64 {
    60
}

fn default_session_idle_secs() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

/// A room with settings beyond its address.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoomConfig {
    /// Room address, with or without the `*` prefix.
    pub address: String,

    /// Room password, if the room is protected.
    #[serde(default)]
    pub password: Option<String>,

    /// Post notifications only; ignore bot commands in this room.
    #[serde(default)]
    pub notification_only: bool,
}

/// Kind of outbound proxy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyKind {
    #[default]
    None,
    Http,
    Socks,
}

/// Outbound proxy configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    #[serde(default)]
    pub kind: ProxyKind,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

/// Name of the policy deciding whether a build event is announced at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyName {
    /// Every completed build.
    #[default]
    All,
    /// First build, or a result different from the previous build.
    Change,
    /// Every non-successful build.
    Failure,
    /// Every non-successful build plus the build that fixed it.
    FailureAndFixed,
}

/// Build notification configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Policy deciding whether a completed build is announced.
    #[serde(default)]
    pub strategy: StrategyName,

    /// Message the authors of a failing build individually.
    #[serde(default)]
    pub notify_suspects: bool,

    /// Message the authors of a fixing build individually.
    #[serde(default)]
    pub notify_fixers: bool,

    /// Announce build starts in group chats.
    #[serde(default)]
    pub notify_on_start: bool,

    /// Suffix turning a build-system user id into an address
    /// (`alice` + `@example.org`) when no explicit address is configured.
    #[serde(default)]
    pub default_author_suffix: Option<String>,

    /// Explicit IM address per build-system user id.
    #[serde(default)]
    pub user_addresses: BTreeMap<String, String>,

    /// Base URL used when an event carries no build link.
    #[serde(default)]
    pub build_url_base: Option<String>,
}
