// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message targets and the resolver that turns human-entered recipient
//! strings into them.
//!
//! Recipient strings come from configuration (`*ops`, `alice`,
//! `release@conference.example.org`, `bob@example.org/laptop`) and are
//! resolved into either a [`MessageTarget::Direct`] or a
//! [`MessageTarget::Group`]. [`TargetResolver::format`] is the inverse used
//! when targets are written back to configuration.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::BuildchatError;

/// Prefix that forces a recipient string to resolve to a group chat.
pub const GROUP_PREFIX: char = '*';

/// Substring that identifies a group-chat address without the `*` prefix.
pub const DEFAULT_GROUP_MARKER: &str = "conference.";

/// Destination of a chat message.
///
/// Equality and hashing use the variant plus the normalized address, so
/// recipient sets deduplicate `Bob@Example.org` and `bob@example.org`.
/// Group password and notification-only flag do not take part in equality.
#[derive(Debug, Clone)]
pub enum MessageTarget {
    /// A single user, addressed as `local@domain[/resource]`.
    Direct { address: String },
    /// A multi-user chat room.
    Group {
        address: String,
        password: Option<String>,
        /// Suppresses bot command processing in this room.
        notification_only: bool,
    },
}

impl MessageTarget {
    /// Direct target for an already-validated address.
    pub fn direct(address: impl Into<String>) -> Self {
        Self::Direct {
            address: address.into(),
        }
    }

    /// Group target for an already-validated room address, without password.
    pub fn group(address: impl Into<String>) -> Self {
        Self::Group {
            address: address.into(),
            password: None,
            notification_only: false,
        }
    }

    pub fn address(&self) -> &str {
        match self {
            Self::Direct { address } | Self::Group { address, .. } => address,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group { .. })
    }

    pub fn password(&self) -> Option<&str> {
        match self {
            Self::Group { password, .. } => password.as_deref(),
            Self::Direct { .. } => None,
        }
    }

    /// Whether bot commands are ignored in this chat.
    pub fn is_notification_only(&self) -> bool {
        matches!(
            self,
            Self::Group {
                notification_only: true,
                ..
            }
        )
    }

    /// Address with the bare `local@domain` part lowercased. The resource,
    /// if any, is case-sensitive and kept as is.
    pub fn normalized(&self) -> String {
        normalize_address(self.address())
    }

    /// The same target without its `/resource` suffix.
    pub fn bare(&self) -> MessageTarget {
        let bare = bare_address(self.address()).to_string();
        match self {
            Self::Direct { .. } => Self::Direct { address: bare },
            Self::Group {
                password,
                notification_only,
                ..
            } => Self::Group {
                address: bare,
                password: password.clone(),
                notification_only: *notification_only,
            },
        }
    }
}

impl PartialEq for MessageTarget {
    fn eq(&self, other: &Self) -> bool {
        self.is_group() == other.is_group() && self.normalized() == other.normalized()
    }
}

impl Eq for MessageTarget {}

impl Hash for MessageTarget {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_group().hash(state);
        self.normalized().hash(state);
    }
}

impl fmt::Display for MessageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct { address } => f.write_str(address),
            Self::Group { address, .. } => write!(f, "{GROUP_PREFIX}{address}"),
        }
    }
}

/// Per-room attributes that a bare recipient string cannot carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomSettings {
    pub password: Option<String>,
    pub notification_only: bool,
}

/// Parses, validates and normalizes recipient strings.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    default_direct_suffix: Option<String>,
    default_group_suffix: Option<String>,
    group_marker: String,
    rooms: HashMap<String, RoomSettings>,
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetResolver {
    /// Resolver with no default suffixes and the `conference.` group marker.
    pub fn new() -> Self {
        Self {
            default_direct_suffix: None,
            default_group_suffix: None,
            group_marker: DEFAULT_GROUP_MARKER.to_string(),
            rooms: HashMap::new(),
        }
    }

    /// Suffix appended to direct recipients written without a domain
    /// (`alice` -> `alice@example.org`). A missing leading `@` is added.
    pub fn with_direct_suffix(mut self, suffix: Option<&str>) -> Self {
        self.default_direct_suffix = suffix.and_then(normalize_suffix);
        self
    }

    /// Suffix appended to `*room` recipients written without a domain.
    pub fn with_group_suffix(mut self, suffix: Option<&str>) -> Self {
        self.default_group_suffix = suffix.and_then(normalize_suffix);
        self
    }

    pub fn with_group_marker(mut self, marker: impl Into<String>) -> Self {
        self.group_marker = marker.into();
        self
    }

    /// Registers password and notification-only settings for a room. They
    /// are attached to every group target resolving to `address`.
    pub fn with_room(mut self, address: &str, settings: RoomSettings) -> Self {
        self.rooms
            .insert(normalize_address(address.trim().trim_start_matches(GROUP_PREFIX)), settings);
        self
    }

    pub fn group_marker(&self) -> &str {
        &self.group_marker
    }

    /// Parses one recipient string.
    ///
    /// Returns `Ok(None)` for blank input so callers can skip it.
    pub fn parse(&self, raw: &str) -> Result<Option<MessageTarget>, BuildchatError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let (is_group, mut address) = if let Some(rest) = trimmed.strip_prefix(GROUP_PREFIX) {
            let mut address = rest.trim().to_string();
            if !address.contains('@')
                && let Some(suffix) = &self.default_group_suffix
            {
                address.push_str(suffix);
            }
            (true, address)
        } else if !self.group_marker.is_empty() && trimmed.contains(&self.group_marker) {
            (true, trimmed.to_string())
        } else {
            (false, trimmed.to_string())
        };

        if !is_group
            && !address.contains('@')
            && let Some(suffix) = &self.default_direct_suffix
        {
            address.push_str(suffix);
        }

        validate_address(trimmed, &address)?;

        if is_group {
            let settings = self
                .rooms
                .get(&normalize_address(&address))
                .cloned()
                .unwrap_or_default();
            Ok(Some(MessageTarget::Group {
                address,
                password: settings.password,
                notification_only: settings.notification_only,
            }))
        } else {
            Ok(Some(MessageTarget::Direct { address }))
        }
    }

    /// Parses a whitespace-separated list, skipping blanks and dropping
    /// duplicates while keeping first-seen order. Fails on the first
    /// malformed entry.
    pub fn parse_list(&self, raw: &str) -> Result<Vec<MessageTarget>, BuildchatError> {
        let mut targets: Vec<MessageTarget> = Vec::new();
        for token in raw.split_whitespace() {
            if let Some(target) = self.parse(token)?
                && !targets.contains(&target)
            {
                targets.push(target);
            }
        }
        Ok(targets)
    }

    /// Formats a target so that `parse(format(t)) == t`.
    ///
    /// Group addresses already carrying the group marker are written as is;
    /// every other group is re-prefixed with `*`.
    pub fn format(&self, target: &MessageTarget) -> String {
        match target {
            MessageTarget::Direct { address } => address.clone(),
            MessageTarget::Group { address, .. } => {
                if !self.group_marker.is_empty() && address.contains(&self.group_marker) {
                    address.clone()
                } else {
                    format!("{GROUP_PREFIX}{address}")
                }
            }
        }
    }
}

fn normalize_suffix(suffix: &str) -> Option<String> {
    let suffix = suffix.trim();
    if suffix.is_empty() {
        None
    } else if suffix.starts_with('@') {
        Some(suffix.to_string())
    } else {
        Some(format!("@{suffix}"))
    }
}

fn bare_address(address: &str) -> &str {
    address.split_once('/').map_or(address, |(bare, _)| bare)
}

fn normalize_address(address: &str) -> String {
    match address.split_once('/') {
        Some((bare, resource)) => format!("{}/{resource}", bare.to_lowercase()),
        None => address.to_lowercase(),
    }
}

fn validate_address(raw: &str, address: &str) -> Result<(), BuildchatError> {
    let invalid = |reason: &str| BuildchatError::InvalidTarget {
        target: raw.to_string(),
        reason: reason.to_string(),
    };

    if address.chars().any(char::is_whitespace) {
        return Err(invalid("contains whitespace"));
    }

    match address.matches('@').count() {
        0 => return Err(invalid("missing `@` between local part and domain")),
        1 => {}
        _ => return Err(invalid("more than one `@`")),
    }

    let (local, rest) = address
        .split_once('@')
        .ok_or_else(|| invalid("missing `@` between local part and domain"))?;
    if local.is_empty() {
        return Err(invalid("empty local part"));
    }
    if bare_address(rest).is_empty() {
        return Err(invalid("empty domain"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resolver() -> TargetResolver {
        TargetResolver::new()
            .with_direct_suffix(Some("example.org"))
            .with_group_suffix(Some("@conference.example.org"))
    }

    #[test]
    fn blank_input_is_skipped() {
        assert!(resolver().parse("   ").unwrap().is_none());
        assert!(resolver().parse("").unwrap().is_none());
    }

    #[test]
    fn direct_address_is_kept_verbatim() {
        let target = resolver().parse("  Bob@Example.org/laptop ").unwrap().unwrap();
        assert_eq!(target, MessageTarget::direct("bob@example.org/laptop"));
        assert_eq!(target.address(), "Bob@Example.org/laptop");
        assert!(!target.is_group());
    }

    #[test]
    fn direct_without_domain_gets_default_suffix() {
        let target = resolver().parse("alice").unwrap().unwrap();
        assert_eq!(target.address(), "alice@example.org");
    }

    #[test]
    fn star_prefix_makes_group_with_default_suffix() {
        let target = resolver().parse("*ops").unwrap().unwrap();
        assert!(target.is_group());
        assert_eq!(target.address(), "ops@conference.example.org");
    }

    #[test]
    fn group_marker_without_star_is_group() {
        let target = resolver()
            .parse("release@conference.example.org")
            .unwrap()
            .unwrap();
        assert!(target.is_group());
    }

    #[test]
    fn star_with_full_address_keeps_domain() {
        let target = resolver().parse("*ops@rooms.example.net").unwrap().unwrap();
        assert!(target.is_group());
        assert_eq!(target.address(), "ops@rooms.example.net");
    }

    #[test]
    fn double_at_is_rejected_even_with_marker() {
        for raw in ["a@b@c", "*a@b@conference.example.org", "x@conference.y@z"] {
            let err = resolver().parse(raw).unwrap_err();
            assert!(
                matches!(&err, BuildchatError::InvalidTarget { target, .. } if target == raw),
                "{raw}: {err}"
            );
        }
    }

    #[test]
    fn bare_star_fails_validation() {
        let err = resolver().parse("*").unwrap_err();
        assert!(matches!(err, BuildchatError::InvalidTarget { .. }));
        // Without a default group suffix there is no `@` at all.
        assert!(TargetResolver::new().parse("*").is_err());
    }

    #[test]
    fn missing_suffix_leaves_address_invalid() {
        let err = TargetResolver::new().parse("alice").unwrap_err();
        assert!(err.to_string().contains("missing `@`"));
    }

    #[test]
    fn empty_domain_is_rejected() {
        assert!(resolver().parse("alice@").is_err());
        assert!(resolver().parse("alice@/res").is_err());
    }

    #[test]
    fn configured_room_settings_are_attached() {
        let resolver = resolver().with_room(
            "*Ops@conference.example.org",
            RoomSettings {
                password: Some("s3cret".into()),
                notification_only: true,
            },
        );
        let target = resolver.parse("*ops").unwrap().unwrap();
        assert_eq!(target.password(), Some("s3cret"));
        assert!(target.is_notification_only());
    }

    #[test]
    fn format_re_prefixes_groups_without_marker() {
        let r = resolver();
        let group = MessageTarget::group("ops@rooms.example.net");
        assert_eq!(r.format(&group), "*ops@rooms.example.net");
        let marked = MessageTarget::group("ops@conference.example.org");
        assert_eq!(r.format(&marked), "ops@conference.example.org");
        assert_eq!(r.format(&MessageTarget::direct("a@b")), "a@b");
    }

    #[test]
    fn parse_list_deduplicates_by_normalized_address() {
        let targets = resolver()
            .parse_list("alice  Alice@example.org *ops ops@conference.example.org bob")
            .unwrap();
        let addresses: Vec<&str> = targets.iter().map(MessageTarget::address).collect();
        assert_eq!(
            addresses,
            vec!["alice@example.org", "ops@conference.example.org", "bob@example.org"]
        );
    }

    #[test]
    fn direct_and_group_with_same_address_differ() {
        assert_ne!(MessageTarget::direct("a@b"), MessageTarget::group("a@b"));
    }

    #[test]
    fn bare_strips_resource() {
        let t = MessageTarget::direct("bob@example.org/phone");
        assert_eq!(t.bare().address(), "bob@example.org");
    }

    proptest! {
        #[test]
        fn well_formed_direct_parses_to_itself(
            local in "[a-z][a-z0-9._-]{0,10}",
            domain in "[a-z]{1,10}\\.(org|com|net)",
            pad in "[ \t]{0,3}",
        ) {
            let raw = format!("{pad}{local}@{domain}{pad}");
            let target = resolver().parse(&raw).unwrap().unwrap();
            prop_assert!(!target.is_group());
            prop_assert_eq!(target.address(), raw.trim());
        }

        #[test]
        fn two_or_more_at_signs_always_fail(
            parts in prop::collection::vec("[a-z*]{0,6}", 3..6),
        ) {
            let raw = parts.join("@");
            prop_assert!(resolver().parse(&raw).is_err());
        }

        #[test]
        fn format_round_trips(
            star in any::<bool>(),
            local in "[a-z][a-z0-9]{0,8}",
            domain in prop::option::of("[a-z]{1,8}\\.(org|com)"),
        ) {
            let r = resolver();
            let mut raw = String::new();
            if star {
                raw.push(GROUP_PREFIX);
            }
            raw.push_str(&local);
            if let Some(domain) = domain {
                raw.push('@');
                raw.push_str(&domain);
            }
            let parsed = r.parse(&raw).unwrap().unwrap();
            let reparsed = r.parse(&r.format(&parsed)).unwrap().unwrap();
            prop_assert_eq!(&reparsed, &parsed);
            prop_assert_eq!(reparsed.address(), parsed.address());
        }
    }
}
