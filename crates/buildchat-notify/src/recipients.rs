// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping build-system user ids to chat addresses.

use std::collections::BTreeMap;

use buildchat_config::model::NotifyConfig;
use buildchat_core::{MessageTarget, TargetResolver};
use tracing::{debug, warn};

/// Resolves change authors to the targets suspects and fixers are told on.
#[derive(Debug, Clone)]
pub struct AuthorDirectory {
    explicit: BTreeMap<String, String>,
    default_suffix: Option<String>,
    resolver: TargetResolver,
}

impl AuthorDirectory {
    pub fn new(
        explicit: BTreeMap<String, String>,
        default_suffix: Option<&str>,
        resolver: TargetResolver,
    ) -> Self {
        let default_suffix = default_suffix
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.starts_with('@') {
                    s.to_string()
                } else {
                    format!("@{s}")
                }
            });
        Self {
            explicit,
            default_suffix,
            resolver,
        }
    }

    pub fn from_config(notify: &NotifyConfig, resolver: TargetResolver) -> Self {
        Self::new(
            notify.user_addresses.clone(),
            notify.default_author_suffix.as_deref(),
            resolver,
        )
    }

    /// Address for one author: the configured one, else the author id plus
    /// the default suffix. `None` when neither applies or the result does
    /// not parse.
    pub fn resolve(&self, author: &str) -> Option<MessageTarget> {
        let raw = match (self.explicit.get(author), &self.default_suffix) {
            (Some(address), _) => address.clone(),
            (None, Some(suffix)) => format!("{author}{suffix}"),
            (None, None) => {
                debug!(author, "no chat address known for author");
                return None;
            }
        };

        match self.resolver.parse(&raw) {
            Ok(target) => target,
            Err(e) => {
                warn!(author, error = %e, "author address does not resolve");
                None
            }
        }
    }

    /// Resolves every author, dropping duplicates while keeping order.
    pub fn resolve_all<'a>(&self, authors: impl IntoIterator<Item = &'a str>) -> Vec<MessageTarget> {
        let mut targets: Vec<MessageTarget> = Vec::new();
        for target in authors.into_iter().filter_map(|a| self.resolve(a)) {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory(suffix: Option<&str>) -> AuthorDirectory {
        let mut explicit = BTreeMap::new();
        explicit.insert("alice".to_string(), "alice.smith@chat.example.org".to_string());
        explicit.insert("al".to_string(), "Alice.Smith@chat.example.org".to_string());
        AuthorDirectory::new(explicit, suffix, TargetResolver::new())
    }

    #[test]
    fn explicit_address_wins_over_suffix() {
        let target = directory(Some("example.org")).resolve("alice").unwrap();
        assert_eq!(target.address(), "alice.smith@chat.example.org");
    }

    #[test]
    fn suffix_synthesizes_address() {
        let target = directory(Some("example.org")).resolve("bob").unwrap();
        assert_eq!(target, MessageTarget::direct("bob@example.org"));
    }

    #[test]
    fn unknown_author_without_suffix_is_skipped() {
        assert!(directory(None).resolve("bob").is_none());
    }

    #[test]
    fn duplicates_collapse() {
        let targets = directory(Some("@example.org")).resolve_all(["alice", "bob", "al", "bob", "carol"]);
        let addresses: Vec<&str> = targets.iter().map(MessageTarget::address).collect();
        assert_eq!(
            addresses,
            vec!["alice.smith@chat.example.org", "bob@example.org", "carol@example.org"]
        );
    }

    #[test]
    fn unparseable_address_is_skipped() {
        let mut explicit = BTreeMap::new();
        explicit.insert("eve".to_string(), "eve@@example.org".to_string());
        let dir = AuthorDirectory::new(explicit, None, TargetResolver::new());
        assert!(dir.resolve("eve").is_none());
    }
}
