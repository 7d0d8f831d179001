// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for buildchat.
//!
//! This crate provides the error taxonomy, the message-target model and its
//! resolver, the build-event types, and the capability traits (transport,
//! build system, message sink) that the connection core, the command bot
//! and the notifier are written against.

pub mod error;
pub mod target;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{BuildchatError, CommandError};
pub use target::{MessageTarget, RoomSettings, TargetResolver};
pub use types::{ConnectionState, InboundMessage, Presence, TransportEvent};

pub use traits::{BuildSystem, Connection, Credentials, MessageSink, Transport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_capability_traits_are_exported() {
        // Compile-time check that the trait objects used across the
        // workspace stay object safe.
        fn _assert_transport(_: &dyn Transport) {}
        fn _assert_connection(_: &dyn Connection) {}
        fn _assert_build_system(_: &dyn BuildSystem) {}
        fn _assert_sink(_: &dyn MessageSink) {}
    }

    #[test]
    fn connection_state_defaults_to_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Failed.to_string(), "Failed");
    }

    #[test]
    fn inbound_message_replay_marker() {
        let msg = InboundMessage::new(MessageTarget::direct("a@b"), "a@b/res", "hi");
        assert!(!msg.delayed);
        assert!(msg.replayed().delayed);
    }
}
