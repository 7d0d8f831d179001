// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! IM connection core for buildchat.
//!
//! [`ConnectionManager`] owns the one physical connection to the IM server,
//! reconnects it in the background with exponential backoff, and routes
//! inbound messages to per-chat listeners through a [`ChatSessionCache`].

pub mod backoff;
pub mod manager;
pub mod session;

pub use backoff::ReconnectBackoff;
pub use manager::{ConnectionManager, ManagerSettings};
pub use session::{ChatSession, ChatSessionCache, ListenerFactory, SessionListener};
