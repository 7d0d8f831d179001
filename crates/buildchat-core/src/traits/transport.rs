// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport capability abstracting the instant-messaging network.
//!
//! The wire protocol (stanzas, TLS, SASL) lives behind these traits. The
//! connection core only sees connections that can authenticate, send text,
//! join rooms, set presence and push inbound events onto a channel.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::BuildchatError;
use crate::target::MessageTarget;
use crate::types::{Presence, TransportEvent};

/// Account credentials presented during authentication.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
    pub resource: String,
}

/// Factory for physical connections to one IM server.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Returns the human-readable name of this transport.
    fn name(&self) -> &str;

    /// Opens a new physical connection. Inbound messages and connection
    /// loss for this connection are pushed onto `events`.
    async fn open(
        &self,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn Connection>, BuildchatError>;
}

/// One open physical connection.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Whether the underlying stream is still usable.
    fn is_connected(&self) -> bool;

    /// Authenticates the stream. `BuildchatError::Authentication` signals
    /// rejected credentials.
    async fn authenticate(&self, credentials: &Credentials) -> Result<(), BuildchatError>;

    /// Sends a text message to a user or a joined room.
    async fn send(&self, target: &MessageTarget, text: &str) -> Result<(), BuildchatError>;

    /// Joins a room under `nickname`.
    async fn join_group(
        &self,
        room: &str,
        nickname: &str,
        password: Option<&str>,
    ) -> Result<(), BuildchatError>;

    /// Leaves a previously joined room.
    async fn leave_group(&self, room: &str) -> Result<(), BuildchatError>;

    /// Broadcasts availability and a free-text status line.
    async fn set_presence(&self, presence: Presence, status: &str) -> Result<(), BuildchatError>;

    /// Closes the stream. Must be safe to call more than once.
    async fn disconnect(&self) -> Result<(), BuildchatError>;
}
