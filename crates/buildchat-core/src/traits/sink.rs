// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound delivery seam used by the notifier.

use async_trait::async_trait;

use crate::error::BuildchatError;
use crate::target::MessageTarget;

/// Anything that can deliver a text message to a target.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, target: &MessageTarget, text: &str) -> Result<(), BuildchatError>;
}
