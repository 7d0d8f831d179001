// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the connection core, the bot and the notifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::target::MessageTarget;

/// Coarse availability broadcast to the IM network.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    #[default]
    Available,
    Occupied,
    DoNotDisturb,
    Unavailable,
}

/// Lifecycle state of the single physical connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Last attempt failed; a retry is scheduled. Not terminal.
    Failed,
}

/// A chat message delivered by the transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// The conversation the message arrived in: the room for group chats,
    /// the peer for direct chats.
    pub chat: MessageTarget,
    /// Full sender address (`room@domain/nick` or `user@domain/resource`).
    pub from: String,
    /// Message text.
    pub body: String,
    /// Set when the message is replayed history (delayed-delivery marker).
    pub delayed: bool,
    /// When the transport received the message.
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Builds a live (non-replayed) message received now.
    pub fn new(chat: MessageTarget, from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            chat,
            from: from.into(),
            body: body.into(),
            delayed: false,
            received_at: Utc::now(),
        }
    }

    /// Marks this message as replayed history.
    pub fn replayed(mut self) -> Self {
        self.delayed = true;
        self
    }
}

/// Events pushed by a connection onto the inbound channel.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// An inbound chat message.
    Message(InboundMessage),
    /// The transport noticed the physical connection dropped.
    ConnectionLost { reason: String },
}

// --- Build-system types ---

/// Outcome of a finished build.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl BuildResult {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Point in a build's life at which an event was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Started,
    Completed,
}

/// One change-set entry of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Build-system user id of the author.
    pub author: String,
    /// First line of the commit message.
    pub summary: String,
}

/// The build immediately preceding the one an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousBuild {
    pub number: u32,
    pub result: BuildResult,
    /// Start of the current non-passing streak, when the previous build
    /// did not succeed.
    #[serde(default)]
    pub failing_since: Option<DateTime<Utc>>,
}

/// A build-system event handed to the notifier. Read-only to this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub project: String,
    pub build_number: u32,
    /// `None` while the build is still running.
    #[serde(default)]
    pub result: Option<BuildResult>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub changes: Vec<Change>,
    /// The build succeeded after one or more non-passing builds.
    #[serde(default)]
    pub is_fix: bool,
    #[serde(default)]
    pub previous: Option<PreviousBuild>,
}

impl NotificationEvent {
    /// Distinct change authors in first-seen order.
    pub fn change_authors(&self) -> Vec<&str> {
        let mut authors: Vec<&str> = Vec::new();
        for change in &self.changes {
            if !authors.contains(&change.author.as_str()) {
                authors.push(&change.author);
            }
        }
        authors
    }

    pub fn is_failure(&self) -> bool {
        self.result.is_some_and(|r| !r.is_success())
    }
}

/// Health score of a job as reported by the build system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// 0 (broken) to 100 (healthy).
    pub score: u8,
    pub description: String,
}

/// Summary of one build of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub number: u32,
    #[serde(default)]
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub building: bool,
    #[serde(default)]
    pub url: Option<String>,
}

/// A job as seen by the bot's query commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub name: String,
    #[serde(default)]
    pub last_build: Option<BuildSummary>,
    #[serde(default)]
    pub health: Option<HealthReport>,
    #[serde(default)]
    pub in_queue: bool,
}

/// One pending entry of the build queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub job: String,
    /// Human-readable reason the item is waiting.
    pub reason: String,
}

/// Test results of the most recent build that has a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    pub build_number: u32,
    pub total: u32,
    #[serde(default)]
    pub failed: Vec<String>,
}
