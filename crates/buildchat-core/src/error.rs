// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the buildchat messaging core.

use std::time::Duration;

use thiserror::Error;

/// Boxed error source carried by transport and build-system failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across the connection core, the command bot
/// and the notification dispatcher.
#[derive(Debug, Error)]
pub enum BuildchatError {
    /// A human-entered recipient string could not be parsed into a target.
    #[error("invalid target `{target}`: {reason}")]
    InvalidTarget { target: String, reason: String },

    /// No physical connection exists and none could be obtained.
    #[error("connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// Joining a room or opening a direct chat failed for one target.
    #[error("failed to create chat session for `{target}`: {source}")]
    SessionCreation {
        target: String,
        source: Box<BuildchatError>,
    },

    /// A bot command handler failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Transient transport failure (network error, stream closed, send rejected).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<BoxError>,
    },

    /// The server rejected the configured credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Fatal misconfiguration; never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// The connection lock or a transport call did not complete in time.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The connection manager was closed by its owner.
    #[error("connection manager is closed")]
    Closed,

    /// The build-system collaborator failed to answer a query.
    #[error("build system error: {message}")]
    BuildSystem {
        message: String,
        source: Option<BoxError>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BuildchatError {
    /// Shorthand for a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a build-system error without an underlying source.
    pub fn build_system(message: impl Into<String>) -> Self {
        Self::BuildSystem {
            message: message.into(),
            source: None,
        }
    }

    /// Returns `true` for failures that are expected to clear up on their own
    /// and should drive reconnection rather than be reported as fatal.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. }
            | Self::Authentication(_)
            | Self::Timeout { .. }
            | Self::ConnectionUnavailable(_) => true,
            Self::SessionCreation { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

/// Failure of a single bot command. Caught at the dispatch boundary and
/// never propagated to the transport layer.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The named job does not exist in the build system.
    #[error("unknown job `{0}`")]
    UnknownJob(String),

    /// The named view does not exist in the build system.
    #[error("unknown view `{0}`")]
    UnknownView(String),

    /// The command was invoked with malformed arguments.
    #[error("usage: {0}")]
    Usage(String),

    /// The build system failed while executing the command.
    #[error("build system failure: {0}")]
    BuildSystem(String),

    /// The reply could not be delivered back into the chat.
    #[error("failed to deliver reply: {0}")]
    Reply(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(BuildchatError::transport("reset by peer").is_transient());
        assert!(BuildchatError::Authentication("bad password".into()).is_transient());
        assert!(
            BuildchatError::Timeout {
                duration: Duration::from_secs(5)
            }
            .is_transient()
        );
        assert!(!BuildchatError::Config("no server".into()).is_transient());
        assert!(!BuildchatError::Closed.is_transient());
    }

    #[test]
    fn session_creation_inherits_transience_from_source() {
        let transient = BuildchatError::SessionCreation {
            target: "ops@conference.example.org".into(),
            source: Box::new(BuildchatError::transport("stream closed")),
        };
        assert!(transient.is_transient());

        let fatal = BuildchatError::SessionCreation {
            target: "ops@conference.example.org".into(),
            source: Box::new(BuildchatError::Config("room does not exist".into())),
        };
        assert!(!fatal.is_transient());
    }

    #[test]
    fn command_error_converts_into_buildchat_error() {
        let err: BuildchatError = CommandError::UnknownJob("foo".into()).into();
        assert_eq!(err.to_string(), "unknown job `foo`");
    }

    #[test]
    fn invalid_target_names_offending_string() {
        let err = BuildchatError::InvalidTarget {
            target: "a@b@c".into(),
            reason: "more than one `@`".into(),
        };
        assert!(err.to_string().contains("a@b@c"));
    }
}
