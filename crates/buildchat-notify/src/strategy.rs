// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Policies deciding whether a completed build is announced at all.

use buildchat_config::model::StrategyName;
use buildchat_core::types::NotificationEvent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotificationStrategy {
    /// Every completed build.
    #[default]
    Always,
    /// The first build, or a result different from the previous build's.
    OnStateChange,
    /// Every non-successful build.
    OnAnyFailure,
    /// Every non-successful build and the build that fixed the job.
    FailureAndFixed,
}

impl NotificationStrategy {
    /// Pure predicate over the event and its predecessor.
    pub fn notification_wanted(self, event: &NotificationEvent) -> bool {
        match self {
            Self::Always => true,
            Self::OnStateChange => match &event.previous {
                None => true,
                Some(previous) => event.result != Some(previous.result),
            },
            Self::OnAnyFailure => event.is_failure(),
            Self::FailureAndFixed => event.is_failure() || event.is_fix,
        }
    }
}

impl From<StrategyName> for NotificationStrategy {
    fn from(name: StrategyName) -> Self {
        match name {
            StrategyName::All => Self::Always,
            StrategyName::Change => Self::OnStateChange,
            StrategyName::Failure => Self::OnAnyFailure,
            StrategyName::FailureAndFixed => Self::FailureAndFixed,
        }
    }
}
