// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query surface of the build system used by bot commands.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BuildchatError;
use crate::types::{JobSummary, QueueItem, TestReport};

/// Read-mostly view of the build system. Only `schedule` and `abort`
/// change anything.
#[async_trait]
pub trait BuildSystem: Send + Sync {
    /// Looks up a job by its full name.
    async fn job(&self, name: &str) -> Result<Option<JobSummary>, BuildchatError>;

    /// Lists every job.
    async fn jobs(&self) -> Result<Vec<JobSummary>, BuildchatError>;

    /// Lists the jobs of a named view, or `None` if the view does not exist.
    async fn view(&self, name: &str) -> Result<Option<Vec<JobSummary>>, BuildchatError>;

    /// Pending build queue with human-readable reasons.
    async fn queue(&self) -> Result<Vec<QueueItem>, BuildchatError>;

    /// Schedules a build after `delay`. Returns `false` if the job was
    /// already queued.
    async fn schedule(&self, job: &str, delay: Duration, cause: &str)
    -> Result<bool, BuildchatError>;

    /// Aborts the running build of `job`, returning its number, or `None`
    /// when nothing was running.
    async fn abort(&self, job: &str) -> Result<Option<u32>, BuildchatError>;

    /// Test report of the most recent build that has one.
    async fn latest_test_report(&self, job: &str) -> Result<Option<TestReport>, BuildchatError>;
}
