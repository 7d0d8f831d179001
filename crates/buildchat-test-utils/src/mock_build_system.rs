// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory build system for bot command tests.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use buildchat_core::types::{
    BuildResult, BuildSummary, HealthReport, JobSummary, QueueItem, TestReport,
};
use buildchat_core::{BuildSystem, BuildchatError};

/// A build scheduled through [`BuildSystem::schedule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledBuild {
    pub job: String,
    pub delay: Duration,
    pub cause: String,
}

/// A build system backed by maps, configured with builder methods.
#[derive(Default)]
pub struct MockBuildSystem {
    jobs: Mutex<BTreeMap<String, JobSummary>>,
    views: BTreeMap<String, Vec<String>>,
    queue: Mutex<Vec<QueueItem>>,
    scheduled: Mutex<Vec<ScheduledBuild>>,
    running: Mutex<HashMap<String, u32>>,
    reports: HashMap<String, TestReport>,
    unavailable: bool,
}

impl MockBuildSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// A job whose last build finished with `result`.
    pub fn finished_job(name: &str, number: u32, result: BuildResult) -> JobSummary {
        JobSummary {
            name: name.to_string(),
            last_build: Some(BuildSummary {
                number,
                result: Some(result),
                building: false,
                url: Some(format!("https://ci.example.org/job/{name}/{number}/")),
            }),
            health: Some(HealthReport {
                score: if result.is_success() { 100 } else { 20 },
                description: format!("Build stability: {}", result),
            }),
            in_queue: false,
        }
    }

    /// A job that was never built.
    pub fn fresh_job(name: &str) -> JobSummary {
        JobSummary {
            name: name.to_string(),
            last_build: None,
            health: None,
            in_queue: false,
        }
    }

    pub fn with_job(mut self, job: JobSummary) -> Self {
        self.jobs.get_mut().insert(job.name.clone(), job);
        self
    }

    pub fn with_view(mut self, name: &str, jobs: &[&str]) -> Self {
        self.views
            .insert(name.to_string(), jobs.iter().map(|j| j.to_string()).collect());
        self
    }

    pub fn with_queued(mut self, job: &str, reason: &str) -> Self {
        self.queue.get_mut().push(QueueItem {
            job: job.to_string(),
            reason: reason.to_string(),
        });
        if let Some(summary) = self.jobs.get_mut().get_mut(job) {
            summary.in_queue = true;
        }
        self
    }

    pub fn with_running(mut self, job: &str, number: u32) -> Self {
        self.running.get_mut().insert(job.to_string(), number);
        self
    }

    pub fn with_test_report(mut self, job: &str, report: TestReport) -> Self {
        self.reports.insert(job.to_string(), report);
        self
    }

    /// Every query fails with a build-system error.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Builds scheduled so far.
    pub async fn scheduled(&self) -> Vec<ScheduledBuild> {
        self.scheduled.lock().await.clone()
    }

    fn check_available(&self) -> Result<(), BuildchatError> {
        if self.unavailable {
            Err(BuildchatError::build_system("build system unreachable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BuildSystem for MockBuildSystem {
    async fn job(&self, name: &str) -> Result<Option<JobSummary>, BuildchatError> {
        self.check_available()?;
        Ok(self.jobs.lock().await.get(name).cloned())
    }

    async fn jobs(&self) -> Result<Vec<JobSummary>, BuildchatError> {
        self.check_available()?;
        Ok(self.jobs.lock().await.values().cloned().collect())
    }

    async fn view(&self, name: &str) -> Result<Option<Vec<JobSummary>>, BuildchatError> {
        self.check_available()?;
        let Some(members) = self.views.get(name) else {
            return Ok(None);
        };
        let jobs = self.jobs.lock().await;
        Ok(Some(
            members.iter().filter_map(|m| jobs.get(m).cloned()).collect(),
        ))
    }

    async fn queue(&self) -> Result<Vec<QueueItem>, BuildchatError> {
        self.check_available()?;
        Ok(self.queue.lock().await.clone())
    }

    async fn schedule(
        &self,
        job: &str,
        delay: Duration,
        cause: &str,
    ) -> Result<bool, BuildchatError> {
        self.check_available()?;
        let mut jobs = self.jobs.lock().await;
        let Some(summary) = jobs.get_mut(job) else {
            return Err(BuildchatError::build_system(format!("no such job `{job}`")));
        };
        if summary.in_queue {
            return Ok(false);
        }
        summary.in_queue = true;
        self.queue.lock().await.push(QueueItem {
            job: job.to_string(),
            reason: cause.to_string(),
        });
        self.scheduled.lock().await.push(ScheduledBuild {
            job: job.to_string(),
            delay,
            cause: cause.to_string(),
        });
        Ok(true)
    }

    async fn abort(&self, job: &str) -> Result<Option<u32>, BuildchatError> {
        self.check_available()?;
        Ok(self.running.lock().await.remove(job))
    }

    async fn latest_test_report(&self, job: &str) -> Result<Option<TestReport>, BuildchatError> {
        self.check_available()?;
        Ok(self.reports.get(job).cloned())
    }
}
