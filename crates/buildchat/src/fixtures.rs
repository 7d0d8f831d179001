// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Build system backed by a TOML file, for `buildchat shell`.
//!
//! ```toml
//! [[job]]
//! name = "core"
//! last_build = { number = 41, result = "FAILURE" }
//! health = { score = 20, description = "Build stability: 4 of the last 5 failed" }
//! test_report = { build_number = 41, total = 120, failed = ["parser::empty_input"] }
//!
//! [views]
//! backend = ["core"]
//!
//! [[queue]]
//! job = "docs"
//! reason = "Waiting for next available executor"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use buildchat_core::types::{
    BuildResult, BuildSummary, HealthReport, JobSummary, QueueItem, TestReport,
};
use buildchat_core::{BuildSystem, BuildchatError};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureFile {
    #[serde(default, rename = "job")]
    jobs: Vec<JobFixture>,
    #[serde(default)]
    views: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    queue: Vec<QueueItem>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobFixture {
    name: String,
    #[serde(default)]
    last_build: Option<BuildSummary>,
    #[serde(default)]
    health: Option<HealthReport>,
    #[serde(default)]
    test_report: Option<TestReport>,
}

struct State {
    jobs: BTreeMap<String, JobSummary>,
    queue: Vec<QueueItem>,
}

pub struct FixtureBuildSystem {
    state: Mutex<State>,
    views: BTreeMap<String, Vec<String>>,
    reports: BTreeMap<String, TestReport>,
}

impl FixtureBuildSystem {
    /// Reads a fixture file.
    pub fn load(path: &Path) -> Result<Self, BuildchatError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BuildchatError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| BuildchatError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, BuildchatError> {
        let file: FixtureFile =
            toml::from_str(content).map_err(|e| BuildchatError::Config(e.to_string()))?;
        Ok(Self::from_file(file))
    }

    /// A small set of jobs so the shell is usable without a fixture file.
    pub fn demo() -> Self {
        let job = |name: &str, number: u32, result: BuildResult, score: u8| JobFixture {
            name: name.to_string(),
            last_build: Some(BuildSummary {
                number,
                result: Some(result),
                building: false,
                url: Some(format!("http://localhost:8080/job/{name}/{number}/")),
            }),
            health: Some(HealthReport {
                score,
                description: format!("Build stability: last build {result}"),
            }),
            test_report: None,
        };

        let mut core = job("core", 41, BuildResult::Failure, 20);
        core.test_report = Some(TestReport {
            build_number: 41,
            total: 120,
            failed: vec!["parser::rejects_empty_input".into()],
        });
        let mut api = job("api", 17, BuildResult::Success, 100);
        if let Some(build) = api.last_build.as_mut() {
            build.building = true;
        }

        Self::from_file(FixtureFile {
            jobs: vec![core, api, job("docs", 3, BuildResult::Success, 80)],
            views: BTreeMap::from([("backend".to_string(), vec!["core".into(), "api".into()])]),
            queue: Vec::new(),
        })
    }

    fn from_file(file: FixtureFile) -> Self {
        let mut jobs = BTreeMap::new();
        let mut reports = BTreeMap::new();
        for fixture in file.jobs {
            if let Some(report) = fixture.test_report {
                reports.insert(fixture.name.clone(), report);
            }
            jobs.insert(
                fixture.name.clone(),
                JobSummary {
                    in_queue: file.queue.iter().any(|q| q.job == fixture.name),
                    name: fixture.name,
                    last_build: fixture.last_build,
                    health: fixture.health,
                },
            );
        }

        Self {
            state: Mutex::new(State {
                jobs,
                queue: file.queue,
            }),
            views: file.views,
            reports,
        }
    }
}

#[async_trait]
impl BuildSystem for FixtureBuildSystem {
    async fn job(&self, name: &str) -> Result<Option<JobSummary>, BuildchatError> {
        Ok(self.state.lock().await.jobs.get(name).cloned())
    }

    async fn jobs(&self) -> Result<Vec<JobSummary>, BuildchatError> {
        Ok(self.state.lock().await.jobs.values().cloned().collect())
    }

    async fn view(&self, name: &str) -> Result<Option<Vec<JobSummary>>, BuildchatError> {
        let Some(members) = self.views.get(name) else {
            return Ok(None);
        };
        let state = self.state.lock().await;
        Ok(Some(
            members
                .iter()
                .filter_map(|m| state.jobs.get(m).cloned())
                .collect(),
        ))
    }

    async fn queue(&self) -> Result<Vec<QueueItem>, BuildchatError> {
        Ok(self.state.lock().await.queue.clone())
    }

    async fn schedule(
        &self,
        job: &str,
        delay: Duration,
        cause: &str,
    ) -> Result<bool, BuildchatError> {
        let mut state = self.state.lock().await;
        let Some(summary) = state.jobs.get_mut(job) else {
            return Err(BuildchatError::build_system(format!("no such job `{job}`")));
        };
        if summary.in_queue {
            return Ok(false);
        }
        summary.in_queue = true;

        let reason = if delay.is_zero() {
            cause.to_string()
        } else {
            format!("{cause} (quiet period {}s)", delay.as_secs())
        };
        state.queue.push(QueueItem {
            job: job.to_string(),
            reason,
        });
        info!(job, delay_secs = delay.as_secs(), "fixture build queued");
        Ok(true)
    }

    async fn abort(&self, job: &str) -> Result<Option<u32>, BuildchatError> {
        let mut state = self.state.lock().await;
        let Some(build) = state
            .jobs
            .get_mut(job)
            .and_then(|j| j.last_build.as_mut())
            .filter(|b| b.building)
        else {
            return Ok(None);
        };
        build.building = false;
        build.result = Some(BuildResult::Aborted);
        Ok(Some(build.number))
    }

    async fn latest_test_report(&self, job: &str) -> Result<Option<TestReport>, BuildchatError> {
        Ok(self.reports.get(job).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        [[job]]
        name = "core"
        last_build = { number = 41, result = "FAILURE", url = "http://ci/job/core/41/" }
        health = { score = 20, description = "Build stability: 4 of the last 5 failed" }
        test_report = { build_number = 41, total = 3, failed = ["a", "b"] }

        [[job]]
        name = "api"
        last_build = { number = 9, building = true }

        [[job]]
        name = "docs"

        [views]
        backend = ["core", "api", "gone"]

        [[queue]]
        job = "docs"
        reason = "Waiting for next available executor"
    "#;

    #[tokio::test]
    async fn fixture_file_describes_jobs_views_and_queue() {
        let build = FixtureBuildSystem::from_toml_str(FIXTURE).unwrap();

        let core = build.job("core").await.unwrap().unwrap();
        assert_eq!(core.last_build.unwrap().result, Some(BuildResult::Failure));
        assert_eq!(core.health.unwrap().score, 20);

        let backend = build.view("backend").await.unwrap().unwrap();
        let names: Vec<_> = backend.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, vec!["core", "api"]);
        assert!(build.view("frontend").await.unwrap().is_none());

        assert!(build.job("docs").await.unwrap().unwrap().in_queue);
        assert_eq!(build.latest_test_report("core").await.unwrap().unwrap().failed.len(), 2);
    }

    #[tokio::test]
    async fn scheduling_a_queued_job_is_refused() {
        let build = FixtureBuildSystem::from_toml_str(FIXTURE).unwrap();

        assert!(!build.schedule("docs", Duration::ZERO, "console").await.unwrap());
        assert!(build
            .schedule("core", Duration::from_secs(30), "console")
            .await
            .unwrap());
        let queue = build.queue().await.unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[1].reason, "console (quiet period 30s)");
        assert!(build.schedule("nope", Duration::ZERO, "console").await.is_err());
    }

    #[tokio::test]
    async fn abort_stops_only_running_builds() {
        let build = FixtureBuildSystem::from_toml_str(FIXTURE).unwrap();

        assert_eq!(build.abort("api").await.unwrap(), Some(9));
        assert_eq!(build.abort("api").await.unwrap(), None);
        assert_eq!(build.abort("core").await.unwrap(), None);
        let api = build.job("api").await.unwrap().unwrap();
        assert_eq!(api.last_build.unwrap().result, Some(BuildResult::Aborted));
    }

    #[test]
    fn unknown_fixture_keys_are_rejected() {
        let err = FixtureBuildSystem::from_toml_str("[[job]]\nname = \"x\"\ncolour = 1\n")
            .err()
            .unwrap();
        assert!(err.to_string().contains("colour"));
    }

    #[tokio::test]
    async fn demo_jobs_are_queryable() {
        let build = FixtureBuildSystem::demo();
        assert_eq!(build.jobs().await.unwrap().len(), 3);
        assert!(build.view("backend").await.unwrap().is_some());
    }
}
