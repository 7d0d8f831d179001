// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message bodies for each notification audience.

use buildchat_core::types::NotificationEvent;
use chrono::TimeDelta;

/// Banner placed above the summary of a build that fixed its job.
pub const FIXED_BANNER: &str = "Yippee, build fixed!";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Renders notification texts. Links fall back to `build_url_base` when an
/// event carries none.
#[derive(Debug, Clone, Default)]
pub struct MessageRenderer {
    build_url_base: Option<String>,
}

impl MessageRenderer {
    pub fn new(build_url_base: Option<String>) -> Self {
        Self { build_url_base }
    }

    /// Link to the build, if one is known.
    pub fn build_url(&self, event: &NotificationEvent) -> Option<String> {
        if let Some(url) = &event.url {
            return Some(url.clone());
        }
        self.build_url_base.as_ref().map(|base| {
            format!(
                "{}/job/{}/{}/",
                base.trim_end_matches('/'),
                event.project,
                event.build_number
            )
        })
    }

    fn with_link(&self, mut text: String, event: &NotificationEvent) -> String {
        if let Some(url) = self.build_url(event) {
            text.push_str(": ");
            text.push_str(&url);
        }
        text
    }

    /// Summary for general recipients, followed by the change set.
    pub fn general(&self, event: &NotificationEvent) -> String {
        let mut text = String::new();
        if event.is_fix {
            text.push_str(FIXED_BANNER);
            text.push('\n');
        }

        let result = event
            .result
            .map_or_else(|| "BUILDING".to_string(), |r| r.to_string());
        let summary = format!(
            "Project {} build #{}: {} at {}",
            event.project,
            event.build_number,
            result,
            event.timestamp.format(TIMESTAMP_FORMAT)
        );
        text.push_str(&self.with_link(summary, event));

        let bullet = if event.changes.len() > 1 { "* " } else { "" };
        for change in &event.changes {
            text.push('\n');
            text.push_str(bullet);
            text.push_str(&change.author);
            text.push_str(": ");
            text.push_str(&change.summary);
        }
        text
    }

    /// Sent to each author of a failing build.
    pub fn suspect(&self, event: &NotificationEvent) -> String {
        self.with_link(
            format!(
                "Oh no! You are suspected of breaking {} build #{}",
                event.project, event.build_number
            ),
            event,
        )
    }

    /// Sent to each author of a build that fixed its job.
    pub fn fixer(&self, event: &NotificationEvent) -> String {
        self.with_link(
            format!(
                "Yippee! You may have fixed {} build #{}",
                event.project, event.build_number
            ),
            event,
        )
    }

    /// Posted to rooms when a build starts.
    pub fn started(&self, event: &NotificationEvent) -> String {
        let mut text = format!(
            "Starting build {} for job {}",
            event.build_number, event.project
        );

        if let Some(previous) = &event.previous
            && !previous.result.is_success()
        {
            text.push_str(&format!(" (previous build: {}", previous.result));
            if let Some(since) = previous.failing_since {
                text.push_str(&format!(
                    ", not passing for {}",
                    humanize(event.timestamp - since)
                ));
            }
            text.push(')');
        }

        self.with_link(text, event)
    }
}

/// Coarse human-readable length of a time span: `2 days 3 hours`,
/// `45 minutes`. Spans under a minute read `less than a minute`.
pub fn humanize(span: TimeDelta) -> String {
    let minutes = span.num_minutes();
    if minutes < 1 {
        return "less than a minute".to_string();
    }

    let days = minutes / (24 * 60);
    let hours = (minutes / 60) % 24;
    let minutes = minutes % 60;

    let unit = |n: i64, name: &str| {
        if n == 1 {
            format!("1 {name}")
        } else {
            format!("{n} {name}s")
        }
    };

    // Two most significant non-zero units.
    [(days, "day"), (hours, "hour"), (minutes, "minute")]
        .into_iter()
        .skip_while(|(n, _)| *n == 0)
        .take(2)
        .filter(|(n, _)| *n > 0)
        .map(|(n, name)| unit(n, name))
        .collect::<Vec<_>>()
        .join(" ")
}
