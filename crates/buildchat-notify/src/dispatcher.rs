// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out of rendered build notifications to chat targets.
//!
//! [`NotificationDispatcher::notify`] never fails: an unreachable recipient
//! costs one log line and a tick in [`NotifyReport::failed`], and delivery
//! to the remaining recipients carries on.

use std::sync::Arc;

use buildchat_config::model::BuildchatConfig;
use buildchat_core::types::{EventKind, NotificationEvent};
use buildchat_core::{MessageSink, MessageTarget, TargetResolver};
use tracing::{debug, info, warn};

use crate::recipients::AuthorDirectory;
use crate::render::MessageRenderer;
use crate::strategy::NotificationStrategy;

/// Per-job notification switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyOptions {
    pub strategy: NotificationStrategy,
    pub notify_suspects: bool,
    pub notify_fixers: bool,
    pub notify_on_start: bool,
}

impl NotifyOptions {
    pub fn from_config(config: &BuildchatConfig) -> Self {
        let notify = &config.notify;
        Self {
            strategy: notify.strategy.into(),
            notify_suspects: notify.notify_suspects,
            notify_fixers: notify.notify_fixers,
            notify_on_start: notify.notify_on_start,
        }
    }
}

/// Outcome of one `notify` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Whether the event passed the strategy (start events: whether start
    /// notices are enabled).
    pub wanted: bool,
    pub delivered: usize,
    /// Recipients that did not resolve or whose send failed.
    pub failed: usize,
}

pub struct NotificationDispatcher {
    sink: Arc<dyn MessageSink>,
    resolver: TargetResolver,
    authors: AuthorDirectory,
    renderer: MessageRenderer,
}

impl NotificationDispatcher {
    pub fn new(
        sink: Arc<dyn MessageSink>,
        resolver: TargetResolver,
        authors: AuthorDirectory,
        renderer: MessageRenderer,
    ) -> Self {
        Self {
            sink,
            resolver,
            authors,
            renderer,
        }
    }

    pub fn from_config(sink: Arc<dyn MessageSink>, config: &BuildchatConfig) -> Self {
        let resolver = config.target_resolver();
        let authors = AuthorDirectory::from_config(&config.notify, resolver.clone());
        let renderer = MessageRenderer::new(config.notify.build_url_base.clone());
        Self::new(sink, resolver, authors, renderer)
    }

    /// Announces `event` to the whitespace-separated `recipients` and,
    /// when enabled, to the authors of its changes.
    pub async fn notify(
        &self,
        event: &NotificationEvent,
        recipients: &str,
        options: &NotifyOptions,
    ) -> NotifyReport {
        let mut report = NotifyReport::default();

        match event.kind {
            EventKind::Started => {
                if !options.notify_on_start {
                    return report;
                }
                report.wanted = true;
                let rooms: Vec<MessageTarget> = self
                    .resolve_recipients(recipients, &mut report)
                    .into_iter()
                    .filter(MessageTarget::is_group)
                    .collect();
                let text = self.renderer.started(event);
                self.fan_out(&rooms, &text, &mut report).await;
            }
            EventKind::Completed => {
                if !options.strategy.notification_wanted(event) {
                    debug!(
                        project = %event.project,
                        build = event.build_number,
                        strategy = ?options.strategy,
                        "notification not wanted"
                    );
                    return report;
                }
                report.wanted = true;

                let targets = self.resolve_recipients(recipients, &mut report);
                let text = self.renderer.general(event);
                self.fan_out(&targets, &text, &mut report).await;

                if options.notify_suspects && event.is_failure() {
                    let suspects = self.authors.resolve_all(event.change_authors());
                    let text = self.renderer.suspect(event);
                    self.fan_out(&suspects, &text, &mut report).await;
                }

                if options.notify_fixers && event.is_fix {
                    let fixers = self.authors.resolve_all(event.change_authors());
                    let text = self.renderer.fixer(event);
                    self.fan_out(&fixers, &text, &mut report).await;
                }
            }
        }

        info!(
            project = %event.project,
            build = event.build_number,
            delivered = report.delivered,
            failed = report.failed,
            "build notification sent"
        );
        report
    }

    /// Parses each recipient on its own so one bad entry does not hide
    /// the others.
    fn resolve_recipients(&self, raw: &str, report: &mut NotifyReport) -> Vec<MessageTarget> {
        let mut targets: Vec<MessageTarget> = Vec::new();
        for token in raw.split_whitespace() {
            match self.resolver.parse(token) {
                Ok(Some(target)) if !targets.contains(&target) => targets.push(target),
                Ok(_) => {}
                Err(e) => {
                    warn!(recipient = token, error = %e, "skipping unresolvable recipient");
                    report.failed += 1;
                }
            }
        }
        targets
    }

    async fn fan_out(&self, targets: &[MessageTarget], text: &str, report: &mut NotifyReport) {
        for target in targets {
            match self.sink.send(target, text).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(target = %target, error = %e, "failed to deliver build notification");
                    report.failed += 1;
                }
            }
        }
    }
}
