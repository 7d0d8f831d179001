// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use buildchat_core::types::JobSummary;
use buildchat_core::{BuildchatError, CommandError};
use rand::seq::SliceRandom;

use super::CommandContext;
use crate::parse::parse_delay;

const SNACK_REPLIES: &[&str] = &[
    "Yummy!",
    "Thank you!",
    "Nom nom nom.",
    "*munches happily*",
    "More please!",
];

fn build_system_error(e: BuildchatError) -> CommandError {
    CommandError::BuildSystem(e.to_string())
}

async fn require_job(ctx: &CommandContext<'_>, name: &str) -> Result<JobSummary, CommandError> {
    ctx.build
        .job(name)
        .await
        .map_err(build_system_error)?
        .ok_or_else(|| CommandError::UnknownJob(name.to_string()))
}

/// Jobs selected by `[<job>|-v <view>]`; all jobs when no argument.
async fn select_jobs(
    ctx: &CommandContext<'_>,
    args: &[String],
) -> Result<Vec<JobSummary>, CommandError> {
    match args {
        [_] => ctx.build.jobs().await.map_err(build_system_error),
        [_, flag, view] if flag == "-v" => ctx
            .build
            .view(view)
            .await
            .map_err(build_system_error)?
            .ok_or_else(|| CommandError::UnknownView(view.clone())),
        [_, flag] if flag == "-v" => Err(CommandError::Usage(format!(
            "{} -v <view>",
            args[0]
        ))),
        [_, job] => Ok(vec![require_job(ctx, job).await?]),
        _ => Err(CommandError::Usage(format!("{} [<job>|-v <view>]", args[0]))),
    }
}

pub(super) async fn build(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), CommandError> {
    let (job, delay) = match args {
        [_, job] => (job, Duration::ZERO),
        [_, job, delay] => (job, parse_delay(delay)?),
        _ => {
            return Err(CommandError::Usage(format!(
                "{} <job> [now|<delay>[s|m|h]]",
                args.first().map_or("build", String::as_str)
            )));
        }
    };

    let job = require_job(ctx, job).await?;
    let cause = format!("Started by {} via chat", ctx.sender);
    let scheduled = ctx
        .build
        .schedule(&job.name, delay, &cause)
        .await
        .map_err(build_system_error)?;

    let reply = if !scheduled {
        format!("{}: job {} is already in the build queue", ctx.sender, job.name)
    } else if delay.is_zero() {
        format!("{}: job {} build scheduled now", ctx.sender, job.name)
    } else {
        format!(
            "{}: job {} build scheduled with a quiet period of {} seconds",
            ctx.sender,
            job.name,
            delay.as_secs()
        )
    };
    ctx.reply(&reply).await
}

fn status_line(job: &JobSummary) -> String {
    let mut line = match &job.last_build {
        None => format!("{}: no builds", job.name),
        Some(build) if build.building => format!("{}: BUILDING (#{})", job.name, build.number),
        Some(build) => {
            let result = build
                .result
                .map_or_else(|| "UNKNOWN".to_string(), |r| r.to_string());
            let mut line = format!("{}: {} (#{})", job.name, result, build.number);
            if let Some(url) = &build.url {
                line.push(' ');
                line.push_str(url);
            }
            line
        }
    };
    if job.in_queue {
        line.push_str(" (in queue)");
    }
    line
}

fn health_line(job: &JobSummary) -> String {
    match &job.health {
        Some(health) => format!("{}: {}% {}", job.name, health.score, health.description),
        None => format!("{}: no health report", job.name),
    }
}

async fn reply_with_lines(
    ctx: &CommandContext<'_>,
    jobs: &[JobSummary],
    line: fn(&JobSummary) -> String,
) -> Result<(), CommandError> {
    if jobs.is_empty() {
        return ctx.reply("no job found").await;
    }
    let text = jobs.iter().map(line).collect::<Vec<_>>().join("\n");
    ctx.reply(&text).await
}

pub(super) async fn status(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), CommandError> {
    let jobs = select_jobs(ctx, args).await?;
    reply_with_lines(ctx, &jobs, status_line).await
}

pub(super) async fn health(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), CommandError> {
    let jobs = select_jobs(ctx, args).await?;
    reply_with_lines(ctx, &jobs, health_line).await
}

pub(super) async fn queue(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let items = ctx.build.queue().await.map_err(build_system_error)?;
    if items.is_empty() {
        return ctx.reply("Build queue is empty").await;
    }
    let mut text = String::from("Build queue:");
    for item in &items {
        text.push_str(&format!("\n- {}: {}", item.job, item.reason));
    }
    ctx.reply(&text).await
}

pub(super) async fn abort(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), CommandError> {
    let [_, job] = args else {
        return Err(CommandError::Usage("abort <job>".into()));
    };
    let job = require_job(ctx, job).await?;
    let reply = match ctx.build.abort(&job.name).await.map_err(build_system_error)? {
        Some(number) => format!("{}: aborted build #{} of {}", ctx.sender, number, job.name),
        None => format!("{}: {} is not building", ctx.sender, job.name),
    };
    ctx.reply(&reply).await
}

pub(super) async fn test_result(
    ctx: &CommandContext<'_>,
    args: &[String],
) -> Result<(), CommandError> {
    let [_, job] = args else {
        return Err(CommandError::Usage("testresult <job>".into()));
    };
    let job = require_job(ctx, job).await?;
    let report = ctx
        .build
        .latest_test_report(&job.name)
        .await
        .map_err(build_system_error)?;

    let text = match report {
        None => format!("{}: no test report", job.name),
        Some(report) if report.failed.is_empty() => format!(
            "{} #{}: all {} tests passed",
            job.name, report.build_number, report.total
        ),
        Some(report) => {
            let mut text = format!(
                "{} #{}: {} of {} tests failed:",
                job.name,
                report.build_number,
                report.failed.len(),
                report.total
            );
            for name in &report.failed {
                text.push_str("\n- ");
                text.push_str(name);
            }
            text
        }
    };
    ctx.reply(&text).await
}

pub(super) async fn botsnack(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let reply = SNACK_REPLIES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Thanks!");
    ctx.reply(reply).await
}
