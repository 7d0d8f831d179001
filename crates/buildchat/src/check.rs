// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `buildchat check` command implementation.
//!
//! Configuration has already passed validation when this runs; the command
//! prints what the settings resolve to so an operator can see which rooms
//! will be joined and who will be told about builds.

use std::io::IsTerminal;

use buildchat_config::model::BuildchatConfig;
use buildchat_core::BuildchatError;
use buildchat_im::ManagerSettings;
use buildchat_notify::{NotificationStrategy, NotifyOptions};
use colored::Colorize;

/// One resolved setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckLine {
    pub name: &'static str,
    pub value: String,
}

/// Resolves the settings worth showing. Fails only when the initial group
/// list does not resolve, which validation already rules out.
pub fn summarize(config: &BuildchatConfig) -> Result<Vec<CheckLine>, BuildchatError> {
    let settings = ManagerSettings::from_config(&config.im)?;
    let resolver = config.target_resolver();
    let options = NotifyOptions::from_config(config);

    let groups = if settings.initial_groups.is_empty() {
        "(none)".to_string()
    } else {
        settings
            .initial_groups
            .iter()
            .map(|g| resolver.format(g))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let backoff = match settings.reconnect_max {
        Some(max) => format!(
            "grace {}s, unit {}s, max {}s",
            settings.reconnect_grace.as_secs(),
            settings.reconnect_unit.as_secs(),
            max.as_secs()
        ),
        None => format!(
            "grace {}s, unit {}s, unbounded",
            settings.reconnect_grace.as_secs(),
            settings.reconnect_unit.as_secs()
        ),
    };

    let mut audiences = Vec::new();
    if options.notify_suspects {
        audiences.push("suspects");
    }
    if options.notify_fixers {
        audiences.push("fixers");
    }
    if options.notify_on_start {
        audiences.push("build start");
    }

    Ok(vec![
        CheckLine {
            name: "server",
            value: format!("{}:{}", config.im.server, config.im.port),
        },
        CheckLine {
            name: "account",
            value: format!(
                "{}/{} as {}",
                settings.credentials.username, settings.credentials.resource, settings.nickname
            ),
        },
        CheckLine {
            name: "initial groups",
            value: groups,
        },
        CheckLine {
            name: "command prefix",
            value: config.im.command_prefix.clone(),
        },
        CheckLine {
            name: "reconnect",
            value: backoff,
        },
        CheckLine {
            name: "strategy",
            value: strategy_label(options.strategy).to_string(),
        },
        CheckLine {
            name: "also notify",
            value: if audiences.is_empty() {
                "(nobody)".to_string()
            } else {
                audiences.join(", ")
            },
        },
    ])
}

fn strategy_label(strategy: NotificationStrategy) -> &'static str {
    match strategy {
        NotificationStrategy::Always => "every build",
        NotificationStrategy::OnStateChange => "result changes",
        NotificationStrategy::OnAnyFailure => "failures",
        NotificationStrategy::FailureAndFixed => "failures and fixes",
    }
}

/// Run the `buildchat check` command.
pub fn run_check(config: &BuildchatConfig, plain: bool) -> Result<(), BuildchatError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let lines = summarize(config)?;

    println!();
    println!("  buildchat check");
    println!("  {}", "-".repeat(50));
    for line in &lines {
        if use_color {
            println!("    {} {:<16} {}", "✓".green(), line.name, line.value);
        } else {
            println!("    [OK] {:<16} {}", line.name, line.value);
        }
    }
    println!();
    if use_color {
        println!("  {}", "configuration is valid".green());
    } else {
        println!("  configuration is valid");
    }
    Ok(())
}
