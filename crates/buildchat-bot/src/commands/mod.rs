// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The closed set of bot commands and the name table that selects them.
//!
//! Adding a command means adding a [`CommandKind`] variant, its names and
//! usage line, and a match arm in [`CommandKind::execute`].

mod handlers;

use std::collections::HashMap;
use std::sync::OnceLock;

use buildchat_core::{BuildSystem, CommandError, InboundMessage};
use buildchat_im::ChatSession;
use strum::{Display, EnumIter, IntoEnumIterator};

/// Everything a command handler may touch.
pub struct CommandContext<'a> {
    pub session: &'a ChatSession,
    pub message: &'a InboundMessage,
    /// Nickname of the user who sent the command.
    pub sender: &'a str,
    pub build: &'a dyn BuildSystem,
    pub table: &'a CommandTable,
}

impl CommandContext<'_> {
    /// Replies in the chat the command came from.
    pub async fn reply(&self, text: &str) -> Result<(), CommandError> {
        self.session
            .send(text)
            .await
            .map_err(|e| CommandError::Reply(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CommandKind {
    Build,
    Status,
    Health,
    Queue,
    Abort,
    TestResult,
    Botsnack,
    Help,
}

impl CommandKind {
    /// Names this command answers to. The first is the canonical one.
    pub fn names(self) -> &'static [&'static str] {
        match self {
            Self::Build => &["build", "schedule"],
            Self::Status => &["status", "s", "jobs"],
            Self::Health => &["health", "h"],
            Self::Queue => &["queue", "q"],
            Self::Abort => &["abort"],
            Self::TestResult => &["testresult", "tr"],
            Self::Botsnack => &["botsnack"],
            Self::Help => &["help", "?"],
        }
    }

    /// One-line usage, without names.
    pub fn usage(self) -> &'static str {
        match self {
            Self::Build => "<job> [now|<delay>[s|m|h]] - schedule a build",
            Self::Status => "[<job>|-v <view>] - show the status of jobs",
            Self::Health => "[<job>|-v <view>] - show the health of jobs",
            Self::Queue => "- show the build queue",
            Self::Abort => "<job> - abort the running build of a job",
            Self::TestResult => "<job> - show failed tests of the last build",
            Self::Botsnack => "- feed the bot",
            Self::Help => "- show this help",
        }
    }

    /// Runs the command. `args[0]` is the name it was invoked by.
    pub async fn execute(
        self,
        ctx: &CommandContext<'_>,
        args: &[String],
    ) -> Result<(), CommandError> {
        match self {
            Self::Build => handlers::build(ctx, args).await,
            Self::Status => handlers::status(ctx, args).await,
            Self::Health => handlers::health(ctx, args).await,
            Self::Queue => handlers::queue(ctx).await,
            Self::Abort => handlers::abort(ctx, args).await,
            Self::TestResult => handlers::test_result(ctx, args).await,
            Self::Botsnack => handlers::botsnack(ctx).await,
            Self::Help => ctx.reply(ctx.table.help_text()).await,
        }
    }
}

/// Immutable name-to-command map, built once.
pub struct CommandTable {
    by_name: HashMap<&'static str, CommandKind>,
    help: OnceLock<String>,
}

impl CommandTable {
    pub fn new() -> Self {
        let by_name = CommandKind::iter()
            .flat_map(|kind| kind.names().iter().map(move |name| (*name, kind)))
            .collect();
        Self {
            by_name,
            help: OnceLock::new(),
        }
    }

    /// Looks up a command by any of its names, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<CommandKind> {
        self.by_name.get(name.to_lowercase().as_str()).copied()
    }

    /// Help text listing every command except `help` itself. Built on
    /// first use.
    pub fn help_text(&self) -> &str {
        self.help.get_or_init(|| {
            let mut text = String::from("Available commands:");
            for kind in CommandKind::iter().filter(|k| *k != CommandKind::Help) {
                text.push('\n');
                text.push_str(&kind.names().join(", "));
                text.push(' ');
                text.push_str(kind.usage());
            }
            text
        })
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}
