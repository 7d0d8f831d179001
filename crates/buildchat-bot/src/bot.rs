// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The command bot attached to each chat session that accepts commands.

use std::sync::Arc;

use async_trait::async_trait;
use buildchat_config::model::ImConfig;
use buildchat_core::{BuildSystem, CommandError, InboundMessage};
use buildchat_im::{ChatSession, ListenerFactory, SessionListener};
use tracing::{debug, info, warn};

use crate::commands::{CommandContext, CommandKind, CommandTable};
use crate::parse::{extract_payload, tokenize};

/// How the bot recognizes commands.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub command_prefix: String,
    pub nickname: String,
}

impl BotSettings {
    pub fn from_config(im: &ImConfig) -> Self {
        Self {
            command_prefix: im.command_prefix.clone(),
            nickname: im.nickname.clone(),
        }
    }
}

/// What the bot did with one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Replayed history, the bot's own message, or ordinary chatter.
    Ignored,
    /// A known command ran (successfully or not).
    Executed(CommandKind),
    /// The first token named no command.
    Unknown(String),
}

/// Command dispatcher bound to one chat session.
pub struct CommandBot {
    session: ChatSession,
    settings: Arc<BotSettings>,
    table: Arc<CommandTable>,
    build: Arc<dyn BuildSystem>,
}

impl CommandBot {
    pub fn new(
        session: ChatSession,
        settings: Arc<BotSettings>,
        table: Arc<CommandTable>,
        build: Arc<dyn BuildSystem>,
    ) -> Self {
        Self {
            session,
            settings,
            table,
            build,
        }
    }

    /// Parses and runs a command carried by `message`.
    ///
    /// Command failures are answered in the chat where useful and logged;
    /// they never escape this method.
    pub async fn handle(&self, message: &InboundMessage) -> Dispatch {
        if message.delayed {
            return Dispatch::Ignored;
        }

        let sender = sender_nickname(message);
        if message.chat.is_group() && sender == self.settings.nickname {
            return Dispatch::Ignored;
        }

        let Some(payload) = extract_payload(
            &message.body,
            &self.settings.command_prefix,
            &self.settings.nickname,
        ) else {
            return Dispatch::Ignored;
        };

        let args = tokenize(payload);
        let Some(name) = args.first() else {
            return Dispatch::Ignored;
        };

        let Some(kind) = self.table.lookup(name) else {
            debug!(chat = %message.chat, command = %name, "unknown command");
            let reply = format!(
                "{sender}: did you mean me? Unknown command '{name}'. Use '{}help' to get help!",
                self.settings.command_prefix
            );
            if let Err(e) = self.session.send(&reply).await {
                warn!(chat = %message.chat, error = %e, "failed to answer unknown command");
            }
            return Dispatch::Unknown(name.clone());
        };

        info!(chat = %message.chat, sender, command = %kind, "executing command");
        let ctx = CommandContext {
            session: &self.session,
            message,
            sender,
            build: self.build.as_ref(),
            table: &self.table,
        };

        if let Err(e) = kind.execute(&ctx, &args).await {
            self.report_failure(&ctx, kind, e).await;
        }
        Dispatch::Executed(kind)
    }

    async fn report_failure(&self, ctx: &CommandContext<'_>, kind: CommandKind, err: CommandError) {
        warn!(chat = %ctx.message.chat, command = %kind, error = %err, "command failed");
        let reply = match &err {
            CommandError::UnknownJob(_) | CommandError::UnknownView(_) | CommandError::Usage(_) => {
                format!("{}: {err}", ctx.sender)
            }
            CommandError::BuildSystem(_) => {
                format!("{}: sorry, the build system did not answer", ctx.sender)
            }
            CommandError::Reply(_) => return,
        };
        if let Err(e) = ctx.reply(&reply).await {
            warn!(chat = %ctx.message.chat, error = %e, "failed to report command failure");
        }
    }
}

#[async_trait]
impl SessionListener for CommandBot {
    async fn on_message(&self, message: &InboundMessage) {
        self.handle(message).await;
    }
}

/// Nickname of whoever sent `message`: the resource of a room occupant
/// address, or the local part of a user address.
pub fn sender_nickname(message: &InboundMessage) -> &str {
    let from = message.from.as_str();
    if message.chat.is_group() {
        from.split_once('/').map_or(from, |(_, nick)| nick)
    } else {
        from.split_once('@').map_or(from, |(local, _)| local)
    }
}

/// Attaches a [`CommandBot`] to every session that accepts commands.
pub struct CommandBotFactory {
    settings: Arc<BotSettings>,
    table: Arc<CommandTable>,
    build: Arc<dyn BuildSystem>,
}

impl CommandBotFactory {
    pub fn new(settings: BotSettings, build: Arc<dyn BuildSystem>) -> Self {
        Self {
            settings: Arc::new(settings),
            table: Arc::new(CommandTable::new()),
            build,
        }
    }
}

impl ListenerFactory for CommandBotFactory {
    fn create(&self, session: &ChatSession) -> Arc<dyn SessionListener> {
        Arc::new(CommandBot::new(
            session.clone(),
            Arc::clone(&self.settings),
            Arc::clone(&self.table),
            Arc::clone(&self.build),
        ))
    }
}
