// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `buildchat shell` command implementation.
//!
//! Runs the connection manager, session cache and command bot against the
//! console transport, so commands can be tried without an IM server. Lines
//! starting with `/` drive the shell itself; everything else is a chat
//! message to the bot.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use buildchat_bot::{BotSettings, CommandBotFactory};
use buildchat_config::model::BuildchatConfig;
use buildchat_core::types::NotificationEvent;
use buildchat_core::{BuildSystem, BuildchatError, Presence, Transport};
use buildchat_im::{ConnectionManager, ManagerSettings};
use buildchat_notify::{NotificationDispatcher, NotifyOptions};
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

use crate::console::ConsoleTransport;
use crate::fixtures::FixtureBuildSystem;

/// How long to wait for the bot to answer before showing the prompt again.
const REPLY_WAIT: Duration = Duration::from_millis(750);

const SHELL_HELP: &str = "\
/help                          show this text
/status                        connection state, generation and sessions
/drop                          simulate losing the connection
/presence <presence> [status]  change presence (available, occupied, do_not_disturb, unavailable)
/notify <event.toml> <recipients...>
                               announce a build event to the recipients
/quit                          leave the shell";

/// A line addressed to the shell rather than to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Status,
    Drop,
    Presence {
        presence: Presence,
        status: Option<String>,
    },
    Notify {
        event: PathBuf,
        recipients: String,
    },
    Quit,
}

impl ShellCommand {
    /// `None` for chat lines; `Some(Err)` for malformed shell commands.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let rest = line.trim().strip_prefix('/')?;
        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();

        let command = match name {
            "help" | "?" => Ok(Self::Help),
            "status" => Ok(Self::Status),
            "drop" => Ok(Self::Drop),
            "quit" | "exit" => Ok(Self::Quit),
            "presence" => match words.next().map(Presence::from_str) {
                Some(Ok(presence)) => {
                    let status = words.collect::<Vec<_>>().join(" ");
                    Ok(Self::Presence {
                        presence,
                        status: (!status.is_empty()).then_some(status),
                    })
                }
                Some(Err(_)) => Err("unknown presence".to_string()),
                None => Err("usage: /presence <presence> [status]".to_string()),
            },
            "notify" => match words.next() {
                Some(event) => Ok(Self::Notify {
                    event: PathBuf::from(event),
                    recipients: words.collect::<Vec<_>>().join(" "),
                }),
                None => Err("usage: /notify <event.toml> <recipients...>".to_string()),
            },
            other => Err(format!("unknown shell command `/{other}`, try /help")),
        };
        Some(command)
    }
}

/// Reads a build event from a TOML file. Timestamps are RFC 3339 strings.
pub fn load_event(path: &Path) -> Result<NotificationEvent, BuildchatError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| BuildchatError::Config(format!("cannot read {}: {e}", path.display())))?;
    toml::from_str(&content)
        .map_err(|e| BuildchatError::Config(format!("{}: {e}", path.display())))
}

/// Runs the `buildchat shell` interactive REPL.
pub async fn run_shell(config: BuildchatConfig, jobs: Option<PathBuf>) -> Result<(), BuildchatError> {
    let build: Arc<dyn BuildSystem> = match &jobs {
        Some(path) => Arc::new(FixtureBuildSystem::load(path)?),
        None => Arc::new(FixtureBuildSystem::demo()),
    };

    let console = Arc::new(ConsoleTransport::new());
    let transport: Arc<dyn Transport> = console.clone();
    let manager = ConnectionManager::start(transport, ManagerSettings::from_config(&config.im)?);
    manager
        .set_listener_factory(Arc::new(CommandBotFactory::new(
            BotSettings::from_config(&config.im),
            build,
        )))
        .await;

    let dispatcher = NotificationDispatcher::from_config(Arc::new(manager.clone()), &config);
    let options = NotifyOptions::from_config(&config);

    let mut rl = DefaultEditor::new()
        .map_err(|e| BuildchatError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "buildchat shell".bold().green());
    println!(
        "Chat with the bot as {}. Type {} for shell commands.\n",
        crate::console::CONSOLE_ADDRESS.cyan(),
        "/help".yellow()
    );

    if !manager.connect().await? {
        warn!("console connection failed, a retry is scheduled");
    }

    let prompt = format!("{}> ", "buildchat".green());
    loop {
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                warn!(error = %e, "readline error");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        match ShellCommand::parse(line) {
            None => {
                let written = console.output_written();
                match console.submit(line).await {
                    Ok(()) => {
                        let _ = tokio::time::timeout(REPLY_WAIT, written).await;
                    }
                    Err(e) => eprintln!("{} {e}", "error:".red()),
                }
            }
            Some(Err(message)) => eprintln!("{} {message}", "error:".red()),
            Some(Ok(ShellCommand::Quit)) => break,
            Some(Ok(ShellCommand::Help)) => println!("{SHELL_HELP}"),
            Some(Ok(ShellCommand::Status)) => {
                println!(
                    "state {}, generation {}, {} session(s)",
                    manager.state().await,
                    manager.generation().await,
                    manager.session_count().await
                );
            }
            Some(Ok(ShellCommand::Drop)) => {
                if console.drop_connection().await {
                    println!("connection dropped, reconnecting in the background");
                } else {
                    println!("not connected");
                }
            }
            Some(Ok(ShellCommand::Presence { presence, status })) => {
                if let Err(e) = manager.set_presence(presence, status.as_deref()).await {
                    eprintln!("{} {e}", "error:".red());
                }
            }
            Some(Ok(ShellCommand::Notify { event, recipients })) => match load_event(&event) {
                Ok(event) => {
                    let report = dispatcher.notify(&event, &recipients, &options).await;
                    if report.wanted {
                        println!(
                            "delivered {}, failed {}",
                            report.delivered, report.failed
                        );
                    } else {
                        println!("event filtered out by the notification strategy");
                    }
                }
                Err(e) => eprintln!("{} {e}", "error:".red()),
            },
        }
    }

    manager.close().await;
    info!("shell session ended");
    Ok(())
}
