// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat command bot for buildchat.
//!
//! Messages that start with the command prefix (or address the bot by
//! nickname) are tokenized, looked up in a fixed [`CommandTable`] and run
//! against the build system. Replies go back through the chat session the
//! command arrived in.

pub mod bot;
pub mod commands;
pub mod parse;

pub use bot::{BotSettings, CommandBot, CommandBotFactory, Dispatch};
pub use commands::{CommandKind, CommandTable};
