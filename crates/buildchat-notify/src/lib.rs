// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Build notifications for buildchat.
//!
//! A [`NotificationStrategy`] decides whether a build event is announced,
//! [`MessageRenderer`] writes the texts for each audience, and
//! [`NotificationDispatcher`] delivers them target by target through any
//! [`MessageSink`](buildchat_core::MessageSink), isolating failures.

pub mod dispatcher;
pub mod recipients;
pub mod render;
pub mod strategy;

pub use dispatcher::{NotificationDispatcher, NotifyOptions, NotifyReport};
pub use recipients::AuthorDirectory;
pub use render::MessageRenderer;
pub use strategy::NotificationStrategy;
