// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits consumed by the messaging core.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod build_system;
pub mod sink;
pub mod transport;

pub use build_system::BuildSystem;
pub use sink::MessageSink;
pub use transport::{Connection, Credentials, Transport};
