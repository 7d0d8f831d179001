// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for buildchat integration tests.
//!
//! Provides mock collaborators for fast, deterministic, CI-runnable tests
//! without an IM server or a build system.
//!
//! # Components
//!
//! - [`MockTransport`] / [`MockConnection`] - scripted IM transport with traffic capture
//! - [`MockBuildSystem`] - in-memory build system for bot commands
//! - [`RecordingSink`] - message sink with per-target failure injection

pub mod mock_build_system;
pub mod mock_transport;
pub mod recording_sink;

pub use mock_build_system::{MockBuildSystem, ScheduledBuild};
pub use mock_transport::{ConnectOutcome, MockConnection, MockTransport};
pub use recording_sink::RecordingSink;
