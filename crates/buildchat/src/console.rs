// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal-backed transport used by `buildchat shell`.
//!
//! Lines typed at the prompt arrive as direct messages from
//! [`CONSOLE_ADDRESS`]; everything the core sends is written to stdout.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use buildchat_core::types::{InboundMessage, Presence, TransportEvent};
use buildchat_core::{BuildchatError, Connection, Credentials, MessageTarget, Transport};
use colored::Colorize;
use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, Notify, mpsc};
use tracing::debug;

/// Address the console user chats from.
pub const CONSOLE_ADDRESS: &str = "console@localhost";

/// Opens [`ConsoleConnection`]s. Keeps the newest one so typed lines can be
/// injected into it.
pub struct ConsoleTransport {
    current: Mutex<Option<Arc<ConsoleConnection>>>,
    output: Arc<OutputLog>,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            output: Arc::new(OutputLog::new(true)),
        }
    }

    /// Keeps outbound text in memory instead of printing it.
    #[cfg(test)]
    pub fn quiet() -> Self {
        Self {
            current: Mutex::new(None),
            output: Arc::new(OutputLog::new(false)),
        }
    }

    /// Delivers a typed line as a direct message from the console user.
    pub async fn submit(&self, line: &str) -> Result<(), BuildchatError> {
        let current = self.current.lock().await.clone();
        let Some(conn) = current.filter(|c| c.is_connected()) else {
            return Err(BuildchatError::ConnectionUnavailable(
                "console is not connected".into(),
            ));
        };
        let message = InboundMessage::new(
            MessageTarget::direct(CONSOLE_ADDRESS),
            format!("{CONSOLE_ADDRESS}/terminal"),
            line,
        );
        conn.push(TransportEvent::Message(message)).await
    }

    /// Simulates the network dropping the current connection.
    pub async fn drop_connection(&self) -> bool {
        let current = self.current.lock().await.clone();
        match current {
            Some(conn) if conn.is_connected() => {
                conn.connected.store(false, Ordering::SeqCst);
                conn.push(TransportEvent::ConnectionLost {
                    reason: "dropped from the console".into(),
                })
                .await
                .is_ok()
            }
            _ => false,
        }
    }

    /// Resolves once something is written after this call.
    pub fn output_written(&self) -> Notified<'_> {
        self.output.written.notified()
    }

    #[cfg(test)]
    pub async fn lines(&self) -> Vec<String> {
        self.output.lines.lock().await.clone()
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    async fn open(
        &self,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn Connection>, BuildchatError> {
        let conn = Arc::new(ConsoleConnection {
            connected: AtomicBool::new(true),
            events,
            output: Arc::clone(&self.output),
        });
        *self.current.lock().await = Some(Arc::clone(&conn));
        Ok(conn)
    }
}

/// Where outbound text goes.
struct OutputLog {
    print: bool,
    lines: Mutex<Vec<String>>,
    written: Notify,
}

impl OutputLog {
    fn new(print: bool) -> Self {
        Self {
            print,
            lines: Mutex::new(Vec::new()),
            written: Notify::new(),
        }
    }

    async fn write(&self, line: String) {
        if self.print {
            println!("{line}");
        }
        self.lines.lock().await.push(line);
        self.written.notify_waiters();
    }
}

pub struct ConsoleConnection {
    connected: AtomicBool,
    events: mpsc::Sender<TransportEvent>,
    output: Arc<OutputLog>,
}

impl ConsoleConnection {
    async fn push(&self, event: TransportEvent) -> Result<(), BuildchatError> {
        self.events.send(event).await.map_err(|_| BuildchatError::Closed)
    }

    fn ensure_connected(&self) -> Result<(), BuildchatError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BuildchatError::transport("console connection closed"))
        }
    }
}

#[async_trait]
impl Connection for ConsoleConnection {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<(), BuildchatError> {
        debug!(user = %credentials.username, "console accepts any credentials");
        self.ensure_connected()
    }

    async fn send(&self, target: &MessageTarget, text: &str) -> Result<(), BuildchatError> {
        self.ensure_connected()?;
        let label = if target.is_group() {
            format!("[{}]", target.address()).cyan()
        } else {
            format!("[to {}]", target.address()).blue()
        };
        self.output.write(format!("{label} {text}")).await;
        Ok(())
    }

    async fn join_group(
        &self,
        room: &str,
        nickname: &str,
        _password: Option<&str>,
    ) -> Result<(), BuildchatError> {
        self.ensure_connected()?;
        self.output
            .write(format!("* joined {room} as {nickname}").dimmed().to_string())
            .await;
        Ok(())
    }

    async fn leave_group(&self, room: &str) -> Result<(), BuildchatError> {
        self.ensure_connected()?;
        self.output
            .write(format!("* left {room}").dimmed().to_string())
            .await;
        Ok(())
    }

    async fn set_presence(&self, presence: Presence, status: &str) -> Result<(), BuildchatError> {
        self.ensure_connected()?;
        self.output
            .write(format!("* presence {presence}: {status}").dimmed().to_string())
            .await;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BuildchatError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
