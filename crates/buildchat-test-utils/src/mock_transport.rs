// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock IM transport for deterministic testing.
//!
//! `MockTransport` hands out `MockConnection`s according to a script of
//! connect outcomes and records when each attempt happened. Connections
//! capture everything sent through them and let tests inject inbound
//! messages or simulate a dropped stream.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::Instant;

use buildchat_core::{
    BuildchatError, Connection, Credentials, InboundMessage, MessageTarget, Presence, Transport,
    TransportEvent,
};

/// Result of one scripted connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The connection opens and authenticates.
    Accept,
    /// Opening fails with a transient transport error.
    Refuse,
    /// The connection opens but authentication is rejected.
    RejectCredentials,
    /// Opening fails with a fatal configuration error.
    Fatal(String),
}

/// A scripted transport. Once the script runs out every attempt succeeds.
pub struct MockTransport {
    script: Mutex<VecDeque<ConnectOutcome>>,
    attempts: Mutex<Vec<Instant>>,
    attempt_count: watch::Sender<usize>,
    connections: Mutex<Vec<Arc<MockConnection>>>,
    failing_sends: Mutex<HashSet<String>>,
    failing_joins: Mutex<HashSet<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::scripted([])
    }

    /// Creates a transport whose first attempts follow `outcomes`.
    pub fn scripted(outcomes: impl IntoIterator<Item = ConnectOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            attempts: Mutex::new(Vec::new()),
            attempt_count: watch::Sender::new(0),
            connections: Mutex::new(Vec::new()),
            failing_sends: Mutex::new(HashSet::new()),
            failing_joins: Mutex::new(HashSet::new()),
        }
    }

    /// Appends outcomes to the script.
    pub async fn push_outcomes(&self, outcomes: impl IntoIterator<Item = ConnectOutcome>) {
        self.script.lock().await.extend(outcomes);
    }

    /// Sends to `address` fail on every connection opened from now on.
    pub async fn fail_sends_to(&self, address: &str) {
        self.failing_sends.lock().await.insert(address.to_lowercase());
    }

    /// Joining `room` fails on every connection opened from now on.
    pub async fn fail_joins_of(&self, room: &str) {
        self.failing_joins.lock().await.insert(room.to_lowercase());
    }

    /// When each connection attempt started.
    pub async fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().await.clone()
    }

    pub async fn attempt_count(&self) -> usize {
        self.attempts.lock().await.len()
    }

    /// Waits until at least `count` connection attempts were made.
    pub async fn wait_for_attempts(&self, count: usize) {
        let mut rx = self.attempt_count.subscribe();
        let _ = rx.wait_for(|n| *n >= count).await;
    }

    /// Every connection handed out, oldest first.
    pub async fn connections(&self) -> Vec<Arc<MockConnection>> {
        self.connections.lock().await.clone()
    }

    /// The most recently opened connection.
    pub async fn last_connection(&self) -> Option<Arc<MockConnection>> {
        self.connections.lock().await.last().cloned()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(
        &self,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn Connection>, BuildchatError> {
        let outcome = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or(ConnectOutcome::Accept);

        let count = {
            let mut attempts = self.attempts.lock().await;
            attempts.push(Instant::now());
            attempts.len()
        };

        let result = match outcome {
            ConnectOutcome::Refuse => Err(BuildchatError::transport("connection refused")),
            ConnectOutcome::Fatal(reason) => Err(BuildchatError::Config(reason)),
            ConnectOutcome::Accept | ConnectOutcome::RejectCredentials => {
                let connection = Arc::new(MockConnection {
                    connected: AtomicBool::new(true),
                    reject_credentials: outcome == ConnectOutcome::RejectCredentials,
                    events,
                    sent: Mutex::new(Vec::new()),
                    sent_count: watch::Sender::new(0),
                    joined: Mutex::new(Vec::new()),
                    left: Mutex::new(Vec::new()),
                    presence: Mutex::new(None),
                    failing_sends: Mutex::new(self.failing_sends.lock().await.clone()),
                    failing_joins: Mutex::new(self.failing_joins.lock().await.clone()),
                });
                self.connections.lock().await.push(Arc::clone(&connection));
                let connection: Arc<dyn Connection> = connection;
                Ok(connection)
            }
        };

        self.attempt_count.send_replace(count);
        result
    }
}

/// A mock connection capturing outbound traffic.
pub struct MockConnection {
    connected: AtomicBool,
    reject_credentials: bool,
    events: mpsc::Sender<TransportEvent>,
    sent: Mutex<Vec<(MessageTarget, String)>>,
    sent_count: watch::Sender<usize>,
    joined: Mutex<Vec<String>>,
    left: Mutex<Vec<String>>,
    presence: Mutex<Option<(Presence, String)>>,
    failing_sends: Mutex<HashSet<String>>,
    failing_joins: Mutex<HashSet<String>>,
}

impl MockConnection {
    /// A connected connection not owned by any transport. Injected events
    /// go nowhere.
    pub fn standalone() -> Self {
        let (events, _) = mpsc::channel(1);
        Self {
            connected: AtomicBool::new(true),
            reject_credentials: false,
            events,
            sent: Mutex::new(Vec::new()),
            sent_count: watch::Sender::new(0),
            joined: Mutex::new(Vec::new()),
            left: Mutex::new(Vec::new()),
            presence: Mutex::new(None),
            failing_sends: Mutex::new(HashSet::new()),
            failing_joins: Mutex::new(HashSet::new()),
        }
    }

    /// Delivers an inbound message as if it arrived from the server.
    pub async fn inject(&self, message: InboundMessage) {
        let _ = self.events.send(TransportEvent::Message(message)).await;
    }

    /// Marks the stream dead and reports the loss.
    pub async fn drop_connection(&self, reason: &str) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self
            .events
            .send(TransportEvent::ConnectionLost {
                reason: reason.to_string(),
            })
            .await;
    }

    /// Marks the stream dead without reporting it.
    pub fn sever(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub async fn fail_send_to(&self, address: &str) {
        self.failing_sends.lock().await.insert(address.to_lowercase());
    }

    pub async fn fail_join(&self, room: &str) {
        self.failing_joins.lock().await.insert(room.to_lowercase());
    }

    /// Every message sent, in order.
    pub async fn sent(&self) -> Vec<(MessageTarget, String)> {
        self.sent.lock().await.clone()
    }

    /// Texts sent to one address.
    pub async fn sent_to(&self, address: &str) -> Vec<String> {
        let address = address.to_lowercase();
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(target, _)| target.normalized() == address)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Waits until at least `count` messages were sent.
    pub async fn wait_for_sent(&self, count: usize) {
        let mut rx = self.sent_count.subscribe();
        let _ = rx.wait_for(|n| *n >= count).await;
    }

    /// Rooms joined, in order.
    pub async fn joined(&self) -> Vec<String> {
        self.joined.lock().await.clone()
    }

    /// Rooms left, in order.
    pub async fn left(&self) -> Vec<String> {
        self.left.lock().await.clone()
    }

    /// Last presence set.
    pub async fn presence(&self) -> Option<(Presence, String)> {
        self.presence.lock().await.clone()
    }

    fn ensure_connected(&self) -> Result<(), BuildchatError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BuildchatError::transport("not connected"))
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<(), BuildchatError> {
        if self.reject_credentials {
            return Err(BuildchatError::Authentication(format!(
                "credentials for `{}` rejected",
                credentials.username
            )));
        }
        self.ensure_connected()
    }

    async fn send(&self, target: &MessageTarget, text: &str) -> Result<(), BuildchatError> {
        self.ensure_connected()?;
        if self.failing_sends.lock().await.contains(&target.normalized()) {
            return Err(BuildchatError::transport(format!(
                "delivery to `{target}` rejected"
            )));
        }
        let count = {
            let mut sent = self.sent.lock().await;
            sent.push((target.clone(), text.to_string()));
            sent.len()
        };
        self.sent_count.send_replace(count);
        Ok(())
    }

    async fn join_group(
        &self,
        room: &str,
        _nickname: &str,
        _password: Option<&str>,
    ) -> Result<(), BuildchatError> {
        self.ensure_connected()?;
        if self.failing_joins.lock().await.contains(&room.to_lowercase()) {
            return Err(BuildchatError::transport(format!("join of `{room}` refused")));
        }
        self.joined.lock().await.push(room.to_string());
        Ok(())
    }

    async fn leave_group(&self, room: &str) -> Result<(), BuildchatError> {
        self.left.lock().await.push(room.to_string());
        Ok(())
    }

    async fn set_presence(&self, presence: Presence, status: &str) -> Result<(), BuildchatError> {
        self.ensure_connected()?;
        *self.presence.lock().await = Some((presence, status.to_string()));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BuildchatError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
