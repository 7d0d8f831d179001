// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection manager: owns the single physical connection, its session
//! cache, and the background tasks that reconnect and route inbound
//! messages.
//!
//! All connection state lives behind one async mutex. Senders wait for it
//! with a bounded timeout; the reconnect worker and the inbound pump wait
//! without one. Connect attempts race the cancellation token, so a stalled
//! attempt never holds the lock past [`ConnectionManager::close`].
//! Reconnect requests go through a single-permit [`Notify`], so any number
//! of requests raised while a cycle is running collapse into at most one
//! follow-up cycle.
//!
//! The pump only routes. Listener callbacks run on their own tasks so a
//! slow command handler cannot hold back later events such as a
//! connection loss.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use buildchat_config::model::ImConfig;
use buildchat_core::{
    BuildchatError, Connection, ConnectionState, Credentials, InboundMessage, MessageSink,
    MessageTarget, Presence, Transport, TransportEvent,
};
use tokio::sync::{Mutex, MutexGuard, Notify, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::backoff::ReconnectBackoff;
use crate::session::{ChatSessionCache, ListenerFactory};

/// Capacity of the channel carrying transport events to the pump.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Runtime settings of a [`ConnectionManager`].
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    pub credentials: Credentials,
    pub nickname: String,
    /// Rooms joined on every successful connect.
    pub initial_groups: Vec<MessageTarget>,
    pub status_message: String,
    pub lock_timeout: Duration,
    pub reconnect_grace: Duration,
    pub reconnect_unit: Duration,
    pub reconnect_max: Option<Duration>,
    pub session_idle: Duration,
    pub discard_backlog: bool,
}

impl ManagerSettings {
    /// Derives settings from the `[im]` section. Fails if the initial
    /// group list does not resolve.
    pub fn from_config(im: &ImConfig) -> Result<Self, BuildchatError> {
        let resolver = im.target_resolver();
        let initial_groups = resolver
            .parse_list(&im.initial_groups)
            .map_err(|e| BuildchatError::Config(format!("im.initial_groups: {e}")))?;

        Ok(Self {
            credentials: Credentials {
                username: im.username.clone(),
                password: im.password.clone(),
                resource: im.resource.clone(),
            },
            nickname: im.nickname.clone(),
            initial_groups,
            status_message: im.status_message.clone(),
            lock_timeout: im.lock_timeout(),
            reconnect_grace: im.reconnect_grace(),
            reconnect_unit: im.reconnect_unit(),
            reconnect_max: im.reconnect_max(),
            session_idle: im.session_idle(),
            discard_backlog: im.discard_backlog,
        })
    }
}

/// State guarded by the connection lock.
struct Guarded {
    state: ConnectionState,
    connection: Option<Arc<dyn Connection>>,
    generation: u64,
    sessions: ChatSessionCache,
    presence: Presence,
    status: String,
    closed: bool,
}

impl Guarded {
    fn live_connection(&self) -> Option<Arc<dyn Connection>> {
        self.connection
            .as_ref()
            .filter(|c| c.is_connected())
            .map(Arc::clone)
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    settings: ManagerSettings,
    guarded: Mutex<Guarded>,
    reconnect: Notify,
    cancel: CancellationToken,
    events_tx: mpsc::Sender<TransportEvent>,
    /// Listener callbacks in flight.
    handlers: TaskTracker,
}

/// Owner of the physical connection to the IM server.
///
/// Cloning yields another handle to the same manager. Call
/// [`close`](Self::close) to stop the background tasks.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// Creates the manager and spawns its reconnect worker and inbound
    /// pump. Does not connect; call [`connect`](Self::connect) or
    /// [`schedule_reconnect`](Self::schedule_reconnect).
    pub fn start(transport: Arc<dyn Transport>, settings: ManagerSettings) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let sessions = ChatSessionCache::new(
            settings.nickname.clone(),
            settings.session_idle,
            settings.discard_backlog,
        );
        let status = settings.status_message.clone();

        let manager = Self {
            inner: Arc::new(Inner {
                transport,
                settings,
                guarded: Mutex::new(Guarded {
                    state: ConnectionState::Disconnected,
                    connection: None,
                    generation: 0,
                    sessions,
                    presence: Presence::Available,
                    status,
                    closed: false,
                }),
                reconnect: Notify::new(),
                cancel: CancellationToken::new(),
                events_tx,
                handlers: TaskTracker::new(),
            }),
        };

        tokio::spawn(run_reconnect_worker(manager.clone()));
        tokio::spawn(run_event_pump(manager.clone(), events_rx));
        manager
    }

    /// Installs the factory that attaches listeners to new chat sessions.
    pub async fn set_listener_factory(&self, factory: Arc<dyn ListenerFactory>) {
        self.inner
            .guarded
            .lock()
            .await
            .sessions
            .set_listener_factory(factory);
    }

    /// Replaces the current connection with a fresh one.
    ///
    /// Returns `Ok(false)` when the attempt failed for a transient reason
    /// (network, rejected credentials) and `Err` for fatal ones.
    pub async fn connect(&self) -> Result<bool, BuildchatError> {
        let mut guarded = self.inner.guarded.lock().await;
        self.connect_locked(&mut guarded).await
    }

    async fn connect_locked(&self, g: &mut Guarded) -> Result<bool, BuildchatError> {
        if g.closed {
            return Err(BuildchatError::Closed);
        }

        teardown_locked(g).await;
        g.state = ConnectionState::Connecting;
        let transport = &self.inner.transport;
        info!(transport = transport.name(), "connecting to IM server");

        let opened = self
            .unless_closed(transport.open(self.inner.events_tx.clone()))
            .await;
        let connection = match opened {
            Ok(connection) => connection,
            Err(e) => return connect_failed(g, e),
        };

        let credentials = &self.inner.settings.credentials;
        if let Err(e) = self.unless_closed(connection.authenticate(credentials)).await {
            if let Err(close_err) = connection.disconnect().await {
                debug!(error = %close_err, "error closing rejected connection");
            }
            return connect_failed(g, e);
        }

        g.generation += 1;
        g.connection = Some(Arc::clone(&connection));
        g.state = ConnectionState::Connected;
        let generation = g.generation;
        info!(generation, "connected to IM server");

        for room in &self.inner.settings.initial_groups {
            if let Err(e) = g.sessions.get_or_create(&connection, generation, room).await {
                warn!(room = %room, error = %e, "failed to join initial room");
            }
        }

        if let Err(e) = connection.set_presence(g.presence, &g.status).await {
            warn!(error = %e, "failed to set presence after connect");
        }

        Ok(true)
    }

    /// Returns the live connection, connecting synchronously if there is
    /// none. A failed attempt schedules a background reconnect. Every
    /// failure is reported as `ConnectionUnavailable`.
    pub async fn current_connection(&self) -> Result<Arc<dyn Connection>, BuildchatError> {
        let mut guarded = self
            .lock_bounded()
            .await
            .map_err(|e| BuildchatError::ConnectionUnavailable(e.to_string()))?;
        if let Some(connection) = guarded.live_connection() {
            return Ok(connection);
        }

        match self.connect_locked(&mut guarded).await {
            Ok(true) => guarded.live_connection().ok_or_else(|| {
                BuildchatError::ConnectionUnavailable("connection dropped during setup".into())
            }),
            Ok(false) => {
                drop(guarded);
                self.schedule_reconnect();
                Err(BuildchatError::ConnectionUnavailable(
                    "could not connect to IM server".into(),
                ))
            }
            Err(e) => Err(BuildchatError::ConnectionUnavailable(e.to_string())),
        }
    }

    /// Sends `text` to `target`, creating its chat session on first use.
    ///
    /// Fails fast with `ConnectionUnavailable` while disconnected; the
    /// message is not queued.
    pub async fn send(&self, target: &MessageTarget, text: &str) -> Result<(), BuildchatError> {
        let session = {
            let mut guarded = self.lock_bounded().await?;
            let Some(connection) = guarded.live_connection() else {
                let closed = guarded.closed;
                drop(guarded);
                if !closed {
                    self.schedule_reconnect();
                }
                return Err(BuildchatError::ConnectionUnavailable(
                    "not connected to IM server".into(),
                ));
            };
            let generation = guarded.generation;
            guarded
                .sessions
                .get_or_create(&connection, generation, target)
                .await?
        };

        match session.send(text).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if !session.is_connected() {
                    warn!(target = %target, error = %e, "send failed on a dead connection");
                    self.schedule_reconnect();
                }
                Err(e)
            }
        }
    }

    /// Changes presence. Remembered and re-applied after every reconnect.
    pub async fn set_presence(
        &self,
        presence: Presence,
        status: Option<&str>,
    ) -> Result<(), BuildchatError> {
        let mut guarded = self.lock_bounded().await?;
        guarded.presence = presence;
        if let Some(status) = status {
            guarded.status = status.to_string();
        }
        match guarded.live_connection() {
            Some(connection) => connection.set_presence(presence, &guarded.status).await,
            None => Ok(()),
        }
    }

    /// Requests a background reconnection cycle. Never blocks; requests
    /// made while a cycle is pending collapse into one.
    pub fn schedule_reconnect(&self) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        debug!("reconnect scheduled");
        self.inner.reconnect.notify_one();
    }

    /// Stops background tasks, leaves rooms and disconnects. Idempotent.
    pub async fn close(&self) {
        self.inner.cancel.cancel();
        self.inner.handlers.close();
        let mut guarded = self.inner.guarded.lock().await;
        if guarded.closed {
            return;
        }
        guarded.closed = true;
        teardown_locked(&mut guarded).await;
        info!("connection manager closed");
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.guarded.lock().await.state
    }

    /// Whether a live connection exists. Reports `false` if the lock is
    /// not available within the lock timeout.
    pub async fn is_connected(&self) -> bool {
        match self.lock_bounded().await {
            Ok(guarded) => guarded.live_connection().is_some(),
            Err(_) => false,
        }
    }

    /// Number of connections established so far.
    pub async fn generation(&self) -> u64 {
        self.inner.guarded.lock().await.generation
    }

    /// Number of cached chat sessions.
    pub async fn session_count(&self) -> usize {
        self.inner.guarded.lock().await.sessions.len()
    }

    /// Acquires the connection lock, giving up after the lock timeout or
    /// when the manager is closed.
    async fn lock_bounded(&self) -> Result<MutexGuard<'_, Guarded>, BuildchatError> {
        let duration = self.inner.settings.lock_timeout;
        tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => Err(BuildchatError::Closed),
            locked = tokio::time::timeout(duration, self.inner.guarded.lock()) => {
                locked.map_err(|_| BuildchatError::Timeout { duration })
            }
        }
    }

    /// Runs `fut` unless the manager is closed first.
    async fn unless_closed<T>(
        &self,
        fut: impl Future<Output = Result<T, BuildchatError>>,
    ) -> Result<T, BuildchatError> {
        tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => Err(BuildchatError::Closed),
            result = fut => result,
        }
    }

    async fn dispatch_inbound(&self, message: InboundMessage) {
        let routed = {
            let mut guarded = match self.lock_bounded().await {
                Ok(guarded) => guarded,
                Err(e) => {
                    warn!(chat = %message.chat, error = %e, "dropping inbound message");
                    return;
                }
            };
            let Some(connection) = guarded.live_connection() else {
                debug!(chat = %message.chat, "dropping message received while disconnected");
                return;
            };
            let generation = guarded.generation;
            guarded
                .sessions
                .route(&connection, generation, &message)
                .await
        };

        match routed {
            Ok(Some(listener)) => {
                let cancel = self.inner.cancel.clone();
                self.inner.handlers.spawn(async move {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = listener.on_message(&message) => {}
                    }
                });
            }
            Ok(None) => {}
            Err(e) => warn!(chat = %message.chat, error = %e, "failed to route inbound message"),
        }
    }

    async fn handle_connection_lost(&self, reason: &str) {
        {
            let mut guarded = self.inner.guarded.lock().await;
            if guarded.closed {
                return;
            }
            if guarded.live_connection().is_some() {
                debug!(reason, "ignoring loss of a replaced connection");
                return;
            }
            warn!(reason, "connection to IM server lost");
            teardown_locked(&mut guarded).await;
        }
        self.schedule_reconnect();
    }
}

#[async_trait]
impl MessageSink for ConnectionManager {
    async fn send(&self, target: &MessageTarget, text: &str) -> Result<(), BuildchatError> {
        ConnectionManager::send(self, target, text).await
    }
}

fn connect_failed(g: &mut Guarded, err: BuildchatError) -> Result<bool, BuildchatError> {
    if matches!(err, BuildchatError::Closed) {
        g.state = ConnectionState::Disconnected;
        debug!("connection attempt interrupted by close");
        return Err(err);
    }
    g.state = ConnectionState::Failed;
    if err.is_transient() {
        warn!(error = %err, "connection attempt failed");
        Ok(false)
    } else {
        error!(error = %err, "connection attempt failed fatally");
        Err(err)
    }
}

/// Drops all sessions and closes the current connection.
async fn teardown_locked(g: &mut Guarded) {
    g.sessions.evict_all().await;
    if let Some(connection) = g.connection.take()
        && let Err(e) = connection.disconnect().await
    {
        debug!(error = %e, "error while disconnecting");
    }
    g.state = ConnectionState::Disconnected;
}

/// Sleeps for `duration` unless cancelled first. Returns `false` on
/// cancellation.
async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

async fn run_reconnect_worker(manager: ConnectionManager) {
    let inner = &manager.inner;
    let mut backoff = ReconnectBackoff::new(
        inner.settings.reconnect_unit,
        inner.settings.reconnect_max,
    );

    loop {
        tokio::select! {
            _ = inner.cancel.cancelled() => break,
            _ = inner.reconnect.notified() => {}
        }

        debug!(
            grace_secs = inner.settings.reconnect_grace.as_secs(),
            "reconnect cycle starting"
        );
        if !sleep_or_cancel(&inner.cancel, inner.settings.reconnect_grace).await {
            break;
        }

        loop {
            let outcome = {
                let mut guarded = inner.guarded.lock().await;
                if guarded.closed {
                    return;
                }
                if guarded.live_connection().is_some() {
                    debug!("already connected, nothing to do");
                    Ok(true)
                } else {
                    manager.connect_locked(&mut guarded).await
                }
            };

            match outcome {
                Ok(true) => {
                    backoff.reset();
                    break;
                }
                Ok(false) => {}
                Err(BuildchatError::Closed) => return,
                Err(e) => {
                    error!(error = %e, "giving up reconnecting until the next request");
                    backoff.reset();
                    break;
                }
            }

            let delay = backoff.next_delay();
            warn!(
                attempt = backoff.failures(),
                delay_secs = delay.as_secs(),
                "reconnect failed, backing off"
            );
            if !sleep_or_cancel(&inner.cancel, delay).await {
                return;
            }
        }
    }

    debug!("reconnect worker stopped");
}

async fn run_event_pump(manager: ConnectionManager, mut events: mpsc::Receiver<TransportEvent>) {
    loop {
        let event = tokio::select! {
            _ = manager.inner.cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            TransportEvent::Message(message) => manager.dispatch_inbound(message).await,
            TransportEvent::ConnectionLost { reason } => {
                manager.handle_connection_lost(&reason).await;
            }
        }
    }

    debug!("inbound event pump stopped");
}
