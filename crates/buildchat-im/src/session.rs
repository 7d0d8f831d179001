// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat sessions and the per-connection session cache.
//!
//! A [`ChatSession`] is a handle to one conversation (a direct chat or a
//! joined room) on one physical connection. The [`ChatSessionCache`] keeps
//! at most one session per target, joins rooms on first use, attaches the
//! command listener, and drops everything when the connection is replaced.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use buildchat_core::{BuildchatError, Connection, InboundMessage, MessageTarget};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Receives inbound messages for one chat session.
#[async_trait]
pub trait SessionListener: Send + Sync {
    async fn on_message(&self, message: &InboundMessage);
}

/// Creates the listener bound to a newly created session.
pub trait ListenerFactory: Send + Sync {
    fn create(&self, session: &ChatSession) -> Arc<dyn SessionListener>;
}

struct SessionInner {
    target: MessageTarget,
    connection: Arc<dyn Connection>,
    generation: u64,
    created_at: Instant,
    /// Milliseconds after `created_at` of the last send or receive.
    last_used_ms: AtomicU64,
    /// Cleared when the cache drops the session; the listener usually holds
    /// a handle back to this session.
    listener: Mutex<Option<Arc<dyn SessionListener>>>,
}

/// Cheaply cloneable handle to one conversation.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("target", &self.inner.target)
            .field("generation", &self.inner.generation)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    fn new(target: MessageTarget, connection: Arc<dyn Connection>, generation: u64) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                target,
                connection,
                generation,
                created_at: Instant::now(),
                last_used_ms: AtomicU64::new(0),
                listener: Mutex::new(None),
            }),
        }
    }

    pub fn target(&self) -> &MessageTarget {
        &self.inner.target
    }

    /// Connection generation this session was created on.
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    /// Whether the connection backing this session is still usable.
    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    /// Sends a message into this chat.
    pub async fn send(&self, text: &str) -> Result<(), BuildchatError> {
        self.touch();
        self.inner.connection.send(&self.inner.target, text).await
    }

    pub fn listener(&self) -> Option<Arc<dyn SessionListener>> {
        self.listener_slot().clone()
    }

    fn bind_listener(&self, listener: Arc<dyn SessionListener>) {
        *self.listener_slot() = Some(listener);
    }

    fn detach_listener(&self) {
        self.listener_slot().take();
    }

    fn listener_slot(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn SessionListener>>> {
        self.inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) {
        let elapsed = self.inner.created_at.elapsed().as_millis();
        self.inner
            .last_used_ms
            .store(u64::try_from(elapsed).unwrap_or(u64::MAX), Ordering::Relaxed);
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let last_used = self.inner.created_at
            + Duration::from_millis(self.inner.last_used_ms.load(Ordering::Relaxed));
        now.saturating_duration_since(last_used)
    }
}

/// Sessions of the current connection, keyed by target.
///
/// Not synchronized on its own; the connection manager only touches it
/// while holding the connection lock.
pub struct ChatSessionCache {
    sessions: HashMap<MessageTarget, ChatSession>,
    nickname: String,
    idle_timeout: Duration,
    discard_backlog: bool,
    listeners: Option<Arc<dyn ListenerFactory>>,
}

impl ChatSessionCache {
    pub fn new(nickname: impl Into<String>, idle_timeout: Duration, discard_backlog: bool) -> Self {
        Self {
            sessions: HashMap::new(),
            nickname: nickname.into(),
            idle_timeout,
            discard_backlog,
            listeners: None,
        }
    }

    /// Sets the factory used for sessions created from now on.
    pub fn set_listener_factory(&mut self, factory: Arc<dyn ListenerFactory>) {
        self.listeners = Some(factory);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, target: &MessageTarget) -> Option<ChatSession> {
        self.sessions.get(target).cloned()
    }

    /// Returns the session for `target`, creating it on `connection` if
    /// needed. Rooms are joined on creation; a failed join leaves the cache
    /// unchanged.
    pub async fn get_or_create(
        &mut self,
        connection: &Arc<dyn Connection>,
        generation: u64,
        target: &MessageTarget,
    ) -> Result<ChatSession, BuildchatError> {
        self.sweep_idle(Instant::now());

        if let Some(existing) = self.sessions.get(target) {
            if existing.generation() == generation {
                existing.touch();
                return Ok(existing.clone());
            }
            debug!(target = %target, "dropping session from previous connection");
            if let Some(stale) = self.sessions.remove(target) {
                stale.detach_listener();
            }
        }

        if target.is_group() {
            connection
                .join_group(target.address(), &self.nickname, target.password())
                .await
                .map_err(|e| BuildchatError::SessionCreation {
                    target: target.to_string(),
                    source: Box::new(e),
                })?;
        }

        let session = ChatSession::new(target.clone(), Arc::clone(connection), generation);
        if !target.is_notification_only()
            && let Some(factory) = &self.listeners
        {
            session.bind_listener(factory.create(&session));
        }

        debug!(target = %target, generation, "chat session created");
        self.sessions.insert(target.clone(), session.clone());
        Ok(session)
    }

    /// Finds or creates the session an inbound message belongs to and
    /// returns its listener. Replayed room history is dropped here when
    /// backlog discarding is enabled.
    pub async fn route(
        &mut self,
        connection: &Arc<dyn Connection>,
        generation: u64,
        message: &InboundMessage,
    ) -> Result<Option<Arc<dyn SessionListener>>, BuildchatError> {
        if message.delayed && self.discard_backlog {
            trace!(chat = %message.chat, "discarding replayed message");
            return Ok(None);
        }
        let session = self.get_or_create(connection, generation, &message.chat).await?;
        Ok(session.listener())
    }

    /// Drops direct sessions idle for longer than the idle timeout. Rooms
    /// stay joined. Returns the number of sessions removed.
    pub fn sweep_idle(&mut self, now: Instant) -> usize {
        let timeout = self.idle_timeout;
        let before = self.sessions.len();
        self.sessions.retain(|target, session| {
            let keep = target.is_group() || session.idle_for(now) < timeout;
            if !keep {
                session.detach_listener();
            }
            keep
        });
        let removed = before - self.sessions.len();
        if removed > 0 {
            debug!(removed, "expired idle chat sessions");
        }
        removed
    }

    /// Removes every session, leaving joined rooms on a best-effort basis.
    pub async fn evict_all(&mut self) {
        for (target, session) in self.sessions.drain() {
            session.detach_listener();
            if target.is_group()
                && session.is_connected()
                && let Err(e) = session.inner.connection.leave_group(target.address()).await
            {
                warn!(target = %target, error = %e, "failed to leave room");
            }
        }
    }
}
