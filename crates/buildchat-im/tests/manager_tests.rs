// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the connection manager against the mock transport.
//!
//! Every test runs on a paused clock so that reconnect grace periods and
//! backoff intervals elapse instantly while staying observable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use buildchat_core::{
    BuildchatError, Connection, ConnectionState, Credentials, InboundMessage, MessageTarget,
    Presence, Transport, TransportEvent,
};
use buildchat_im::{
    ChatSession, ConnectionManager, ListenerFactory, ManagerSettings, SessionListener,
};
use buildchat_test_utils::{ConnectOutcome, MockTransport};
use tokio::sync::{Notify, mpsc};

const MINUTE: Duration = Duration::from_secs(60);
const GRACE: Duration = Duration::from_secs(10);

fn room() -> MessageTarget {
    MessageTarget::group("ops@conference.example.org")
}

fn settings() -> ManagerSettings {
    ManagerSettings {
        credentials: Credentials {
            username: "bot@example.org".into(),
            password: Some("secret".into()),
            resource: "ci".into(),
        },
        nickname: "buildbot".into(),
        initial_groups: vec![room()],
        status_message: "Watching builds".into(),
        lock_timeout: Duration::from_secs(5),
        reconnect_grace: GRACE,
        reconnect_unit: MINUTE,
        reconnect_max: None,
        session_idle: Duration::from_secs(600),
        discard_backlog: true,
    }
}

fn start(transport: &Arc<MockTransport>) -> ConnectionManager {
    let transport: Arc<dyn Transport> = transport.clone();
    ConnectionManager::start(transport, settings())
}

/// Forwards every message body a session receives onto a channel.
struct Forward(mpsc::UnboundedSender<String>);

#[async_trait]
impl SessionListener for Forward {
    async fn on_message(&self, message: &InboundMessage) {
        let _ = self.0.send(message.body.clone());
    }
}

struct ForwardFactory(mpsc::UnboundedSender<String>);

impl ListenerFactory for ForwardFactory {
    fn create(&self, _session: &ChatSession) -> Arc<dyn SessionListener> {
        Arc::new(Forward(self.0.clone()))
    }
}

#[tokio::test(start_paused = true)]
async fn connect_joins_initial_rooms_and_sets_presence() {
    let transport = Arc::new(MockTransport::new());
    let manager = start(&transport);

    assert!(manager.connect().await.unwrap());

    let conn = transport.last_connection().await.unwrap();
    assert_eq!(conn.joined().await, vec!["ops@conference.example.org"]);
    assert_eq!(
        conn.presence().await,
        Some((Presence::Available, "Watching builds".to_string()))
    );
    assert_eq!(manager.state().await, ConnectionState::Connected);
    assert_eq!(manager.generation().await, 1);
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn send_reuses_one_session_per_target() {
    let transport = Arc::new(MockTransport::new());
    let manager = start(&transport);
    manager.connect().await.unwrap();

    let alice = MessageTarget::direct("alice@example.org");
    manager.send(&alice, "one").await.unwrap();
    manager.send(&alice, "two").await.unwrap();
    manager.send(&room(), "three").await.unwrap();

    let conn = transport.last_connection().await.unwrap();
    assert_eq!(conn.sent_to("alice@example.org").await, vec!["one", "two"]);
    assert_eq!(conn.joined().await.len(), 1, "initial room is not re-joined");
    assert_eq!(manager.session_count().await, 2);
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn send_while_disconnected_fails_fast_and_schedules_reconnect() {
    let transport = Arc::new(MockTransport::new());
    let manager = start(&transport);

    let err = manager
        .send(&MessageTarget::direct("alice@example.org"), "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, BuildchatError::ConnectionUnavailable(_)));

    transport.wait_for_attempts(1).await;
    assert!(manager.is_connected().await);
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_between_failed_attempts() {
    let transport = Arc::new(MockTransport::scripted([
        ConnectOutcome::Refuse,
        ConnectOutcome::Refuse,
        ConnectOutcome::Refuse,
        ConnectOutcome::Accept,
    ]));
    let manager = start(&transport);
    let requested = tokio::time::Instant::now();

    manager.schedule_reconnect();
    transport.wait_for_attempts(4).await;

    let at = transport.attempts().await;
    assert!(at[0] - requested >= GRACE);
    assert!(at[1] - at[0] >= MINUTE);
    assert!(at[2] - at[1] >= 2 * MINUTE);
    assert!(at[3] - at[2] >= 4 * MINUTE);
    assert!(manager.is_connected().await);
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn backoff_resets_after_success() {
    let transport = Arc::new(MockTransport::scripted([
        ConnectOutcome::Refuse,
        ConnectOutcome::Refuse,
        ConnectOutcome::Accept,
        ConnectOutcome::Refuse,
        ConnectOutcome::Accept,
    ]));
    let manager = start(&transport);

    manager.schedule_reconnect();
    transport.wait_for_attempts(3).await;
    assert!(manager.is_connected().await);

    transport.last_connection().await.unwrap().drop_connection("reset").await;
    transport.wait_for_attempts(5).await;

    let at = transport.attempts().await;
    let retry = at[4] - at[3];
    assert!(retry >= MINUTE && retry < 2 * MINUTE, "got {retry:?}");
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_reconnect_requests_coalesce() {
    let transport = Arc::new(MockTransport::new());
    let manager = start(&transport);
    manager.connect().await.unwrap();

    transport.last_connection().await.unwrap().sever();
    for _ in 0..10 {
        manager.schedule_reconnect();
    }

    tokio::time::sleep(GRACE * 10).await;
    assert_eq!(transport.attempt_count().await, 2);
    assert!(manager.is_connected().await);
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn connection_loss_reconnects_and_rebuilds_sessions() {
    let transport = Arc::new(MockTransport::new());
    let manager = start(&transport);
    manager.connect().await.unwrap();
    let alice = MessageTarget::direct("alice@example.org");
    manager.send(&alice, "before").await.unwrap();

    let first = transport.last_connection().await.unwrap();
    first.drop_connection("stream reset").await;
    transport.wait_for_attempts(2).await;
    assert!(manager.is_connected().await);
    assert_eq!(manager.generation().await, 2);

    manager.send(&alice, "after").await.unwrap();
    let second = transport.last_connection().await.unwrap();
    assert_eq!(second.sent_to("alice@example.org").await, vec!["after"]);
    assert_eq!(second.joined().await, vec!["ops@conference.example.org"]);
    assert_eq!(first.sent_to("alice@example.org").await, vec!["before"]);
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn loss_of_a_replaced_connection_is_ignored() {
    let transport = Arc::new(MockTransport::new());
    let manager = start(&transport);
    manager.connect().await.unwrap();
    let stale = transport.last_connection().await.unwrap();
    manager.connect().await.unwrap();

    stale.drop_connection("late notification").await;
    tokio::time::sleep(GRACE + 2 * MINUTE).await;

    assert_eq!(transport.attempt_count().await, 2);
    assert_eq!(manager.generation().await, 2);
    assert!(manager.is_connected().await);
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn rejected_credentials_are_retried() {
    let transport = Arc::new(MockTransport::scripted([ConnectOutcome::RejectCredentials]));
    let manager = start(&transport);

    assert!(!manager.connect().await.unwrap());
    assert_eq!(manager.state().await, ConnectionState::Failed);

    manager.schedule_reconnect();
    transport.wait_for_attempts(2).await;
    assert!(manager.is_connected().await);
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn fatal_error_stops_the_cycle() {
    let transport = Arc::new(MockTransport::scripted([ConnectOutcome::Fatal(
        "unknown server".into(),
    )]));
    let manager = start(&transport);

    manager.schedule_reconnect();
    tokio::time::sleep(GRACE + 30 * MINUTE).await;

    assert_eq!(transport.attempt_count().await, 1);
    assert_eq!(manager.state().await, ConnectionState::Failed);
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn close_cancels_pending_reconnect_and_is_idempotent() {
    let transport = Arc::new(MockTransport::scripted([
        ConnectOutcome::Accept,
        ConnectOutcome::Refuse,
    ]));
    let manager = start(&transport);
    manager.connect().await.unwrap();

    transport.last_connection().await.unwrap().sever();
    manager.schedule_reconnect();
    manager.close().await;
    manager.close().await;

    tokio::time::sleep(GRACE + 60 * MINUTE).await;
    assert_eq!(transport.attempt_count().await, 1);

    let err = manager.send(&room(), "late").await.unwrap_err();
    assert!(matches!(err, BuildchatError::Closed));
    assert!(!manager.is_connected().await);
}

#[tokio::test(start_paused = true)]
async fn close_leaves_rooms_and_disconnects() {
    let transport = Arc::new(MockTransport::new());
    let manager = start(&transport);
    manager.connect().await.unwrap();
    let conn = transport.last_connection().await.unwrap();

    manager.close().await;

    assert_eq!(conn.left().await, vec!["ops@conference.example.org"]);
    assert!(!conn.is_connected());
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn presence_is_reapplied_after_reconnect() {
    let transport = Arc::new(MockTransport::new());
    let manager = start(&transport);
    manager.connect().await.unwrap();
    manager
        .set_presence(Presence::DoNotDisturb, Some("deploying"))
        .await
        .unwrap();

    transport.last_connection().await.unwrap().drop_connection("reset").await;
    transport.wait_for_attempts(2).await;
    assert!(manager.is_connected().await);

    let conn = transport.last_connection().await.unwrap();
    assert_eq!(
        conn.presence().await,
        Some((Presence::DoNotDisturb, "deploying".to_string()))
    );
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn failed_initial_room_join_does_not_fail_connect() {
    let transport = Arc::new(MockTransport::new());
    transport.fail_joins_of("ops@conference.example.org").await;
    let manager = start(&transport);

    assert!(manager.connect().await.unwrap());
    assert_eq!(manager.session_count().await, 0);

    let err = manager.send(&room(), "hello").await.unwrap_err();
    assert!(matches!(err, BuildchatError::SessionCreation { .. }));
    manager.close().await;
}

#[tokio::test(start_paused = true)]
async fn inbound_messages_reach_listeners_but_backlog_does_not() {
    let transport = Arc::new(MockTransport::new());
    let manager = start(&transport);
    let (tx, mut rx) = mpsc::unbounded_channel();
    manager
        .set_listener_factory(Arc::new(ForwardFactory(tx)))
        .await;
    manager.connect().await.unwrap();
    let conn = transport.last_connection().await.unwrap();

    let from = "ops@conference.example.org/alice";
    conn.inject(InboundMessage::new(room(), from, "!build old").replayed())
        .await;
    conn.inject(InboundMessage::new(room(), from, "!build new"))
        .await;

    assert_eq!(rx.recv().await.as_deref(), Some("!build new"));
    manager.close().await;
}

/// Signals when a message arrives, then never finishes handling it.
struct Hang(Arc<Notify>);

#[async_trait]
impl SessionListener for Hang {
    async fn on_message(&self, _message: &InboundMessage) {
        self.0.notify_one();
        std::future::pending::<()>().await;
    }
}

struct HangFactory(Arc<Notify>);

impl ListenerFactory for HangFactory {
    fn create(&self, _session: &ChatSession) -> Arc<dyn SessionListener> {
        Arc::new(Hang(Arc::clone(&self.0)))
    }
}

#[tokio::test(start_paused = true)]
async fn hung_handler_does_not_block_loss_handling() {
    let transport = Arc::new(MockTransport::new());
    let manager = start(&transport);
    let entered = Arc::new(Notify::new());
    manager
        .set_listener_factory(Arc::new(HangFactory(Arc::clone(&entered))))
        .await;
    manager.connect().await.unwrap();
    let conn = transport.last_connection().await.unwrap();

    conn.inject(InboundMessage::new(
        room(),
        "ops@conference.example.org/alice",
        "!status",
    ))
    .await;
    entered.notified().await;

    conn.drop_connection("reset").await;
    let reconnected =
        tokio::time::timeout(GRACE + MINUTE, transport.wait_for_attempts(2)).await;
    assert!(reconnected.is_ok(), "loss was not handled");
    assert!(manager.is_connected().await);

    let closed = tokio::time::timeout(MINUTE, manager.close()).await;
    assert!(closed.is_ok());
}

/// A transport whose connection attempts never complete.
struct StallingTransport;

#[async_trait]
impl Transport for StallingTransport {
    fn name(&self) -> &str {
        "stalling"
    }

    async fn open(
        &self,
        _events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn Connection>, BuildchatError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn send_gives_up_when_the_lock_is_held_too_long() {
    let manager = ConnectionManager::start(Arc::new(StallingTransport), settings());

    manager.schedule_reconnect();
    tokio::time::sleep(GRACE + Duration::from_secs(1)).await;

    let started = tokio::time::Instant::now();
    let err = manager
        .send(&MessageTarget::direct("alice@example.org"), "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, BuildchatError::Timeout { .. }));
    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn close_interrupts_a_stalled_connect() {
    let manager = ConnectionManager::start(Arc::new(StallingTransport), settings());

    manager.schedule_reconnect();
    tokio::time::sleep(GRACE + Duration::from_secs(1)).await;

    let closed = tokio::time::timeout(MINUTE, manager.close()).await;
    assert!(closed.is_ok(), "close waited on the stalled attempt");
    assert_eq!(manager.state().await, ConnectionState::Disconnected);

    let err = manager.connect().await.unwrap_err();
    assert!(matches!(err, BuildchatError::Closed));
}

#[tokio::test(start_paused = true)]
async fn caller_connect_is_interrupted_by_close() {
    let manager = ConnectionManager::start(Arc::new(StallingTransport), settings());

    let attempt = tokio::spawn({
        let manager = manager.clone();
        async move { manager.connect().await }
    });
    tokio::time::sleep(Duration::from_secs(1)).await;

    manager.close().await;
    let result = attempt.await.unwrap();
    assert!(matches!(result, Err(BuildchatError::Closed)));
}
