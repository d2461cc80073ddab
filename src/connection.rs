//! Connection manager: one WebSocket, its handshake, and its recovery.
//!
//! # Architecture
//!
//! ```text
//! ProtocolClient ──Command──▶ ConnectionActor (tokio task)
//!       ▲                        │  owns WsWriter / WsReader
//!       │                        │  owns RequestRegistry
//!       └──── Arc<Shared> ◀──────┘  state watch, session, ping, event log
//! ```
//!
//! The actor is the only code that touches the socket or the registry.
//! Socket events and caller commands are handled one at a time from a single
//! `tokio::select!` loop, so frames are dispatched strictly in arrival order.
//!
//! # Lifecycle
//!
//! ```text
//! Closed ─connect─▶ Pending ─ack ok─▶ Active
//!                      │                 │ unexpected close / I/O error
//!                      │ ack rejected    ▼
//!                      ▼              Dropped ─delay─▶ Pending (handshake replayed)
//!                    Closed
//! ```
//!
//! A caller's `close()` always ends in `Closed` without reconnecting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use crate::config::ClientConfig;
use crate::constants::{BROADCAST_CAPACITY, PING_MESSAGE, PONG_MESSAGE, STREAM_EVENT_ID};
use crate::diagnostics::{Direction, EventLog};
use crate::error::{ProtocolError, Result};
use crate::protocol::events::{REGISTER_VIEWER, REGISTER_VIEWER_ACK};
use crate::protocol::messages::{RegisterViewer, RegisterViewerAck};
use crate::protocol::Frame;
use crate::registry::{Completion, CorrelationKey, Dispatch, RequestRegistry, StatusProbe};
use crate::ws::{self, WsMessage, WsReader, WsWriter};

/// Connection state as seen by callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection, and none being attempted.
    #[default]
    Closed,
    /// Socket opening or handshake in flight.
    Pending,
    /// Handshake accepted; requests may be sent.
    Active,
    /// Lost unexpectedly; a reconnect is scheduled.
    Dropped,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Dropped => "dropped",
        };
        f.write_str(name)
    }
}

/// Observable connection state.
///
/// Backed by a `watch` channel so callers can await transitions.
#[derive(Debug)]
pub struct SharedConnectionState {
    tx: watch::Sender<ConnectionState>,
}

impl Default for SharedConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedConnectionState {
    /// Create state starting at [`ConnectionState::Closed`].
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Closed);
        Self { tx }
    }

    /// Current state.
    pub fn get(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Move to `new_state`, notifying watchers.
    pub fn set(&self, new_state: ConnectionState) {
        let old = self.tx.send_replace(new_state);
        if old != new_state {
            log::info!("Connection {} -> {}", old, new_state);
        }
    }

    /// Whether requests may be sent.
    pub fn is_active(&self) -> bool {
        self.get() == ConnectionState::Active
    }

    /// Receiver that observes every transition.
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }
}

/// Session established by a successful handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Id assigned by the backend.
    pub session_id: String,
    /// API key the session was registered with.
    pub api_key: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default)]
struct PingTimes {
    last_ping: Option<Instant>,
    round_trip: Option<Duration>,
}

/// State shared between the client facade and its connection actor.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) state: SharedConnectionState,
    pub(crate) diagnostics: EventLog,
    session: RwLock<Option<Session>>,
    dropped: AtomicBool,
    ping: Mutex<PingTimes>,
    event_counter: AtomicU32,
    subscriptions: Mutex<HashMap<String, broadcast::Sender<Frame>>>,
    probe: Arc<dyn StatusProbe>,
}

impl Shared {
    pub(crate) fn new(config: &ClientConfig, probe: Arc<dyn StatusProbe>) -> Self {
        Self {
            state: SharedConnectionState::new(),
            diagnostics: EventLog::new(config.event_logging, config.event_log_capacity),
            session: RwLock::new(None),
            dropped: AtomicBool::new(false),
            ping: Mutex::new(PingTimes::default()),
            event_counter: AtomicU32::new(1),
            subscriptions: Mutex::new(HashMap::new()),
            probe,
        }
    }

    /// Fresh event id. Never returns the stream id.
    pub(crate) fn next_event_id(&self) -> u32 {
        loop {
            let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
            if id != STREAM_EVENT_ID {
                return id;
            }
        }
    }

    pub(crate) fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_session(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    pub(crate) fn connection_dropped(&self) -> bool {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Called before each caller-initiated connect.
    pub(crate) fn reset_for_connect(&self) {
        self.set_session(None);
        self.dropped.store(false, Ordering::Relaxed);
        *self.ping.lock().unwrap_or_else(PoisonError::into_inner) = PingTimes::default();
    }

    pub(crate) fn end_to_end_ping(&self) -> Option<Duration> {
        self.ping
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .round_trip
    }

    fn mark_ping_sent(&self) {
        self.ping
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_ping = Some(Instant::now());
    }

    fn mark_pong_received(&self) {
        let mut ping = self.ping.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sent) = ping.last_ping {
            ping.round_trip = Some(sent.elapsed());
        }
    }

    pub(crate) fn subscribe(&self, event_name: &str) -> broadcast::Receiver<Frame> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_name.to_string())
            .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0)
            .subscribe()
    }

    /// Hand an unmatched frame to its subscribers, if any. Names whose
    /// receivers have all been dropped are forgotten.
    fn publish(&self, frame: Frame) {
        let mut subscriptions = self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
        subscriptions.retain(|_, tx| tx.receiver_count() > 0);
        match subscriptions.get(&frame.event_name) {
            Some(tx) => {
                let _ = tx.send(frame);
            }
            None => log::debug!(
                "No handler for {} [{}], dropping",
                frame.event_name,
                frame.event_id
            ),
        }
    }
}

/// Instruction from the facade to the connection actor.
#[derive(Debug)]
pub(crate) enum Command {
    /// Write a frame, expecting no answer.
    Send { frame: Frame },
    /// Register `completion` under `key`, then write `frame`.
    Request {
        key: CorrelationKey,
        frame: Frame,
        completion: Completion,
    },
    /// Forget a pending request.
    Cancel { key: CorrelationKey },
    /// Close cleanly; `done` fires once the state is `Closed`.
    Close { done: oneshot::Sender<()> },
}

/// Facade-side handle on a running connection actor.
#[derive(Debug)]
pub(crate) struct ConnectionHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    /// Spawn an actor for `url`. The receiver yields the session id once
    /// the first handshake completes, or the error that ended the attempt.
    pub(crate) fn spawn(
        url: String,
        api_key: String,
        config: ClientConfig,
        shared: Arc<Shared>,
    ) -> (Self, oneshot::Receiver<Result<String>>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let actor = ConnectionActor {
            registry: RequestRegistry::new(Arc::clone(&shared.probe)),
            url,
            api_key,
            config,
            shared,
            commands: rx,
            session_id: String::new(),
        };
        let task = tokio::spawn(actor.run(ready_tx));

        (Self { commands, task }, ready_rx)
    }

    pub(crate) fn commands(&self) -> mpsc::UnboundedSender<Command> {
        self.commands.clone()
    }

    /// Close the connection and wait for the actor to exit.
    pub(crate) async fn shutdown(self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.commands.send(Command::Close { done: done_tx }).is_ok() {
            let _ = done_rx.await;
        }
        if let Err(e) = self.task.await {
            log::warn!("Connection task ended abnormally: {e}");
        }
    }
}

struct Link {
    writer: WsWriter,
    reader: WsReader,
}

/// What to do after handling a command outside the `Active` state.
enum Step {
    Continue,
    Shutdown(Option<oneshot::Sender<()>>),
}

/// Why the `Active` loop returned.
enum Exit {
    Shutdown(Option<oneshot::Sender<()>>),
    Dropped,
}

/// Why a connection attempt did not reach `Active`.
enum AttemptError {
    Shutdown(Option<oneshot::Sender<()>>),
    Failed(ProtocolError),
}

impl From<ProtocolError> for AttemptError {
    fn from(err: ProtocolError) -> Self {
        Self::Failed(err)
    }
}

fn transport(err: &anyhow::Error) -> ProtocolError {
    ProtocolError::Transport(format!("{err:#}"))
}

/// Resolves on the next keep-alive tick, or never when pings are off.
async fn next_tick(ping: &mut Option<Interval>) {
    match ping {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

struct ConnectionActor {
    url: String,
    api_key: String,
    config: ClientConfig,
    shared: Arc<Shared>,
    registry: RequestRegistry,
    commands: mpsc::UnboundedReceiver<Command>,
    /// Last session id the backend acknowledged; replayed on reconnect.
    session_id: String,
}

impl ConnectionActor {
    async fn run(mut self, ready: oneshot::Sender<Result<String>>) {
        let mut link = match self.establish().await {
            Ok(link) => {
                let _ = ready.send(Ok(self.session_id.clone()));
                link
            }
            Err(AttemptError::Failed(err)) => {
                log::warn!("Connecting to {} failed: {}", self.url, err);
                self.finish(None);
                let _ = ready.send(Err(err));
                return;
            }
            Err(AttemptError::Shutdown(done)) => {
                self.finish(done);
                let _ = ready.send(Err(ProtocolError::Cancelled));
                return;
            }
        };

        loop {
            match self.serve(&mut link).await {
                Exit::Shutdown(done) => {
                    if let Err(e) = link.writer.send_close().await {
                        log::debug!("Close frame not delivered: {e:#}");
                    }
                    self.finish(done);
                    return;
                }
                Exit::Dropped => {
                    self.shared.state.set(ConnectionState::Dropped);
                    self.shared.dropped.store(true, Ordering::Relaxed);
                    let failed = self.registry.fail_all(&ProtocolError::ConnectionLost);
                    log::warn!(
                        "Connection to {} dropped, {} pending request(s) failed",
                        self.url,
                        failed
                    );

                    match self.reconnect().await {
                        Ok(new_link) => link = new_link,
                        Err(done) => {
                            self.finish(done);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Open a socket and complete the handshake, presenting the last
    /// acknowledged session id (empty on the first attempt).
    async fn establish(&mut self) -> std::result::Result<Link, AttemptError> {
        self.shared.state.set(ConnectionState::Pending);

        let url = self.url.clone();
        let connecting = ws::connect(&url);
        tokio::pin!(connecting);
        let opened = loop {
            tokio::select! {
                result = &mut connecting => break result,
                cmd = self.commands.recv() => {
                    if let Step::Shutdown(done) = self.on_idle_command(cmd) {
                        return Err(AttemptError::Shutdown(done));
                    }
                }
            }
        };
        let Link { mut writer, mut reader } = match opened {
            Ok((writer, reader)) => Link { writer, reader },
            Err(e) => return Err(transport(&e).into()),
        };
        log::debug!("Socket open to {}, registering viewer", self.url);

        let event_id = self.shared.next_event_id();
        let key = CorrelationKey::new(REGISTER_VIEWER_ACK, event_id);
        let message = RegisterViewer {
            session_id: self.session_id.clone(),
            api_key: self.api_key.clone(),
        };
        let payload = serde_json::to_vec(&message).map_err(ProtocolError::from)?;
        let frame = Frame::new(REGISTER_VIEWER, event_id, payload);
        self.registry.register(key.clone(), Completion::Handshake);
        if let Err(e) = self.write_frame(&mut writer, &frame).await {
            self.registry.cancel(&key);
            return Err(transport(&e).into());
        }

        let deadline = tokio::time::sleep(self.config.handshake_timeout());
        tokio::pin!(deadline);
        let outcome = loop {
            tokio::select! {
                () = &mut deadline => break Err(ProtocolError::Timeout),
                msg = reader.recv() => match msg {
                    Some(Ok(WsMessage::Binary(data))) => {
                        if let Some(Dispatch::Handshake(result)) = self.handle_binary(&data) {
                            break result.map_err(ProtocolError::HandshakeFailed);
                        }
                    }
                    Some(Ok(WsMessage::Text(text))) => self.handle_text(&text),
                    Some(Ok(WsMessage::Ping(data))) => {
                        if let Err(e) = writer.send_pong(data).await {
                            break Err(transport(&e));
                        }
                    }
                    Some(Ok(WsMessage::Pong(_))) => {}
                    Some(Ok(WsMessage::Close { code, reason })) => {
                        break Err(ProtocolError::Transport(format!(
                            "closed during handshake ({code}): {reason}"
                        )));
                    }
                    Some(Err(e)) => break Err(transport(&e)),
                    None => {
                        break Err(ProtocolError::Transport(
                            "connection closed during handshake".to_string(),
                        ));
                    }
                },
                cmd = self.commands.recv() => {
                    if let Step::Shutdown(done) = self.on_idle_command(cmd) {
                        self.registry.cancel(&key);
                        let _ = writer.send_close().await;
                        return Err(AttemptError::Shutdown(done));
                    }
                }
            }
        };
        self.registry.cancel(&key);

        let ack = outcome.and_then(|payload| {
            Ok(serde_json::from_slice::<RegisterViewerAck>(&payload)?)
        });
        let ack = match ack {
            Ok(ack) => ack,
            Err(err) => {
                let _ = writer.send_close().await;
                return Err(err.into());
            }
        };

        log::info!("Connected to {} with session {}", self.url, ack.session_id);
        self.session_id.clone_from(&ack.session_id);
        self.shared.set_session(Some(Session {
            session_id: ack.session_id,
            api_key: self.api_key.clone(),
        }));
        self.shared.state.set(ConnectionState::Active);
        Ok(Link { writer, reader })
    }

    /// Serve an `Active` connection until it closes.
    async fn serve(&mut self, link: &mut Link) -> Exit {
        let mut ping = self.config.ping_interval().map(|period| {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                msg = link.reader.recv() => match msg {
                    Some(Ok(WsMessage::Binary(data))) => {
                        self.handle_binary(&data);
                    }
                    Some(Ok(WsMessage::Text(text))) => self.handle_text(&text),
                    Some(Ok(WsMessage::Ping(data))) => {
                        if let Err(e) = link.writer.send_pong(data).await {
                            log::warn!("Failed to send pong: {e:#}");
                            return Exit::Dropped;
                        }
                    }
                    Some(Ok(WsMessage::Pong(_))) => {}
                    Some(Ok(WsMessage::Close { code, reason })) => {
                        log::info!("Backend closed the connection ({code}): {reason}");
                        return Exit::Dropped;
                    }
                    Some(Err(e)) => {
                        log::warn!("{e:#}");
                        return Exit::Dropped;
                    }
                    None => {
                        log::info!("Connection stream ended");
                        return Exit::Dropped;
                    }
                },

                cmd = self.commands.recv() => match cmd {
                    Some(Command::Send { frame }) => {
                        if let Err(e) = self.write_frame(&mut link.writer, &frame).await {
                            log::warn!("Sending {} failed: {e:#}", frame.event_name);
                            return Exit::Dropped;
                        }
                    }
                    Some(Command::Request { key, frame, completion }) => {
                        if !self.registry.register(key, completion) {
                            continue;
                        }
                        if let Err(e) = self.write_frame(&mut link.writer, &frame).await {
                            log::warn!("Sending {} failed: {e:#}", frame.event_name);
                            return Exit::Dropped;
                        }
                    }
                    Some(Command::Cancel { key }) => {
                        if self.registry.cancel(&key) {
                            log::debug!("Cancelled {key}");
                        }
                    }
                    Some(Command::Close { done }) => return Exit::Shutdown(Some(done)),
                    None => return Exit::Shutdown(None),
                },

                () = next_tick(&mut ping) => {
                    self.shared.mark_ping_sent();
                    if let Err(e) = link.writer.send_text(PING_MESSAGE).await {
                        log::warn!("Ping failed: {e:#}");
                        return Exit::Dropped;
                    }
                }
            }
        }
    }

    /// Wait out the reconnect delay and retry until a handshake succeeds.
    ///
    /// `Err` means the actor should stop (caller close, client dropped,
    /// refused resume, or attempts exhausted).
    async fn reconnect(&mut self) -> std::result::Result<Link, Option<oneshot::Sender<()>>> {
        let delay = self.config.reconnect_delay();
        let mut attempts: u32 = 0;

        loop {
            log::info!("Reconnecting to {} in {:?}", self.url, delay);
            if let Step::Shutdown(done) = self.idle(delay).await {
                return Err(done);
            }
            attempts += 1;

            match self.establish().await {
                Ok(link) => {
                    log::info!("Reconnected after {attempts} attempt(s)");
                    return Ok(link);
                }
                Err(AttemptError::Shutdown(done)) => return Err(done),
                Err(AttemptError::Failed(err @ ProtocolError::HandshakeFailed(_))) => {
                    log::error!("Backend refused to resume session: {err}");
                    return Err(None);
                }
                Err(AttemptError::Failed(err)) => {
                    log::warn!("Reconnect attempt {attempts} failed: {err}");
                    if self
                        .config
                        .max_reconnect_attempts
                        .is_some_and(|max| attempts >= max)
                    {
                        log::error!("Giving up on {} after {attempts} attempts", self.url);
                        return Err(None);
                    }
                    self.shared.state.set(ConnectionState::Dropped);
                }
            }
        }
    }

    /// Sleep for `delay` while still answering commands.
    async fn idle(&mut self, delay: Duration) -> Step {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => return Step::Continue,
                cmd = self.commands.recv() => {
                    if let Step::Shutdown(done) = self.on_idle_command(cmd) {
                        return Step::Shutdown(done);
                    }
                }
            }
        }
    }

    /// Handle a command while not `Active`: nothing is written.
    fn on_idle_command(&mut self, cmd: Option<Command>) -> Step {
        match cmd {
            Some(Command::Send { frame }) => {
                log::debug!("Not connected, dropping {}", frame.event_name);
            }
            Some(Command::Request { completion, .. }) => {
                completion.reject(ProtocolError::NotConnected);
            }
            Some(Command::Cancel { key }) => {
                self.registry.cancel(&key);
            }
            Some(Command::Close { done }) => return Step::Shutdown(Some(done)),
            None => return Step::Shutdown(None),
        }
        Step::Continue
    }

    fn handle_binary(&mut self, data: &[u8]) -> Option<Dispatch> {
        let frame = match Frame::decode(data) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Dropping undecodable frame: {e}");
                return None;
            }
        };
        self.shared.diagnostics.record(Direction::Incoming, &frame);

        let dispatch = self.registry.dispatch(&frame);
        if dispatch == Dispatch::Unmatched {
            self.shared.publish(frame);
        }
        Some(dispatch)
    }

    fn handle_text(&self, text: &str) {
        if text == PONG_MESSAGE {
            self.shared.mark_pong_received();
        } else {
            log::debug!("Ignoring text message: {text}");
        }
    }

    async fn write_frame(&self, writer: &mut WsWriter, frame: &Frame) -> anyhow::Result<()> {
        self.shared.diagnostics.record(Direction::Outgoing, frame);
        writer.send_binary(frame.encode()).await
    }

    /// Terminal cleanup: everything pending is cancelled, the session is
    /// forgotten and the state settles at `Closed` before `done` fires.
    fn finish(&mut self, done: Option<oneshot::Sender<()>>) {
        let cancelled = self.registry.fail_all(&ProtocolError::Cancelled);
        if cancelled > 0 {
            log::debug!("Cancelled {cancelled} pending request(s) on close");
        }
        self.shared.set_session(None);
        self.shared.state.set(ConnectionState::Closed);

        self.commands.close();
        while let Ok(cmd) = self.commands.try_recv() {
            match cmd {
                Command::Request { completion, .. } => completion.reject(ProtocolError::NotConnected),
                Command::Close { done } => {
                    let _ = done.send(());
                }
                Command::Send { .. } | Command::Cancel { .. } => {}
            }
        }

        if let Some(done) = done {
            let _ = done.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::JsonStatusProbe;

    fn shared() -> Shared {
        Shared::new(&ClientConfig::default(), Arc::new(JsonStatusProbe))
    }

    #[test]
    fn test_state_defaults_to_closed() {
        let state = SharedConnectionState::new();
        assert_eq!(state.get(), ConnectionState::Closed);
        assert!(!state.is_active());
    }

    #[tokio::test]
    async fn test_state_watchers_see_transitions() {
        let state = SharedConnectionState::new();
        let mut rx = state.watch();

        state.set(ConnectionState::Pending);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ConnectionState::Pending);

        state.set(ConnectionState::Active);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Active);
        assert!(state.is_active());
    }

    #[test]
    fn test_event_ids_skip_stream_id() {
        let shared = shared();
        assert_eq!(shared.next_event_id(), 1);
        assert_eq!(shared.next_event_id(), 2);

        shared.event_counter.store(u32::MAX, Ordering::Relaxed);
        assert_eq!(shared.next_event_id(), u32::MAX);
        assert_eq!(shared.next_event_id(), 1);
    }

    #[test]
    fn test_unmatched_frames_reach_subscribers() {
        let shared = shared();
        let mut rx = shared.subscribe("ERROR_DATA");

        shared.publish(Frame::new("ERROR_DATA", 0, b"oops".to_vec()));
        shared.publish(Frame::new("RASTER_TILE_DATA", 0, Vec::new()));

        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.payload.as_ref(), b"oops");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscriptions_are_forgotten() {
        let shared = shared();
        let kept = shared.subscribe("ERROR_DATA");
        drop(shared.subscribe("RASTER_TILE_DATA"));

        shared.publish(Frame::new("SPATIAL_PROFILE_DATA", 0, Vec::new()));

        let names: Vec<String> = shared
            .subscriptions
            .lock()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(names, vec!["ERROR_DATA".to_string()]);
        drop(kept);
    }

    #[test]
    fn test_reset_for_connect_forgets_session() {
        let shared = shared();
        shared.set_session(Some(Session {
            session_id: "abc".to_string(),
            api_key: "1234".to_string(),
        }));
        shared.dropped.store(true, Ordering::Relaxed);

        shared.reset_for_connect();
        assert!(shared.session().is_none());
        assert!(!shared.connection_dropped());
    }

    #[test]
    fn test_ping_round_trip_needs_a_ping() {
        let shared = shared();
        shared.mark_pong_received();
        assert_eq!(shared.end_to_end_ping(), None);

        shared.mark_ping_sent();
        shared.mark_pong_received();
        assert!(shared.end_to_end_ping().is_some());

        shared.reset_for_connect();
        assert_eq!(shared.end_to_end_ping(), None);
    }

    #[test]
    fn test_session_debug_hides_api_key() {
        let session = Session {
            session_id: "abc".to_string(),
            api_key: "1234".to_string(),
        };
        let debug = format!("{session:?}");
        assert!(debug.contains("abc"));
        assert!(!debug.contains("1234"));
    }
}
