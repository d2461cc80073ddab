//! Protocol client facade.
//!
//! [`ProtocolClient`] is what the host application holds. It owns at most
//! one connection actor at a time and turns calls into actor commands:
//!
//! ```ignore
//! let client = ProtocolClient::new(ClientConfig::default());
//! let session_id = client.connect("ws://localhost:3002", "1234").await?;
//!
//! let listing = client.file_list("").await?;
//! let raw = client.request("OPEN_FILE", payload).await?;
//!
//! let mut errors = client.subscribe("ERROR_DATA");
//! client.close().await;
//! ```
//!
//! Requests are guarded by the connection state: anything but `Active`
//! fails with [`ProtocolError::NotConnected`] without touching the socket.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex as AsyncMutex};

use crate::config::ClientConfig;
use crate::connection::{Command, ConnectionHandle, ConnectionState, Session, Shared};
use crate::diagnostics::EventLog;
use crate::error::{ProtocolError, Result};
use crate::protocol::events::{self, response_event_for};
use crate::protocol::messages::{
    FileInfoRequest, FileInfoResponse, FileListRequest, FileListResponse, JsonStatusProbe,
};
use crate::protocol::Frame;
use crate::registry::{Completion, CorrelationKey, StatusProbe};

/// Client for the backend's binary event protocol.
///
/// Cheap to share by reference; all methods take `&self`.
#[derive(Debug)]
pub struct ProtocolClient {
    config: ClientConfig,
    shared: Arc<Shared>,
    link: Mutex<Option<ConnectionHandle>>,
    connecting: AsyncMutex<()>,
}

impl ProtocolClient {
    /// Create a disconnected client using the JSON status probe.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_probe(config, Arc::new(JsonStatusProbe))
    }

    /// Create a disconnected client with a custom response status probe.
    pub fn with_probe(config: ClientConfig, probe: Arc<dyn StatusProbe>) -> Self {
        let shared = Arc::new(Shared::new(&config, probe));
        Self {
            config,
            shared,
            link: Mutex::new(None),
            connecting: AsyncMutex::new(()),
        }
    }

    /// Configuration the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Connect and register with the backend, returning the session id.
    ///
    /// Any previous connection is closed first. Failures before the
    /// connection becomes `Active` are returned here and do not trigger
    /// reconnection.
    pub async fn connect(&self, url: impl Into<String>, api_key: impl Into<String>) -> Result<String> {
        let _guard = self.connecting.lock().await;
        self.shutdown_link().await;
        self.shared.reset_for_connect();

        let url = url.into();
        log::info!("Connecting to {url}");
        let (handle, ready) =
            ConnectionHandle::spawn(url, api_key.into(), self.config.clone(), Arc::clone(&self.shared));
        *self.link.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        ready
            .await
            .unwrap_or_else(|_closed| Err(ProtocolError::ConnectionLost))
    }

    /// Connect using the URL and API key from the configuration.
    pub async fn connect_from_config(&self) -> Result<String> {
        if self.config.url.is_empty() {
            return Err(ProtocolError::Transport("no backend URL configured".to_string()));
        }
        let api_key = self.config.api_key.clone().unwrap_or_default();
        self.connect(self.config.url.clone(), api_key).await
    }

    /// Close the connection. Pending requests fail with
    /// [`ProtocolError::Cancelled`]; no reconnection follows.
    pub async fn close(&self) {
        self.shutdown_link().await;
        self.shared.state.set(ConnectionState::Closed);
    }

    async fn shutdown_link(&self) {
        let handle = self.link.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    fn commands(&self) -> Result<mpsc::UnboundedSender<Command>> {
        if !self.shared.state.is_active() {
            return Err(ProtocolError::NotConnected);
        }
        self.link
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(ConnectionHandle::commands)
            .ok_or(ProtocolError::NotConnected)
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Send `event_name` with a fresh event id and wait for the paired
    /// response payload.
    pub async fn request(&self, event_name: &str, payload: impl Into<Bytes>) -> Result<Bytes> {
        if !self.shared.state.is_active() {
            return Err(ProtocolError::NotConnected);
        }
        let event_id = self.shared.next_event_id();
        self.start_request(event_name, event_id, payload)?.wait().await
    }

    /// Send `event_name` under an explicit event id and return a handle on
    /// the response. The handle cancels the request if dropped unfinished.
    pub fn start_request(
        &self,
        event_name: &str,
        event_id: u32,
        payload: impl Into<Bytes>,
    ) -> Result<PendingResponse> {
        let commands = self.commands()?;
        let key = CorrelationKey::new(response_event_for(event_name), event_id);
        let (tx, rx) = oneshot::channel();

        commands
            .send(Command::Request {
                key: key.clone(),
                frame: Frame::new(event_name, event_id, payload),
                completion: Completion::Single(tx),
            })
            .map_err(|_closed| ProtocolError::NotConnected)?;

        Ok(PendingResponse {
            key,
            rx,
            commands,
            timeout: self.config.request_timeout(),
            finished: false,
        })
    }

    /// Serialize `request` as JSON, send it, and parse the response.
    pub async fn request_json<Req, Resp>(&self, event_name: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request)?;
        let response = self.request(event_name, payload).await?;
        Ok(serde_json::from_slice(&response)?)
    }

    /// Send `event_name` and stream every matching response until the
    /// backend marks one terminal.
    pub fn start_stream(&self, event_name: &str, payload: impl Into<Bytes>) -> Result<ResponseStream> {
        self.start_stream_for(event_name, &response_event_for(event_name), payload)
    }

    /// Like [`start_stream`](Self::start_stream) for requests whose
    /// responses arrive under an unrelated event name.
    pub fn start_stream_for(
        &self,
        event_name: &str,
        response_event: &str,
        payload: impl Into<Bytes>,
    ) -> Result<ResponseStream> {
        let commands = self.commands()?;
        let event_id = self.shared.next_event_id();
        let key = CorrelationKey::new(response_event, event_id);
        let (tx, rx) = mpsc::unbounded_channel();

        commands
            .send(Command::Request {
                key: key.clone(),
                frame: Frame::new(event_name, event_id, payload),
                completion: Completion::Stream(tx),
            })
            .map_err(|_closed| ProtocolError::NotConnected)?;

        Ok(ResponseStream {
            key,
            rx,
            commands,
            timeout: self.config.request_timeout(),
            finished: false,
        })
    }

    /// Send an event that has no response. Returns the event id used.
    pub fn send_event(&self, event_name: &str, payload: impl Into<Bytes>) -> Result<u32> {
        let commands = self.commands()?;
        let event_id = self.shared.next_event_id();
        commands
            .send(Command::Send {
                frame: Frame::new(event_name, event_id, payload),
            })
            .map_err(|_closed| ProtocolError::NotConnected)?;
        Ok(event_id)
    }

    /// Receive every unmatched inbound frame named `event_name`, e.g.
    /// `ERROR_DATA` or id-0 image data.
    pub fn subscribe(&self, event_name: &str) -> broadcast::Receiver<Frame> {
        self.shared.subscribe(event_name)
    }

    // ========================================================================
    // Typed helpers
    // ========================================================================

    /// List `directory` on the backend.
    pub async fn file_list(&self, directory: &str) -> Result<FileListResponse> {
        let request = FileListRequest {
            directory: directory.to_string(),
        };
        self.request_json(events::FILE_LIST_REQUEST, &request).await
    }

    /// Describe one HDU of `file` in `directory`.
    pub async fn file_info(&self, directory: &str, file: &str, hdu: &str) -> Result<FileInfoResponse> {
        let request = FileInfoRequest {
            directory: directory.to_string(),
            file: file.to_string(),
            hdu: hdu.to_string(),
        };
        self.request_json(events::FILE_INFO_REQUEST, &request).await
    }

    // ========================================================================
    // Observability
    // ========================================================================

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    /// Receiver notified on every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.watch()
    }

    /// Session from the most recent successful handshake.
    pub fn session(&self) -> Option<Session> {
        self.shared.session()
    }

    /// Whether the connection has dropped unexpectedly since the last
    /// `connect`.
    pub fn connection_dropped(&self) -> bool {
        self.shared.connection_dropped()
    }

    /// Round trip of the last answered keep-alive ping.
    pub fn end_to_end_ping(&self) -> Option<Duration> {
        self.shared.end_to_end_ping()
    }

    /// Protocol event log.
    pub fn diagnostics(&self) -> &EventLog {
        &self.shared.diagnostics
    }
}

/// Handle on one in-flight request.
#[derive(Debug)]
pub struct PendingResponse {
    key: CorrelationKey,
    rx: oneshot::Receiver<Result<Bytes>>,
    commands: mpsc::UnboundedSender<Command>,
    timeout: Option<Duration>,
    finished: bool,
}

impl PendingResponse {
    /// Key the response is correlated by.
    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }

    /// Fail with [`ProtocolError::Timeout`] if no response arrives within
    /// `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait for the response payload.
    pub async fn wait(mut self) -> Result<Bytes> {
        let received = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut self.rx).await {
                Ok(received) => received,
                Err(_elapsed) => {
                    log::debug!("{} timed out after {:?}", self.key, limit);
                    self.send_cancel();
                    return Err(ProtocolError::Timeout);
                }
            },
            None => (&mut self.rx).await,
        };
        self.finished = true;
        received.unwrap_or_else(|_closed| Err(ProtocolError::ConnectionLost))
    }

    /// Abandon the request; a late response is ignored.
    pub fn cancel(mut self) {
        self.send_cancel();
    }

    fn send_cancel(&mut self) {
        self.finished = true;
        let _ = self.commands.send(Command::Cancel {
            key: self.key.clone(),
        });
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        if !self.finished {
            self.send_cancel();
        }
    }
}

/// Handle on a streamed response.
#[derive(Debug)]
pub struct ResponseStream {
    key: CorrelationKey,
    rx: mpsc::UnboundedReceiver<Result<Bytes>>,
    commands: mpsc::UnboundedSender<Command>,
    timeout: Option<Duration>,
    finished: bool,
}

impl ResponseStream {
    /// Key the stream is correlated by.
    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }

    /// Fail with [`ProtocolError::Timeout`] if the gap before any single
    /// delivery exceeds `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Next payload, or `None` after the terminal one. An error ends the
    /// stream; a timeout also cancels it.
    pub async fn next(&mut self) -> Option<Result<Bytes>> {
        if self.finished {
            return None;
        }
        let item = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.rx.recv()).await {
                Ok(item) => item,
                Err(_elapsed) => {
                    log::debug!("{} stream timed out after {:?}", self.key, limit);
                    self.send_cancel();
                    return Some(Err(ProtocolError::Timeout));
                }
            },
            None => self.rx.recv().await,
        };
        if matches!(item, None | Some(Err(_))) {
            self.finished = true;
        }
        item
    }

    /// Stop receiving.
    pub fn cancel(mut self) {
        self.send_cancel();
    }

    fn send_cancel(&mut self) {
        self.finished = true;
        let _ = self.commands.send(Command::Cancel {
            key: self.key.clone(),
        });
    }
}

impl Drop for ResponseStream {
    fn drop(&mut self) {
        if !self.finished {
            self.send_cancel();
        }
    }
}
