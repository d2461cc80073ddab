//! Request registry: correlates outgoing requests with their responses.
//!
//! Every pending request is keyed by `(response event name, event id)`, so
//! any number of requests of the same type can be in flight at once. The
//! registry is owned by the connection actor and is never shared; it is a
//! plain synchronous structure driven by [`RequestRegistry::dispatch`] for
//! each inbound frame, in arrival order.
//!
//! # Completion kinds
//!
//! - **Single** - resolved once, then removed.
//! - **Stream** - delivered to repeatedly until a terminal frame, a failure,
//!   or the receiver going away.
//! - **Handshake** - internal; the result is handed back to the caller of
//!   `dispatch` instead of being delivered through a channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::error::{ProtocolError, Result};
use crate::protocol::Frame;

/// Identifies the response a pending request is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    /// Name of the expected response event.
    pub event_name: String,
    /// Event id the request was sent with.
    pub event_id: u32,
}

impl CorrelationKey {
    /// Create a key.
    pub fn new(event_name: impl Into<String>, event_id: u32) -> Self {
        Self {
            event_name: event_name.into(),
            event_id,
        }
    }

    /// Key an inbound frame would match.
    pub fn of(frame: &Frame) -> Self {
        Self::new(frame.event_name.clone(), frame.event_id)
    }
}

impl std::fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.event_name, self.event_id)
    }
}

/// Verdict of a [`StatusProbe`] on one response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// `Err(message)` when the backend reported failure.
    pub status: std::result::Result<(), String>,
    /// Whether this is the last frame of a streamed response.
    pub terminal: bool,
}

impl Outcome {
    /// Successful, non-terminal.
    pub fn success() -> Self {
        Self {
            status: Ok(()),
            terminal: false,
        }
    }

    /// Failed with `message`. Failures always end a request.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Err(message.into()),
            terminal: true,
        }
    }
}

/// Decides whether a response payload reports success.
///
/// Payloads are opaque to the registry; the probe is the only place that
/// looks inside them.
pub trait StatusProbe: Send + Sync + std::fmt::Debug {
    /// Inspect the payload of a response named `event_name`.
    fn inspect(&self, event_name: &str, payload: &[u8]) -> Outcome;
}

/// How a pending request is completed.
#[derive(Debug)]
pub enum Completion {
    /// Resolved exactly once.
    Single(oneshot::Sender<Result<Bytes>>),
    /// Receives every matching frame until the stream ends.
    Stream(mpsc::UnboundedSender<Result<Bytes>>),
    /// Connection handshake; result returned from `dispatch`.
    Handshake,
}

impl Completion {
    /// Resolve with an error, whatever the kind.
    pub(crate) fn reject(self, error: ProtocolError) {
        match self {
            Self::Single(tx) => {
                let _ = tx.send(Err(error));
            }
            Self::Stream(tx) => {
                let _ = tx.send(Err(error));
            }
            Self::Handshake => {}
        }
    }
}

/// A request waiting for its response.
#[derive(Debug)]
struct PendingRequest {
    completion: Completion,
    created_at: Instant,
}

/// What `dispatch` did with a frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// A single-shot request was resolved successfully.
    Resolved,
    /// A request (single or stream) was rejected with the backend's message.
    Rejected,
    /// A stream received a frame and stays open.
    Delivered,
    /// A stream received its terminal frame and was removed.
    Finished,
    /// The handshake response arrived.
    Handshake(std::result::Result<Bytes, String>),
    /// No pending request matches; the frame was not consumed.
    Unmatched,
}

/// Pending-request table for one connection.
#[derive(Debug)]
pub struct RequestRegistry {
    pending: HashMap<CorrelationKey, PendingRequest>,
    probe: Arc<dyn StatusProbe>,
}

impl RequestRegistry {
    /// Create an empty registry using `probe` to judge responses.
    pub fn new(probe: Arc<dyn StatusProbe>) -> Self {
        Self {
            pending: HashMap::new(),
            probe,
        }
    }

    /// Track a request under `key`.
    ///
    /// Returns `false` if the key is already taken; the new completion is
    /// then rejected with [`ProtocolError::DuplicateRequest`] and the existing
    /// entry is left untouched.
    pub fn register(&mut self, key: CorrelationKey, completion: Completion) -> bool {
        if self.pending.contains_key(&key) {
            log::warn!("Refusing duplicate pending request {}", key);
            completion.reject(ProtocolError::DuplicateRequest(key));
            return false;
        }

        self.pending.insert(
            key,
            PendingRequest {
                completion,
                created_at: Instant::now(),
            },
        );
        true
    }

    /// Route an inbound frame to the request waiting for it.
    pub fn dispatch(&mut self, frame: &Frame) -> Dispatch {
        let key = CorrelationKey::of(frame);
        let Some(entry) = self.pending.remove(&key) else {
            return Dispatch::Unmatched;
        };

        let outcome = self.probe.inspect(&frame.event_name, &frame.payload);
        log::trace!(
            "Dispatching {} after {:?}",
            key,
            entry.created_at.elapsed()
        );

        match (entry.completion, outcome.status) {
            (Completion::Handshake, status) => {
                Dispatch::Handshake(status.map(|()| frame.payload.clone()))
            }
            (Completion::Single(tx), Ok(())) => {
                let _ = tx.send(Ok(frame.payload.clone()));
                Dispatch::Resolved
            }
            (Completion::Single(tx), Err(message)) => {
                let _ = tx.send(Err(ProtocolError::Rejected(message)));
                Dispatch::Rejected
            }
            (Completion::Stream(tx), Err(message)) => {
                let _ = tx.send(Err(ProtocolError::Rejected(message)));
                Dispatch::Rejected
            }
            (Completion::Stream(tx), Ok(())) => {
                if tx.send(Ok(frame.payload.clone())).is_err() {
                    // Receiver dropped: the caller no longer wants the stream.
                    return Dispatch::Finished;
                }
                if outcome.terminal {
                    return Dispatch::Finished;
                }
                self.pending.insert(
                    key,
                    PendingRequest {
                        completion: Completion::Stream(tx),
                        created_at: entry.created_at,
                    },
                );
                Dispatch::Delivered
            }
        }
    }

    /// Drop the request under `key` without resolving it.
    ///
    /// The caller is expected to have stopped listening already.
    pub fn cancel(&mut self, key: &CorrelationKey) -> bool {
        self.pending.remove(key).is_some()
    }

    /// Reject every pending request with `error` and clear the table.
    ///
    /// Returns the number of requests failed.
    pub fn fail_all(&mut self, error: &ProtocolError) -> usize {
        let count = self.pending.len();
        for (_, entry) in self.pending.drain() {
            entry.completion.reject(error.clone());
        }
        count
    }

    /// Whether a request is pending under `key`.
    pub fn contains(&self, key: &CorrelationKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
