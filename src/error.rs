//! Error types for the backend protocol client.
//!
//! Two layers of errors exist:
//!
//! - [`FrameError`] - decode-time failures of a single wire frame. These are
//!   recovered locally by the connection (logged and dropped).
//! - [`ProtocolError`] - everything a caller of the public API can observe.
//!
//! `ProtocolError` is `Clone` because a single connection loss is broadcast
//! to every pending request.

use crate::registry::CorrelationKey;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// A frame could not be decoded from raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Buffer shorter than the fixed 40-byte header (carries the actual length).
    TooShort(usize),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort(len) => write!(
                f,
                "Frame too short: {len} bytes (header is {} bytes)",
                crate::protocol::HEADER_SIZE
            ),
        }
    }
}

impl std::error::Error for FrameError {}

/// Errors surfaced by the protocol client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Send or request attempted while the connection is not `Active`.
    NotConnected,
    /// The backend rejected the viewer registration.
    HandshakeFailed(String),
    /// A frame failed to decode.
    Frame(FrameError),
    /// The connection closed unexpectedly while the request was outstanding.
    ConnectionLost,
    /// No response arrived within the configured timeout.
    Timeout,
    /// The request was cancelled by the caller or by `close()`.
    Cancelled,
    /// The backend answered with `success: false`.
    Rejected(String),
    /// A request with the same correlation key is already pending.
    DuplicateRequest(CorrelationKey),
    /// WebSocket-level failure (connect, read or write).
    Transport(String),
    /// A typed payload could not be encoded or decoded.
    Serialization(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "Not connected"),
            Self::HandshakeFailed(msg) => write!(f, "Handshake failed: {msg}"),
            Self::Frame(err) => write!(f, "{err}"),
            Self::ConnectionLost => write!(f, "Connection lost"),
            Self::Timeout => write!(f, "Operation timed out"),
            Self::Cancelled => write!(f, "Request cancelled"),
            Self::Rejected(msg) => write!(f, "{msg}"),
            Self::DuplicateRequest(key) => write!(f, "Duplicate pending request: {key}"),
            Self::Transport(msg) => write!(f, "Transport error: {msg}"),
            Self::Serialization(msg) => write!(f, "Serialization error: {msg}"),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Frame(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FrameError> for ProtocolError {
    fn from(err: FrameError) -> Self {
        Self::Frame(err)
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
