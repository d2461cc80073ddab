//! Protocol-wide constants.
//!
//! Centralizes wire sizes and default timings so they are discoverable in
//! one place. Values that callers may tune are only *defaults* here; the
//! effective values come from [`crate::config::ClientConfig`].

use std::time::Duration;

// ============================================================================
// Wire format
// ============================================================================

/// Width of the NUL-padded event name field.
pub const EVENT_NAME_SIZE: usize = 32;

/// Offset of the little-endian `u32` event id.
pub const EVENT_ID_OFFSET: usize = 32;

/// Offset of the four reserved (zero) bytes.
pub const RESERVED_OFFSET: usize = 36;

/// Total header size; the payload starts here.
pub const HEADER_SIZE: usize = 40;

/// Event id carried by unsolicited "stream" frames.
pub const STREAM_EVENT_ID: u32 = 0;

// ============================================================================
// Connection lifecycle
// ============================================================================

/// Delay before a reconnection attempt after an unexpected close.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);

/// How long to wait for `REGISTER_VIEWER_ACK` after the socket opens.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between application-level `PING` messages.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(5);

/// Text message sent as an application-level ping.
pub const PING_MESSAGE: &str = "PING";

/// Text message the backend answers a ping with.
pub const PONG_MESSAGE: &str = "PONG";

// ============================================================================
// Diagnostics
// ============================================================================

/// Default number of entries kept by the event log ring.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 500;

/// Longest payload summary kept in a log entry (characters).
pub const LOG_SUMMARY_LIMIT: usize = 256;

/// Buffer of the broadcast channels (event log stream, event subscriptions).
pub const BROADCAST_CAPACITY: usize = 64;
