//! Event log for protocol traffic.
//!
//! The connection offers every outbound and inbound frame to an
//! [`EventLog`]. When enabled (and the event name isn't muted) the frame is
//! summarized into a [`LogEntry`], kept in a bounded ring, published to
//! subscribers, and mirrored to the `log` crate at debug level:
//!
//! ```text
//! FILE_LIST_REQUEST [3] ==>
//! <== FILE_LIST_RESPONSE [3]
//! <== RASTER_TILE_DATA [Stream]
//! ```
//!
//! The log is observational only.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::constants::{BROADCAST_CAPACITY, LOG_SUMMARY_LIMIT};
use crate::protocol::Frame;

/// Which way a frame travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    /// Sent to the backend.
    Outgoing,
    /// Received from the backend.
    Incoming,
}

/// One recorded frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// When the frame was recorded.
    pub timestamp: DateTime<Utc>,
    /// Direction of travel.
    pub direction: Direction,
    /// Event name.
    pub event_name: String,
    /// Event id (`0` for stream frames).
    pub event_id: u32,
    /// Payload size in bytes.
    pub payload_len: usize,
    /// Printable excerpt of the payload.
    pub summary: String,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = if self.event_id == 0 {
            "Stream".to_string()
        } else {
            self.event_id.to_string()
        };
        match self.direction {
            Direction::Outgoing => write!(f, "{} [{}] ==>", self.event_name, id),
            Direction::Incoming => write!(f, "<== {} [{}]", self.event_name, id),
        }
    }
}

/// Bounded, toggleable record of recent protocol traffic.
#[derive(Debug)]
pub struct EventLog {
    enabled: AtomicBool,
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
    muted: RwLock<HashSet<String>>,
    tx: broadcast::Sender<LogEntry>,
}

impl EventLog {
    /// Create a log keeping at most `capacity` entries.
    pub fn new(enabled: bool, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            enabled: AtomicBool::new(enabled),
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            muted: RwLock::new(HashSet::new()),
            tx,
        }
    }

    /// Whether frames are currently recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Turn recording on or off.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Stop recording frames named `event_name`.
    pub fn mute(&self, event_name: impl Into<String>) {
        self.muted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event_name.into());
    }

    /// Resume recording frames named `event_name`.
    pub fn unmute(&self, event_name: &str) {
        self.muted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(event_name);
    }

    /// Whether `event_name` is muted.
    pub fn is_muted(&self, event_name: &str) -> bool {
        self.muted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(event_name)
    }

    /// Offer a frame to the log. No-op when disabled or muted.
    pub fn record(&self, direction: Direction, frame: &Frame) {
        if !self.is_enabled() || self.is_muted(&frame.event_name) {
            return;
        }

        let entry = LogEntry {
            timestamp: Utc::now(),
            direction,
            event_name: frame.event_name.clone(),
            event_id: frame.event_id,
            payload_len: frame.payload.len(),
            summary: summarize(&frame.payload),
        };
        log::debug!("{entry}");

        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }

        // No subscribers is fine.
        let _ = self.tx.send(entry);
    }

    /// Snapshot of the recorded entries, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Drop all recorded entries.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Live stream of new entries.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }
}

/// Printable excerpt of a payload: UTF-8 text is kept (truncated), binary
/// payloads are described by size.
fn summarize(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if text.chars().count() > LOG_SUMMARY_LIMIT => {
            let cut: String = text.chars().take(LOG_SUMMARY_LIMIT).collect();
            format!("{cut}...")
        }
        Ok(text) => text.to_string(),
        Err(_) => format!("<{} bytes binary>", payload.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str, id: u32) -> Frame {
        Frame::new(name, id, br#"{"directory":""}"#.to_vec())
    }

    #[test]
    fn test_disabled_log_records_nothing() {
        let log = EventLog::new(false, 10);
        log.record(Direction::Outgoing, &frame("FILE_LIST_REQUEST", 1));
        assert!(log.entries().is_empty());

        log.set_enabled(true);
        log.record(Direction::Outgoing, &frame("FILE_LIST_REQUEST", 2));
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn test_ring_drops_oldest() {
        let log = EventLog::new(true, 3);
        for id in 1..=5 {
            log.record(Direction::Incoming, &frame("RASTER_TILE_DATA", id));
        }
        let ids: Vec<u32> = log.entries().iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn test_muted_events_are_skipped() {
        let log = EventLog::new(true, 10);
        log.mute("SET_CURSOR");
        log.record(Direction::Outgoing, &frame("SET_CURSOR", 1));
        log.record(Direction::Outgoing, &frame("SET_IMAGE_VIEW", 2));
        assert_eq!(log.entries().len(), 1);

        log.unmute("SET_CURSOR");
        log.record(Direction::Outgoing, &frame("SET_CURSOR", 3));
        assert_eq!(log.entries().len(), 2);
    }

    #[test]
    fn test_entry_display_uses_arrows() {
        let log = EventLog::new(true, 10);
        log.record(Direction::Outgoing, &frame("FILE_LIST_REQUEST", 3));
        log.record(Direction::Incoming, &frame("FILE_LIST_RESPONSE", 3));
        log.record(Direction::Incoming, &frame("RASTER_IMAGE_DATA", 0));

        let lines: Vec<String> = log.entries().iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "FILE_LIST_REQUEST [3] ==>",
                "<== FILE_LIST_RESPONSE [3]",
                "<== RASTER_IMAGE_DATA [Stream]",
            ]
        );
    }

    #[test]
    fn test_summary_of_binary_payload() {
        let log = EventLog::new(true, 10);
        log.record(Direction::Incoming, &Frame::new("RASTER_TILE_DATA", 0, vec![0xFF, 0xFE, 0x00]));
        let entry = &log.entries()[0];
        assert_eq!(entry.payload_len, 3);
        assert_eq!(entry.summary, "<3 bytes binary>");
    }

    #[test]
    fn test_summary_truncates_long_text() {
        let summary = summarize("x".repeat(LOG_SUMMARY_LIMIT + 10).as_bytes());
        assert_eq!(summary.len(), LOG_SUMMARY_LIMIT + 3);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_clear_empties_ring() {
        let log = EventLog::new(true, 10);
        log.record(Direction::Outgoing, &frame("OPEN_FILE", 1));
        log.clear();
        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_new_entries() {
        let log = EventLog::new(true, 10);
        let mut rx = log.subscribe();
        log.record(Direction::Incoming, &frame("ERROR_DATA", 0));

        let entry = rx.recv().await.unwrap();
        assert_eq!(entry.event_name, "ERROR_DATA");
        assert_eq!(entry.direction, Direction::Incoming);
    }
}
