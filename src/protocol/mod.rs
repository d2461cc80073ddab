//! Wire protocol: frame codec, event names and typed payloads.
//!
//! # Frame format
//!
//! ```text
//! ┌────────────────────────┬──────────────┬──────────────┬─────────────┐
//! │ Event name (32, NUL)   │ Event id (4) │ Reserved (4) │ Payload ... │
//! └────────────────────────┴──────────────┴──────────────┴─────────────┘
//! ```
//!
//! The event id is little-endian. Requests carry a fresh id; the backend
//! echoes it on the paired response. Id `0` is used for unsolicited stream
//! data.

pub mod events;
mod frame;
pub mod messages;

pub use crate::constants::HEADER_SIZE;
pub use frame::Frame;
