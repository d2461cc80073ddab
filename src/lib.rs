//! Viewer link - binary event-protocol client for an image viewer backend.
//!
//! Connects the viewer to its remote compute backend over one WebSocket,
//! frames outgoing requests, decodes incoming frames, routes responses back
//! to the caller that asked for them, and recovers from connection loss.
//!
//! # Architecture
//!
//! - **Frame codec** - fixed 40-byte header, opaque payload
//! - **Request registry** - correlates responses by `(event name, event id)`
//! - **Connection manager** - one actor task per connection; handshake,
//!   keep-alive and reconnection
//! - **Protocol client** - the facade the host application holds
//!
//! # Modules
//!
//! - [`protocol`] - frame codec, event names, typed payloads
//! - [`registry`] - pending-request table
//! - [`connection`] - connection state and the connection actor
//! - [`client`] - [`ProtocolClient`] and its request handles
//! - [`diagnostics`] - event log of protocol traffic
//! - [`config`] - [`ClientConfig`]

pub mod client;
pub mod config;
pub mod connection;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod ws;

pub use client::{PendingResponse, ProtocolClient, ResponseStream};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use connection::{ConnectionState, Session, SharedConnectionState};
pub use diagnostics::{Direction, EventLog, LogEntry};
pub use error::{FrameError, ProtocolError, Result};
pub use protocol::Frame;
pub use registry::{CorrelationKey, Outcome, StatusProbe};
