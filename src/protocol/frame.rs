//! Fixed-header binary frame codec.
//!
//! Every message exchanged with the backend is one frame:
//!
//! ```text
//! [name: 32 bytes, NUL padded] [event id: u32 LE] [reserved: 4 zero bytes] [payload...]
//! ```
//!
//! The codec is pure and stateless; payloads are opaque bytes.

use bytes::Bytes;

use crate::constants::{
    EVENT_ID_OFFSET, EVENT_NAME_SIZE, HEADER_SIZE, RESERVED_OFFSET, STREAM_EVENT_ID,
};
use crate::error::FrameError;

/// One protocol message as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Event identifier, at most 32 single-byte characters.
    pub event_name: String,
    /// Correlation id; `0` marks unsolicited stream data.
    pub event_id: u32,
    /// Opaque payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame.
    pub fn new(event_name: impl Into<String>, event_id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            event_name: event_name.into(),
            event_id,
            payload: payload.into(),
        }
    }

    /// Whether this frame is unsolicited stream data rather than a reply.
    pub fn is_stream(&self) -> bool {
        self.event_id == STREAM_EVENT_ID
    }

    /// Encode into wire bytes.
    ///
    /// Names longer than 32 characters are truncated; characters above
    /// `0xFF` are written as zero.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_SIZE + self.payload.len()];

        for (slot, ch) in buf[..EVENT_NAME_SIZE]
            .iter_mut()
            .zip(self.event_name.chars())
        {
            let code = u32::from(ch);
            *slot = if code > 0xFF { 0 } else { code as u8 };
        }

        buf[EVENT_ID_OFFSET..RESERVED_OFFSET].copy_from_slice(&self.event_id.to_le_bytes());
        // RESERVED_OFFSET..HEADER_SIZE stays zero.
        buf[HEADER_SIZE..].copy_from_slice(&self.payload);
        buf
    }

    /// Decode wire bytes into a frame.
    ///
    /// # Errors
    ///
    /// [`FrameError::TooShort`] under 40 bytes. Anything longer decodes; a
    /// leading NUL yields an empty name.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FrameError::TooShort(bytes.len()));
        }

        let name_field = &bytes[..EVENT_NAME_SIZE];
        let name_len = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(EVENT_NAME_SIZE);
        let event_name: String = name_field[..name_len].iter().map(|&b| char::from(b)).collect();

        let mut id_bytes = [0u8; 4];
        id_bytes.copy_from_slice(&bytes[EVENT_ID_OFFSET..RESERVED_OFFSET]);
        let event_id = u32::from_le_bytes(id_bytes);

        Ok(Self {
            event_name,
            event_id,
            payload: Bytes::copy_from_slice(&bytes[HEADER_SIZE..]),
        })
    }
}
