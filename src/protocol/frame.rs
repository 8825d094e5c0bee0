//! Frame definition
//!
//! One complete wire-level message: a type plus a bounded payload.

use bytes::Bytes;

use super::MessageType;
use crate::error::{FrameError, Result};

/// Header size: 1 byte type code + 1 byte payload length
pub const HEADER_SIZE: usize = 2;

/// Maximum payload size (fits the 1-byte length field)
pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize;

/// Payload bytes shown in log previews
pub const PREVIEW_LEN: usize = 50;

/// A decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    message_type: MessageType,
    payload: Bytes,
}

impl Frame {
    /// Create a frame, rejecting payloads over [`MAX_PAYLOAD_SIZE`]
    pub fn new(message_type: MessageType, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(Self {
            message_type,
            payload,
        })
    }

    /// Frame with no payload
    pub fn empty(message_type: MessageType) -> Self {
        Self {
            message_type,
            payload: Bytes::new(),
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Bytes this frame occupies on the wire
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Truncated, printable view of the payload for logging
    pub fn preview(&self) -> String {
        preview(&self.payload)
    }
}

/// Lossy UTF-8 rendering of at most [`PREVIEW_LEN`] payload bytes
pub fn preview(payload: &[u8]) -> String {
    let end = payload.len().min(PREVIEW_LEN);
    format!("{:?}", String::from_utf8_lossy(&payload[..end]))
}
