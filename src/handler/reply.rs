//! Reply definitions
//!
//! Structured results produced by client handlers.

use bytes::Bytes;

use crate::protocol::MessageType;

/// Number + text body carried by DATA frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPayload {
    pub number: u32,
    pub text: String,
}

impl DataPayload {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }

    /// number (4, big-endian) + UTF-8 text
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(4 + self.text.len());
        payload.extend_from_slice(&self.number.to_be_bytes());
        payload.extend_from_slice(self.text.as_bytes());
        payload
    }

    /// Parse a DATA body; `None` if shorter than the 4-byte number.
    /// Invalid UTF-8 in the text is replaced, not rejected.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        let (number, text) = payload.split_first_chunk::<4>()?;
        Some(Self {
            number: u32::from_be_bytes(*number),
            text: String::from_utf8_lossy(text).into_owned(),
        })
    }
}

/// A reply handed back to client code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// CHECK echo
    Check(Bytes),

    /// Decoded DATA body
    Data(DataPayload),

    /// ERROR notification with its (possibly empty) reason
    Error(Bytes),

    /// Any application-defined type
    Raw {
        message_type: MessageType,
        payload: Bytes,
    },
}

impl Reply {
    /// Message type this reply stands for
    pub fn message_type(&self) -> MessageType {
        match self {
            Reply::Check(_) => MessageType::CHECK,
            Reply::Data(_) => MessageType::DATA,
            Reply::Error(_) => MessageType::ERROR,
            Reply::Raw { message_type, .. } => *message_type,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}
