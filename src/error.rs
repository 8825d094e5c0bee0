//! Error types for framelink
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using FrameError
pub type Result<T> = std::result::Result<T, FrameError>;

/// Unified error type for framelink operations
#[derive(Debug, Error)]
pub enum FrameError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Not connected")]
    NotConnected,

    #[error("Timed out waiting for a frame")]
    Timeout,

    /// Normal terminal signal: the peer closed the stream between frames.
    #[error("Peer disconnected")]
    PeerDisconnected,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A reply arrived but no handler could turn it into a result
    #[error("Unhandled {message_type} reply: {reason}")]
    Unhandled { message_type: String, reason: String },

    // -------------------------------------------------------------------------
    // Registry Errors
    // -------------------------------------------------------------------------
    #[error("'{0}' is not a valid message type name")]
    InvalidName(String),

    #[error("Message type code {code} is already bound to '{existing}'")]
    CodeInUse { code: u8, existing: &'static str },

    #[error("Message type '{name}' is already bound to code {code}")]
    NameInUse { name: &'static str, code: u8 },

    #[error("All 256 message type codes are in use")]
    RegistryFull,

    // -------------------------------------------------------------------------
    // Lifecycle / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FrameError {
    /// Whether this error is a read/write timeout, either reported directly or
    /// surfaced by the OS as `WouldBlock`/`TimedOut`.
    pub fn is_timeout(&self) -> bool {
        match self {
            FrameError::Timeout => true,
            FrameError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Whether the peer went away (orderly close, reset or broken pipe)
    pub fn is_disconnect(&self) -> bool {
        match self {
            FrameError::PeerDisconnected => true,
            FrameError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

/// Reasons a byte sequence is not a valid frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("incomplete header: expected 2 bytes, got {0}")]
    TruncatedHeader(usize),

    #[error("unknown message type code: 0x{0:02x}")]
    UnknownType(u8),

    #[error("declared payload length {0} exceeds maximum")]
    LengthOutOfRange(usize),

    #[error("incomplete payload: expected {expected} bytes, got {actual}")]
    TruncatedPayload { expected: usize, actual: usize },
}

/// Failure reported by a message handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}
