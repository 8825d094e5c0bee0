//! # framelink
//!
//! A minimal connection-oriented message exchange framework:
//! - Compact binary framing: 1-byte type, 1-byte length, up to 255 payload bytes
//! - Process-wide, runtime-extensible message type registry
//! - Per-component handler registries with failure isolation at dispatch
//! - Threaded TCP server with a bounded worker pool and graceful shutdown
//! - Blocking request/response client
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐                 ┌──────────────────────────────┐
//! │        Client        │                 │            Server            │
//! │  send_and_await()    │                 │  acceptor thread             │
//! │        │             │   TCP frames    │        │                     │
//! │        ▼             │ ──────────────▶ │        ▼                     │
//! │  codec::encode       │                 │  worker pool (bounded)       │
//! │        ...           │                 │        │                     │
//! │  codec::read_frame   │ ◀────────────── │  Connection::serve           │
//! │        │             │                 │   read → dispatch → write    │
//! │        ▼             │                 │        │                     │
//! │  HandlerRegistry     │                 │        ▼                     │
//! │   (Reply)            │                 │  HandlerRegistry (bytes)     │
//! └──────────────────────┘                 └──────────────────────────────┘
//!                 MessageType registry (shared by both sides)
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod handler;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DecodeError, FrameError, HandlerError, Result};
pub use config::{ClientConfig, ServerConfig};
pub use protocol::{Frame, MessageType};
pub use handler::{DataPayload, Reply};
pub use network::{Client, Server, ServerState};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of framelink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
