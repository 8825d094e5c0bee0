//! Handler Module
//!
//! Per-component mapping from message type to application logic.
//!
//! ## Handler Shapes
//! - Server: payload bytes -> reply payload bytes (sent back under the
//!   request's type)
//! - Client: payload bytes -> [`Reply`]

mod registry;
mod reply;
mod builtin;

pub use registry::{Dispatch, HandlerFn, HandlerRegistry, HandlerResult};
pub use reply::{DataPayload, Reply};
pub use builtin::{register_client_defaults, register_server_defaults};

/// Handler table used by the server
pub type ServerHandlers = HandlerRegistry<Vec<u8>>;

/// Handler table used by the client
pub type ClientHandlers = HandlerRegistry<Reply>;
