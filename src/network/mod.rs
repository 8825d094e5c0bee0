//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Bounded worker thread pool, one connection per worker
//! - Frames routed through a per-component handler registry

mod connection;
mod pool;
mod server;
mod client;

pub use connection::{Connection, ConnectionState};
pub use pool::{Job, SubmitError, WorkerPool};
pub use server::{Server, ServerState};
pub use client::Client;
