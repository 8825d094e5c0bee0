//! Configuration for framelink
//!
//! Centralized server and client configuration with sensible defaults.

use std::time::Duration;

use crate::error::{FrameError, Result};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // -------------------------------------------------------------------------
    // Listener Configuration
    // -------------------------------------------------------------------------
    /// Address to bind the listening socket to
    pub bind_addr: String,

    /// TCP port (0 picks an ephemeral port)
    pub port: u16,

    /// Number of worker threads, which is also the listen backlog
    pub max_clients: usize,

    /// Accepted connections allowed to wait for a free worker.
    /// When the queue is full the acceptor blocks until a slot frees.
    pub pending_connections: usize,

    /// How often the acceptor wakes up to check for shutdown (milliseconds)
    pub accept_poll_ms: u64,

    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// Per-frame read timeout (milliseconds, 0 = no timeout)
    pub read_timeout_ms: u64,

    /// Write timeout (milliseconds, 0 = no timeout)
    pub write_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 9000,
            max_clients: 1,
            pending_connections: 1,
            accept_poll_ms: 1000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// `bind_addr:port`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn accept_poll(&self) -> Duration {
        Duration::from_millis(self.accept_poll_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_clients == 0 {
            return Err(FrameError::Config("max_clients must be at least 1".to_string()));
        }
        if self.pending_connections == 0 {
            return Err(FrameError::Config(
                "pending_connections must be at least 1".to_string(),
            ));
        }
        if self.accept_poll_ms == 0 {
            return Err(FrameError::Config("accept_poll_ms must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
    pending_set: bool,
}

impl ServerConfigBuilder {
    /// Set the bind address
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    /// Set the TCP port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the worker count / listen backlog.
    ///
    /// Unless set explicitly, the pending queue follows this value.
    pub fn max_clients(mut self, count: usize) -> Self {
        self.config.max_clients = count;
        if !self.pending_set {
            self.config.pending_connections = count;
        }
        self
    }

    /// Set the bound on accepted-but-unserved connections
    pub fn pending_connections(mut self, count: usize) -> Self {
        self.config.pending_connections = count;
        self.pending_set = true;
        self
    }

    /// Set the acceptor's shutdown poll interval (in milliseconds)
    pub fn accept_poll_ms(mut self, ms: u64) -> Self {
        self.config.accept_poll_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connect timeout (milliseconds, 0 = OS default)
    pub connect_timeout_ms: u64,

    /// Reply read timeout (milliseconds, 0 = no timeout)
    pub read_timeout_ms: u64,

    /// Write timeout (milliseconds, 0 = no timeout)
    pub write_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

fn millis(ms: u64) -> Option<Duration> {
    if ms == 0 {
        None
    } else {
        Some(Duration::from_millis(ms))
    }
}
