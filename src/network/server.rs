//! TCP Server
//!
//! Accepts connections and dispatches them to a bounded worker pool.
//!
//! ## Threads
//! - One acceptor thread. It owns the listener and the pool, polls the stop
//!   flag every `accept_poll_ms`, and on shutdown drops the listener and
//!   joins the workers before exiting.
//! - `max_clients` workers, each serving one connection at a time.
//!
//! `close()` joins the acceptor, so it returns only once every worker has
//! finished. A worker blocked in a read finishes when the read completes or
//! times out.

use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};

use super::pool::{Job, SubmitError, WorkerPool};
use super::Connection;
use crate::config::ServerConfig;
use crate::error::{FrameError, Result};
use crate::handler::{register_server_defaults, HandlerResult, ServerHandlers};
use crate::protocol::MessageType;

/// Server lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Init,
    Listening,
    Stopping,
    Stopped,
}

/// TCP server for framelink
pub struct Server {
    config: ServerConfig,
    handlers: Arc<ServerHandlers>,
    live: Arc<LiveConnections>,
    state: ServerState,
    running: Option<Running>,
}

struct Running {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    acceptor: JoinHandle<()>,
}

impl Server {
    /// Create a server with the built-in CHECK / DATA / ERROR handlers
    pub fn new(config: ServerConfig) -> Self {
        let handlers = ServerHandlers::new("server");
        register_server_defaults(&handlers);

        Self {
            config,
            handlers: Arc::new(handlers),
            live: Arc::new(LiveConnections::default()),
            state: ServerState::Init,
            running: None,
        }
    }

    /// Register (or replace) the handler for `message_type`
    pub fn register_handler<F>(&self, message_type: MessageType, handler: F)
    where
        F: Fn(&[u8]) -> HandlerResult<Vec<u8>> + Send + Sync + 'static,
    {
        self.handlers.register(message_type, handler);
    }

    /// Bind, listen and start accepting. Returns the bound address.
    ///
    /// On failure the server stays in its previous state.
    pub fn open(&mut self) -> Result<SocketAddr> {
        if !matches!(self.state, ServerState::Init | ServerState::Stopped) {
            return Err(FrameError::InvalidState(format!(
                "cannot open a server that is {:?}",
                self.state
            )));
        }
        self.config.validate()?;

        let listener = bind_listener(&self.config)?;
        let local_addr = listener.local_addr()?;
        let pool = WorkerPool::new(self.config.max_clients, self.config.pending_connections)?;
        let shutdown = Arc::new(AtomicBool::new(false));

        let acceptor = Acceptor {
            listener,
            pool,
            shutdown: Arc::clone(&shutdown),
            handlers: Arc::clone(&self.handlers),
            live: Arc::clone(&self.live),
            config: self.config.clone(),
        };
        let acceptor = thread::Builder::new()
            .name("framelink-acceptor".to_string())
            .spawn(move || acceptor.run())?;

        self.running = Some(Running {
            local_addr,
            shutdown,
            acceptor,
        });
        self.state = ServerState::Listening;

        tracing::info!(
            "Server started on {} (max_clients={})",
            local_addr,
            self.config.max_clients
        );
        Ok(local_addr)
    }

    /// [`open`](Self::open) with the listener settings given inline.
    ///
    /// The pending-connection queue is sized to `max_clients`.
    pub fn open_on(&mut self, port: u16, bind_addr: &str, max_clients: usize) -> Result<SocketAddr> {
        if self.running.is_some() {
            return Err(FrameError::InvalidState(format!(
                "cannot open a server that is {:?}",
                self.state
            )));
        }
        self.config.port = port;
        self.config.bind_addr = bind_addr.to_string();
        self.config.max_clients = max_clients;
        self.config.pending_connections = max_clients;
        self.open()
    }

    /// Stop accepting, let in-flight connections finish, and wait for all of them.
    ///
    /// Closing a server that is not listening is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        self.state = ServerState::Stopping;
        tracing::info!(
            "Stopping server on {} ({} active connection(s))",
            running.local_addr,
            self.live.len()
        );

        running.shutdown.store(true, Ordering::Release);
        if running.acceptor.join().is_err() {
            tracing::error!("Acceptor thread panicked");
        }

        self.state = ServerState::Stopped;
        tracing::info!("Server closed");
        Ok(())
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Bound address while listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Connections accepted and not yet finished (queued or being served)
    pub fn active_connections(&self) -> usize {
        self.live.len()
    }

    pub fn handlers(&self) -> &ServerHandlers {
        &self.handlers
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// =============================================================================
// Listener setup
// =============================================================================

fn bind_listener(config: &ServerConfig) -> Result<TcpListener> {
    let addr_str = config.listen_addr();
    let bind_error = |source: io::Error| FrameError::Bind {
        addr: addr_str.clone(),
        source,
    };

    let addr = (config.bind_addr.as_str(), config.port)
        .to_socket_addrs()
        .map_err(bind_error)?
        .next()
        .ok_or_else(|| {
            bind_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "address resolved to nothing",
            ))
        })?;

    let socket =
        Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP)).map_err(bind_error)?;
    socket.set_reuse_address(true).map_err(bind_error)?;
    socket.bind(&addr.into()).map_err(bind_error)?;
    let backlog = i32::try_from(config.max_clients).unwrap_or(i32::MAX);
    socket.listen(backlog).map_err(bind_error)?;

    // Bounds each accept() so the acceptor can observe shutdown
    socket
        .set_read_timeout(Some(config.accept_poll()))
        .map_err(bind_error)?;

    Ok(socket.into())
}

// =============================================================================
// Acceptor
// =============================================================================

struct Acceptor {
    listener: TcpListener,
    pool: WorkerPool,
    shutdown: Arc<AtomicBool>,
    handlers: Arc<ServerHandlers>,
    live: Arc<LiveConnections>,
    config: ServerConfig,
}

impl Acceptor {
    fn run(self) {
        let Acceptor {
            listener,
            pool,
            shutdown,
            handlers,
            live,
            config,
        } = self;
        let mut next_id: u64 = 0;

        while !shutdown.load(Ordering::Acquire) {
            let (stream, addr) = match listener.accept() {
                Ok(accepted) => accepted,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                            | io::ErrorKind::ConnectionAborted
                    ) =>
                {
                    continue
                }
                Err(e) => {
                    tracing::error!("Error accepting connection: {}", e);
                    thread::sleep(config.accept_poll());
                    continue;
                }
            };

            if shutdown.load(Ordering::Acquire) {
                break;
            }

            next_id += 1;
            let id = next_id;
            live.insert(id, addr);
            tracing::info!("Connection from {}", addr);

            let task = ConnectionTask {
                id,
                stream,
                addr,
                handlers: Arc::clone(&handlers),
                live: Arc::clone(&live),
                shutdown: Arc::clone(&shutdown),
                config: config.clone(),
            };
            let mut job: Job = Box::new(move || task.run());

            // Backpressure: wait for a free queue slot, still honoring shutdown
            loop {
                match pool.submit_timeout(job, config.accept_poll()) {
                    Ok(()) => {
                        tracing::debug!(
                            "Submitted task for {}, queued: {}",
                            addr,
                            pool.queued()
                        );
                        break;
                    }
                    Err(SubmitError::Full(returned)) => {
                        if shutdown.load(Ordering::Acquire) {
                            tracing::debug!("Dropping {} queued behind a full pool", addr);
                            live.remove(id);
                            break;
                        }
                        tracing::debug!("Worker pool saturated, {} waiting", addr);
                        job = returned;
                    }
                    Err(SubmitError::Closed) => {
                        live.remove(id);
                        break;
                    }
                }
            }
        }

        drop(listener);
        tracing::debug!(
            "Acceptor stopped; waiting for {} connection(s) on {} worker(s)",
            live.len(),
            pool.size()
        );
        pool.join();
    }
}

// =============================================================================
// Per-connection task
// =============================================================================

struct ConnectionTask {
    id: u64,
    stream: TcpStream,
    addr: SocketAddr,
    handlers: Arc<ServerHandlers>,
    live: Arc<LiveConnections>,
    shutdown: Arc<AtomicBool>,
    config: ServerConfig,
}

impl ConnectionTask {
    fn run(self) {
        let _registration = LiveGuard {
            live: self.live,
            id: self.id,
        };

        if self.shutdown.load(Ordering::Acquire) {
            tracing::debug!("Closing queued connection {} during shutdown", self.addr);
            return;
        }

        let mut connection = match Connection::new(self.stream) {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!("Failed to set up connection {}: {}", self.addr, e);
                return;
            }
        };
        if let Err(e) =
            connection.set_timeouts(self.config.read_timeout(), self.config.write_timeout())
        {
            tracing::error!("Failed to configure connection {}: {}", self.addr, e);
            return;
        }

        if let Err(e) = connection.serve(&self.handlers, &self.shutdown) {
            tracing::warn!("Failed processing connection {}: {}", self.addr, e);
        }

        if let Err(e) = connection.close() {
            tracing::debug!("Error closing connection {}: {}", self.addr, e);
        }
        tracing::info!("Connection {} closed", self.addr);
    }
}

/// Set of accepted connections that have not finished yet.
///
/// Only the acceptor inserts; each task removes its own entry on exit.
#[derive(Default)]
struct LiveConnections {
    inner: Mutex<HashMap<u64, SocketAddr>>,
}

impl LiveConnections {
    fn insert(&self, id: u64, addr: SocketAddr) {
        self.inner.lock().insert(id, addr);
    }

    fn remove(&self, id: u64) {
        self.inner.lock().remove(&id);
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

/// Removes a task's live entry on every exit path
struct LiveGuard {
    live: Arc<LiveConnections>,
    id: u64,
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.live.remove(self.id);
    }
}
