//! TCP Client
//!
//! One outbound connection with a blocking send-then-await-reply call.
//!
//! Not safe to share between callers without external serialization:
//! interleaved requests on one socket would corrupt framing, which is why
//! every call takes `&mut self`.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use crate::config::ClientConfig;
use crate::error::{FrameError, Result};
use crate::handler::{register_client_defaults, ClientHandlers, Dispatch, HandlerResult, Reply};
use crate::protocol::{preview, Frame, MessageType, MAX_PAYLOAD_SIZE};

use super::Connection;

/// TCP client for framelink
pub struct Client {
    config: ClientConfig,
    handlers: ClientHandlers,
    connection: Option<Connection>,
    remote: Option<SocketAddr>,
}

impl Client {
    /// Create a client with the built-in CHECK / DATA / ERROR handlers
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let handlers = ClientHandlers::new("client");
        register_client_defaults(&handlers);
        tracing::debug!("Client initialized");

        Self {
            config,
            handlers,
            connection: None,
            remote: None,
        }
    }

    /// Connect to `ip:port`. No retry; an existing connection is closed first.
    pub fn open(&mut self, ip: &str, port: u16) -> Result<()> {
        if self.connection.is_some() {
            self.close()?;
        }

        let addr_str = format!("{}:{}", ip, port);
        let connect_error = |source: std::io::Error| FrameError::Connect {
            addr: addr_str.clone(),
            source,
        };

        let addr = (ip, port)
            .to_socket_addrs()
            .map_err(connect_error)?
            .next()
            .ok_or_else(|| {
                connect_error(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "address resolved to nothing",
                ))
            })?;

        let stream = match self.config.connect_timeout() {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        }
        .map_err(connect_error)?;

        let mut connection = Connection::new(stream)?;
        connection.set_timeouts(self.config.read_timeout(), self.config.write_timeout())?;

        self.connection = Some(connection);
        self.remote = Some(addr);
        tracing::info!("Connection with {}", addr);
        Ok(())
    }

    /// Close the connection. Closing twice, or without opening, is fine.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut connection) = self.connection.take() else {
            return Ok(());
        };
        let remote = self.remote.take();

        connection.close()?;
        if let Some(remote) = remote {
            tracing::info!("Connection with {} closed", remote);
        }
        Ok(())
    }

    /// Send one request and dispatch its reply.
    ///
    /// `None` means "no usable reply"; the cause is logged. Use
    /// [`request`](Self::request) to inspect it instead.
    pub fn send_and_await(&mut self, message_type: MessageType, payload: &[u8]) -> Option<Reply> {
        match self.request(message_type, payload) {
            Ok(reply) => Some(reply),
            Err(e) => {
                self.log_failure(&e);
                None
            }
        }
    }

    /// Send one request and dispatch its reply, reporting why it failed.
    ///
    /// Exactly one reply frame is read; there is no retry. After a failed
    /// write or read the connection is dropped, since the stream can no
    /// longer be trusted to sit on a frame boundary.
    pub fn request(&mut self, message_type: MessageType, payload: &[u8]) -> Result<Reply> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let connection = self.connection.as_mut().ok_or(FrameError::NotConnected)?;

        if let Err(e) = connection.write_frame(message_type, payload) {
            self.drop_connection();
            return Err(e);
        }
        tracing::info!(
            %message_type,
            payload = %preview(payload),
            "Sent request"
        );

        self.await_reply()
    }

    /// Read and dispatch one frame without sending anything first.
    ///
    /// For servers that push unsolicited messages.
    pub fn receive(&mut self) -> Option<Reply> {
        match self.await_reply() {
            Ok(reply) => Some(reply),
            Err(e) => {
                self.log_failure(&e);
                None
            }
        }
    }

    /// Send CHECK and confirm a CHECK reply comes back
    pub fn check_connection(&mut self) -> bool {
        matches!(
            self.send_and_await(MessageType::CHECK, &[]),
            Some(Reply::Check(_))
        )
    }

    /// Register (or replace) the handler for replies of `message_type`
    pub fn register_handler<F>(&self, message_type: MessageType, handler: F)
    where
        F: Fn(&[u8]) -> HandlerResult<Reply> + Send + Sync + 'static,
    {
        self.handlers.register(message_type, handler);
    }

    pub fn handlers(&self) -> &ClientHandlers {
        &self.handlers
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Server address while connected
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote
    }

    fn await_reply(&mut self) -> Result<Reply> {
        let connection = self.connection.as_mut().ok_or(FrameError::NotConnected)?;

        let frame: Frame = match connection.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.drop_connection();
                return Err(e);
            }
        };

        let message_type = frame.message_type();
        match self.handlers.dispatch(message_type, frame.payload()) {
            Dispatch::Handled(reply) => Ok(reply),
            Dispatch::Unhandled { reason } => Err(FrameError::Unhandled {
                message_type: message_type.to_string(),
                reason,
            }),
        }
    }

    fn drop_connection(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            let _ = connection.close();
        }
        self.remote = None;
    }

    fn log_failure(&self, error: &FrameError) {
        match error {
            FrameError::NotConnected => tracing::error!("Not connected to server"),
            FrameError::PeerDisconnected => tracing::info!("Server disconnected"),
            FrameError::Timeout => tracing::warn!("Timeout waiting for message"),
            FrameError::Decode(e) => tracing::warn!("Invalid message received: {}", e),
            e => tracing::error!("Request failed: {}", e),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
