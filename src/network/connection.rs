//! Connection Handler
//!
//! One duplex TCP endpoint plus the server's read/dispatch/write cycle.

use std::io::{BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::{FrameError, Result};
use crate::handler::{Dispatch, ServerHandlers};
use crate::protocol::{self, preview, Frame, MessageType, MAX_PAYLOAD_SIZE};

/// Connection lifecycle; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    Open,
    Closing,
    Closed,
}

/// A single framed TCP connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Peer address for logging
    peer_addr: String,

    state: ConnectionState,
}

impl Connection {
    /// Wrap a connected stream
    pub fn new(stream: TcpStream) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            peer_addr,
            state: ConnectionState::Open,
        })
    }

    /// Configure timeouts; `None` disables the timeout
    pub fn set_timeouts(&mut self, read: Option<Duration>, write: Option<Duration>) -> Result<()> {
        // Always set both: accepted sockets may inherit the listener's timeout
        self.reader.get_ref().set_read_timeout(read)?;
        self.writer.get_ref().set_write_timeout(write)?;
        Ok(())
    }

    /// Read one complete frame
    pub fn read_frame(&mut self) -> Result<Frame> {
        self.ensure_open()?;
        let frame = protocol::read_frame(&mut self.reader)?;
        tracing::debug!(
            peer = %self.peer_addr,
            message_type = %frame.message_type(),
            len = frame.payload().len(),
            payload = %frame.preview(),
            "Frame received"
        );
        Ok(frame)
    }

    /// Encode and send one frame
    pub fn write_frame(&mut self, message_type: MessageType, payload: &[u8]) -> Result<()> {
        self.ensure_open()?;
        protocol::write_frame(&mut self.writer, message_type, payload)?;
        tracing::debug!(
            peer = %self.peer_addr,
            %message_type,
            len = payload.len(),
            payload = %preview(payload),
            "Frame sent"
        );
        Ok(())
    }

    /// Best-effort ERROR frame carrying `reason` (truncated to fit)
    pub fn send_error(&mut self, reason: &str) {
        if let Err(e) = self.write_frame(MessageType::ERROR, clip(reason.as_bytes())) {
            tracing::debug!(peer = %self.peer_addr, error = %e, "Could not send ERROR frame");
        }
    }

    /// Serve requests until the peer leaves, an error occurs or `shutdown` is set
    ///
    /// Requests are handled strictly in arrival order. Returns `Ok` on orderly
    /// exits (peer closed, shutdown) and the terminating error otherwise.
    pub fn serve(&mut self, handlers: &ServerHandlers, shutdown: &AtomicBool) -> Result<()> {
        loop {
            if shutdown.load(Ordering::Acquire) {
                tracing::debug!(peer = %self.peer_addr, "Shutdown requested, leaving connection");
                return Ok(());
            }

            // Read next request
            let frame = match self.read_frame() {
                Ok(frame) => frame,
                Err(e) if e.is_disconnect() => {
                    tracing::info!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(e) if e.is_timeout() => {
                    tracing::warn!("Timeout waiting for message from {}", self.peer_addr);
                    self.send_error("read timeout");
                    return Err(FrameError::Timeout);
                }
                Err(e) => {
                    tracing::warn!("Invalid message from {}: {}", self.peer_addr, e);
                    self.send_error(&e.to_string());
                    return Err(e);
                }
            };

            // Dispatch; the reply goes back under the request's type
            let message_type = frame.message_type();
            let result = match handlers.dispatch(message_type, frame.payload()) {
                Dispatch::Handled(reply) => match self.write_frame(message_type, &reply) {
                    Err(FrameError::PayloadTooLarge { size, max }) => {
                        tracing::error!(%message_type, size, max, "Handler reply too large");
                        self.write_frame(
                            MessageType::ERROR,
                            format!("{} reply too large", message_type).as_bytes(),
                        )
                    }
                    other => other,
                },
                Dispatch::Unhandled { reason } => {
                    self.write_frame(MessageType::ERROR, clip(reason.as_bytes()))
                }
            };

            if let Err(e) = result {
                // The client may have left before the reply went out
                if e.is_disconnect() {
                    tracing::debug!(
                        "Client {} disconnected before response could be sent: {}",
                        self.peer_addr,
                        e
                    );
                    return Ok(());
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Flush and shut the socket down. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        self.state = ConnectionState::Closing;

        if let Err(e) = self.writer.flush() {
            tracing::debug!(peer = %self.peer_addr, error = %e, "Flush on close failed");
        }
        let result = match self.writer.get_ref().shutdown(Shutdown::Both) {
            Err(e) if e.kind() != std::io::ErrorKind::NotConnected => Err(e.into()),
            _ => Ok(()),
        };

        self.state = ConnectionState::Closed;
        tracing::debug!(peer = %self.peer_addr, "Connection closed");
        result
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == ConnectionState::Open {
            Ok(())
        } else {
            Err(FrameError::NotConnected)
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Cut an ERROR reason down to one frame's payload
fn clip(reason: &[u8]) -> &[u8] {
    &reason[..reason.len().min(MAX_PAYLOAD_SIZE)]
}
