//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Type (1) │ Len (1)  │     Payload (0-255 bytes)   │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! [`encode`] and [`decode`] work on complete buffers. [`read_frame`] and
//! [`write_frame`] are the stream helpers: TCP does not preserve message
//! boundaries, so `read_frame` reads exactly the header and then exactly the
//! declared payload before decoding.

use std::io::{self, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use super::frame::{Frame, HEADER_SIZE, MAX_PAYLOAD_SIZE};
use super::MessageType;
use crate::error::{DecodeError, FrameError, Result};

// =============================================================================
// Buffer Encoding/Decoding
// =============================================================================

/// Encode a frame to bytes
///
/// Format: type_code (1) + payload_len (1) + payload
pub fn encode(message_type: MessageType, payload: &[u8]) -> Result<Bytes> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(message_type.code());
    message.put_u8(payload.len() as u8);
    message.put_slice(payload);

    Ok(message.freeze())
}

/// Encode an already validated frame
pub fn encode_frame(frame: &Frame) -> Bytes {
    let payload = frame.payload();
    let mut message = BytesMut::with_capacity(frame.encoded_len());
    message.put_u8(frame.message_type().code());
    message.put_u8(payload.len() as u8);
    message.put_slice(payload);
    message.freeze()
}

/// Decode one frame from the front of `bytes`
///
/// Bytes past the end of the frame are ignored; use
/// [`Frame::encoded_len`] to find where the next frame starts.
pub fn decode(bytes: &[u8]) -> std::result::Result<Frame, DecodeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DecodeError::TruncatedHeader(bytes.len()));
    }

    let code = bytes[0];
    let payload_len = bytes[1] as usize;

    let message_type = MessageType::by_code(code).ok_or(DecodeError::UnknownType(code))?;

    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(DecodeError::LengthOutOfRange(payload_len));
    }

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(DecodeError::TruncatedPayload {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }

    let payload = Bytes::copy_from_slice(&bytes[HEADER_SIZE..total_len]);
    Frame::new(message_type, payload).map_err(|_| DecodeError::LengthOutOfRange(payload_len))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete frame from a stream
///
/// Blocks until the header and the full declared payload have arrived.
///
/// - End of stream before the first header byte: [`FrameError::PeerDisconnected`]
/// - End of stream inside a frame: [`FrameError::Decode`]
/// - Read timeout: [`FrameError::Timeout`]
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Frame> {
    let mut message = [0u8; HEADER_SIZE + MAX_PAYLOAD_SIZE];

    // Read header first
    let got = fill(reader, &mut message[..HEADER_SIZE])?;
    if got == 0 {
        return Err(FrameError::PeerDisconnected);
    }
    if got < HEADER_SIZE {
        return Err(DecodeError::TruncatedHeader(got).into());
    }

    // Then exactly the declared payload
    let payload_len = message[1] as usize;
    let total_len = HEADER_SIZE + payload_len;
    let got = fill(reader, &mut message[HEADER_SIZE..total_len])?;
    if got < payload_len {
        return Err(DecodeError::TruncatedPayload {
            expected: payload_len,
            actual: got,
        }
        .into());
    }

    Ok(decode(&message[..total_len])?)
}

/// Write a frame to a stream
pub fn write_frame<W: Write>(writer: &mut W, message_type: MessageType, payload: &[u8]) -> Result<()> {
    let bytes = encode(message_type, payload)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read until `buf` is full or the stream ends; returns the bytes read
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Err(FrameError::Timeout)
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
