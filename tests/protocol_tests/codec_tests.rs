//! Codec Tests
//!
//! Tests for frame encoding/decoding and the stream helpers.

use std::io::{Cursor, Read};

use framelink::protocol::{
    decode, encode, encode_frame, read_frame, write_frame, Frame, MessageType, HEADER_SIZE,
    MAX_PAYLOAD_SIZE, PREVIEW_LEN,
};
use framelink::{DecodeError, FrameError};
use proptest::prelude::*;

/// A code no test in this binary registers
const UNREGISTERED_CODE: u8 = 0xFE;

// =============================================================================
// Helper Types
// =============================================================================

/// Reader that hands out at most `chunk` bytes per read call
struct ChunkedReader {
    inner: Cursor<Vec<u8>>,
    chunk: usize,
}

impl ChunkedReader {
    fn new(bytes: Vec<u8>, chunk: usize) -> Self {
        Self {
            inner: Cursor::new(bytes),
            chunk,
        }
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = buf.len().min(self.chunk);
        self.inner.read(&mut buf[..n])
    }
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_empty_check() {
    let encoded = encode(MessageType::CHECK, &[]).unwrap();
    assert_eq!(encoded.as_ref(), &[0x00, 0x00]);
}

#[test]
fn test_encode_layout() {
    let encoded = encode(MessageType::DATA, b"hello").unwrap();

    assert_eq!(encoded.len(), HEADER_SIZE + 5);
    assert_eq!(encoded[0], 0x01);
    assert_eq!(encoded[1], 5);
    assert_eq!(&encoded[2..], b"hello");
}

#[test]
fn test_encode_max_payload() {
    let payload = vec![0xAB; MAX_PAYLOAD_SIZE];
    let encoded = encode(MessageType::DATA, &payload).unwrap();

    assert_eq!(encoded.len(), 2 + 255);
    assert_eq!(encoded[1], 255);
}

#[test]
fn test_encode_payload_too_large() {
    let payload = vec![0u8; MAX_PAYLOAD_SIZE + 1];
    let result = encode(MessageType::DATA, &payload);

    match result {
        Err(FrameError::PayloadTooLarge { size, max }) => {
            assert_eq!(size, 256);
            assert_eq!(max, 255);
        }
        other => panic!("Expected PayloadTooLarge, got {:?}", other),
    }
}

#[test]
fn test_encode_frame_matches_encode() {
    let frame = Frame::new(MessageType::ERROR, &b"boom"[..]).unwrap();
    assert_eq!(
        encode_frame(&frame),
        encode(MessageType::ERROR, b"boom").unwrap()
    );
}

#[test]
fn test_empty_frame() {
    let frame = Frame::empty(MessageType::CHECK);

    assert_eq!(frame.encoded_len(), HEADER_SIZE);
    assert_eq!(encode_frame(&frame).as_ref(), &[0x00, 0x00]);
    assert!(frame.into_payload().is_empty());
}

#[test]
fn test_frame_new_rejects_oversized_payload() {
    let result = Frame::new(MessageType::DATA, vec![0u8; 300]);
    assert!(matches!(result, Err(FrameError::PayloadTooLarge { size: 300, .. })));
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_data_frame() {
    let frame = decode(&[0x01, 0x03, b'a', b'b', b'c']).unwrap();

    assert_eq!(frame.message_type(), MessageType::DATA);
    assert_eq!(frame.payload().as_ref(), b"abc");
    assert_eq!(frame.encoded_len(), 5);
}

#[test]
fn test_decode_empty_input() {
    assert_eq!(decode(&[]), Err(DecodeError::TruncatedHeader(0)));
}

#[test]
fn test_decode_single_byte() {
    assert_eq!(decode(&[0x00]), Err(DecodeError::TruncatedHeader(1)));
}

#[test]
fn test_decode_truncated_payload() {
    // Header declares 10 bytes, only 3 present
    let bytes = [0x01, 10, 1, 2, 3];
    assert_eq!(
        decode(&bytes),
        Err(DecodeError::TruncatedPayload {
            expected: 10,
            actual: 3
        })
    );
}

#[test]
fn test_decode_unknown_type() {
    let bytes = [UNREGISTERED_CODE, 0];
    assert_eq!(decode(&bytes), Err(DecodeError::UnknownType(UNREGISTERED_CODE)));
}

#[test]
fn test_decode_ignores_trailing_bytes() {
    let mut bytes = encode(MessageType::CHECK, b"hi").unwrap().to_vec();
    bytes.extend_from_slice(&encode(MessageType::DATA, b"next").unwrap());

    let first = decode(&bytes).unwrap();
    assert_eq!(first.message_type(), MessageType::CHECK);
    assert_eq!(first.payload().as_ref(), b"hi");

    let second = decode(&bytes[first.encoded_len()..]).unwrap();
    assert_eq!(second.message_type(), MessageType::DATA);
    assert_eq!(second.payload().as_ref(), b"next");
}

#[test]
fn test_decode_registered_custom_type() {
    let custom = MessageType::register("CODEC_CUSTOM").unwrap();
    let bytes = encode(custom, b"x").unwrap();

    let frame = decode(&bytes).unwrap();
    assert_eq!(frame.message_type(), custom);
}

// =============================================================================
// Stream-based I/O Tests
// =============================================================================

#[test]
fn test_write_then_read_frame() {
    let mut buffer = Vec::new();
    write_frame(&mut buffer, MessageType::DATA, b"payload").unwrap();

    let mut cursor = Cursor::new(buffer);
    let frame = read_frame(&mut cursor).unwrap();

    assert_eq!(frame.message_type(), MessageType::DATA);
    assert_eq!(frame.payload().as_ref(), b"payload");
}

#[test]
fn test_read_back_to_back_frames() {
    let mut buffer = Vec::new();
    write_frame(&mut buffer, MessageType::CHECK, b"").unwrap();
    write_frame(&mut buffer, MessageType::DATA, b"one").unwrap();
    write_frame(&mut buffer, MessageType::ERROR, b"two").unwrap();

    let mut cursor = Cursor::new(buffer);
    let first = read_frame(&mut cursor).unwrap();
    let second = read_frame(&mut cursor).unwrap();
    let third = read_frame(&mut cursor).unwrap();

    assert_eq!(first.message_type(), MessageType::CHECK);
    assert!(first.payload().is_empty());
    assert_eq!(second.payload().as_ref(), b"one");
    assert_eq!(third.message_type(), MessageType::ERROR);

    // Stream exhausted on a frame boundary
    assert!(matches!(read_frame(&mut cursor), Err(FrameError::PeerDisconnected)));
}

#[test]
fn test_read_frame_one_byte_at_a_time() {
    let mut bytes = encode(MessageType::DATA, b"split across reads").unwrap().to_vec();
    bytes.extend_from_slice(&encode(MessageType::CHECK, b"tail").unwrap());

    let mut reader = ChunkedReader::new(bytes, 1);
    let first = read_frame(&mut reader).unwrap();
    let second = read_frame(&mut reader).unwrap();

    assert_eq!(first.payload().as_ref(), b"split across reads");
    assert_eq!(second.message_type(), MessageType::CHECK);
    assert_eq!(second.payload().as_ref(), b"tail");
}

#[test]
fn test_read_frame_empty_stream_is_disconnect() {
    let mut cursor = Cursor::new(Vec::new());
    let result = read_frame(&mut cursor);

    match result {
        Err(e) => assert!(e.is_disconnect()),
        Ok(frame) => panic!("Expected disconnect, got {:?}", frame),
    }
}

#[test]
fn test_read_frame_partial_header() {
    let mut cursor = Cursor::new(vec![0x01]);
    assert!(matches!(
        read_frame(&mut cursor),
        Err(FrameError::Decode(DecodeError::TruncatedHeader(1)))
    ));
}

#[test]
fn test_read_frame_truncated_payload() {
    let mut cursor = Cursor::new(vec![0x01, 10, 1, 2, 3]);
    assert!(matches!(
        read_frame(&mut cursor),
        Err(FrameError::Decode(DecodeError::TruncatedPayload {
            expected: 10,
            actual: 3
        }))
    ));
}

#[test]
fn test_read_frame_unknown_type_consumes_whole_frame() {
    let mut bytes = vec![UNREGISTERED_CODE, 2, 0xAA, 0xBB];
    bytes.extend_from_slice(&encode(MessageType::CHECK, b"ok").unwrap());

    let mut cursor = Cursor::new(bytes);
    assert!(matches!(
        read_frame(&mut cursor),
        Err(FrameError::Decode(DecodeError::UnknownType(UNREGISTERED_CODE)))
    ));

    // The next frame is still aligned
    assert_eq!(cursor.position(), 4);
    let next = read_frame(&mut cursor).unwrap();
    assert_eq!(next.payload().as_ref(), b"ok");
}

#[test]
fn test_write_frame_rejects_oversized_payload() {
    let mut buffer = Vec::new();
    let result = write_frame(&mut buffer, MessageType::DATA, &[0u8; 256]);

    assert!(matches!(result, Err(FrameError::PayloadTooLarge { .. })));
    assert!(buffer.is_empty());
}

// =============================================================================
// Preview Tests
// =============================================================================

#[test]
fn test_preview_is_truncated() {
    let frame = Frame::new(MessageType::DATA, vec![b'x'; 200]).unwrap();
    let preview = frame.preview();

    // Debug-quoted string of PREVIEW_LEN characters
    assert_eq!(preview.len(), PREVIEW_LEN + 2);
}

// =============================================================================
// Property Tests
// =============================================================================

fn any_predefined_type() -> impl Strategy<Value = MessageType> {
    prop_oneof![
        Just(MessageType::CHECK),
        Just(MessageType::DATA),
        Just(MessageType::ERROR),
    ]
}

proptest! {
    #[test]
    fn prop_decode_inverts_encode(
        message_type in any_predefined_type(),
        payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
    ) {
        let encoded = encode(message_type, &payload).unwrap();
        prop_assert_eq!(encoded.len(), HEADER_SIZE + payload.len());

        let frame = decode(&encoded).unwrap();
        prop_assert_eq!(frame.message_type(), message_type);
        prop_assert_eq!(frame.payload().as_ref(), payload.as_slice());
    }

    #[test]
    fn prop_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..300)) {
        let _ = decode(&bytes);
    }
}
