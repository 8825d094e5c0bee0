//! Tests for the TCP client
//!
//! Each test runs a scripted peer on a raw socket so the client sees exactly
//! the bytes under test. Verified:
//! - Connection lifecycle and refused connections
//! - Reply dispatch for built-in and custom types
//! - Timeouts, disconnects and malformed replies drop the connection
//! - Local failures (oversized payload, unhandled reply) keep it

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use framelink::handler::{DataPayload, Reply};
use framelink::network::Client;
use framelink::{ClientConfig, DecodeError, FrameError, MessageType};

/// A code no test in this binary registers
const UNREGISTERED_CODE: u8 = 0xFC;

// =============================================================================
// Helper Functions
// =============================================================================

/// Accept one connection and hand it to `script`
fn scripted_peer<F>(script: F) -> (u16, JoinHandle<()>)
where
    F: FnOnce(TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        script(stream);
    });
    (port, handle)
}

fn read_request(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).unwrap();
    let mut payload = vec![0u8; header[1] as usize];
    stream.read_exact(&mut payload).unwrap();
    (header[0], payload)
}

fn write_raw(stream: &mut TcpStream, code: u8, payload: &[u8]) {
    let mut bytes = vec![code, payload.len() as u8];
    bytes.extend_from_slice(payload);
    stream.write_all(&bytes).unwrap();
}

/// Echo `rounds` requests back under their own type
fn echo_peer(rounds: usize) -> (u16, JoinHandle<()>) {
    scripted_peer(move |mut stream| {
        for _ in 0..rounds {
            let (code, payload) = read_request(&mut stream);
            write_raw(&mut stream, code, &payload);
        }
    })
}

fn connected_client(port: u16) -> Client {
    let config = ClientConfig::builder()
        .connect_timeout_ms(2000)
        .read_timeout_ms(2000)
        .build();
    let mut client = Client::with_config(config);
    client.open("127.0.0.1", port).unwrap();
    client
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_request_without_connection() {
    let mut client = Client::new();

    assert!(!client.is_connected());
    assert!(matches!(
        client.request(MessageType::CHECK, &[]),
        Err(FrameError::NotConnected)
    ));
    assert_eq!(client.send_and_await(MessageType::CHECK, &[]), None);
    assert!(!client.check_connection());
}

#[test]
fn test_close_is_idempotent() {
    let mut client = Client::new();
    client.close().unwrap();

    let (port, peer) = echo_peer(0);
    let mut client = connected_client(port);
    assert!(client.is_connected());
    assert_eq!(client.remote_addr().map(|a| a.port()), Some(port));

    client.close().unwrap();
    client.close().unwrap();
    assert!(!client.is_connected());
    assert_eq!(client.remote_addr(), None);
    peer.join().unwrap();
}

#[test]
fn test_connect_refused() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut client = Client::new();
    let result = client.open("127.0.0.1", port);

    assert!(matches!(result, Err(FrameError::Connect { .. })));
    assert!(!client.is_connected());
}

#[test]
fn test_reopen_replaces_connection() {
    let (first_port, first_peer) = echo_peer(0);
    let (second_port, second_peer) = echo_peer(1);

    let mut client = connected_client(first_port);
    client.open("127.0.0.1", second_port).unwrap();

    assert_eq!(client.remote_addr().map(|a| a.port()), Some(second_port));
    assert!(client.check_connection());

    first_peer.join().unwrap();
    client.close().unwrap();
    second_peer.join().unwrap();
}

// =============================================================================
// Reply Dispatch Tests
// =============================================================================

#[test]
fn test_check_connection() {
    let (port, peer) = echo_peer(1);
    let mut client = connected_client(port);

    assert!(client.check_connection());

    client.close().unwrap();
    peer.join().unwrap();
}

#[test]
fn test_request_bytes_on_the_wire() {
    let (port, peer) = scripted_peer(|mut stream| {
        let mut request = [0u8; 5];
        stream.read_exact(&mut request).unwrap();
        assert_eq!(request, [0x00, 0x03, b'a', b'b', b'c']);
        write_raw(&mut stream, 0x00, b"abc");
    });
    let mut client = connected_client(port);

    let reply = client.request(MessageType::CHECK, b"abc").unwrap();
    assert_eq!(reply, Reply::Check(Bytes::from_static(b"abc")));

    client.close().unwrap();
    peer.join().unwrap();
}

#[test]
fn test_data_reply_decoded() {
    let (port, peer) = scripted_peer(|mut stream| {
        let (code, payload) = read_request(&mut stream);
        assert_eq!(code, MessageType::DATA.code());
        assert_eq!(DataPayload::decode(&payload), Some(DataPayload::new(5, "hi")));
        write_raw(&mut stream, code, &DataPayload::new(6, "hi").encode());
    });
    let mut client = connected_client(port);

    let reply = client.send_and_await(MessageType::DATA, &DataPayload::new(5, "hi").encode());
    assert_eq!(reply, Some(Reply::Data(DataPayload::new(6, "hi"))));

    client.close().unwrap();
    peer.join().unwrap();
}

#[test]
fn test_error_reply_keeps_connection() {
    let (port, peer) = scripted_peer(|mut stream| {
        read_request(&mut stream);
        write_raw(&mut stream, MessageType::ERROR.code(), b"no handler for X");
        let (code, payload) = read_request(&mut stream);
        write_raw(&mut stream, code, &payload);
    });
    let mut client = connected_client(port);

    let reply = client.request(MessageType::DATA, &[0, 0, 0, 1]).unwrap();
    assert_eq!(reply, Reply::Error(Bytes::from_static(b"no handler for X")));
    assert!(client.is_connected());
    assert!(client.check_connection());

    client.close().unwrap();
    peer.join().unwrap();
}

#[test]
fn test_custom_reply_handler() {
    let custom = MessageType::register("CLIENT_TEST_CUSTOM").unwrap();
    let (port, peer) = echo_peer(1);
    let mut client = connected_client(port);
    client.register_handler(custom, move |payload: &[u8]| {
        Ok(Reply::Raw {
            message_type: custom,
            payload: Bytes::copy_from_slice(payload),
        })
    });

    let reply = client.request(custom, b"xyz").unwrap();
    assert_eq!(reply.message_type(), custom);
    assert_eq!(
        reply,
        Reply::Raw {
            message_type: custom,
            payload: Bytes::from_static(b"xyz")
        }
    );

    client.close().unwrap();
    peer.join().unwrap();
}

#[test]
fn test_reply_without_handler_keeps_connection() {
    let orphan = MessageType::register("CLIENT_TEST_ORPHAN").unwrap();
    let (port, peer) = echo_peer(2);
    let mut client = connected_client(port);

    match client.request(orphan, b"") {
        Err(FrameError::Unhandled { message_type, reason }) => {
            assert_eq!(message_type, "CLIENT_TEST_ORPHAN");
            assert!(reason.contains("no handler"));
        }
        other => panic!("Expected Unhandled, got {:?}", other),
    }

    // The reply frame was consumed whole, so the stream is still aligned
    assert!(client.is_connected());
    assert!(client.check_connection());

    client.close().unwrap();
    peer.join().unwrap();
}

#[test]
fn test_reply_arriving_byte_by_byte() {
    let (port, peer) = scripted_peer(|mut stream| {
        stream.set_nodelay(true).unwrap();
        read_request(&mut stream);
        for byte in [0x00, 0x04, b'p', b'o', b'n', b'g'] {
            stream.write_all(&[byte]).unwrap();
            thread::sleep(Duration::from_millis(10));
        }
    });
    let mut client = connected_client(port);

    assert_eq!(
        client.request(MessageType::CHECK, b"ping").unwrap(),
        Reply::Check(Bytes::from_static(b"pong"))
    );

    client.close().unwrap();
    peer.join().unwrap();
}

#[test]
fn test_receive_unsolicited_frame() {
    let (port, peer) = scripted_peer(|mut stream| {
        write_raw(&mut stream, MessageType::DATA.code(), &DataPayload::new(9, "push").encode());
    });
    let mut client = connected_client(port);

    assert_eq!(client.receive(), Some(Reply::Data(DataPayload::new(9, "push"))));

    client.close().unwrap();
    peer.join().unwrap();
}

#[test]
fn test_sequential_requests_in_order() {
    let (port, peer) = echo_peer(5);
    let mut client = connected_client(port);

    for i in 0..5u8 {
        let reply = client.request(MessageType::CHECK, &[i]).unwrap();
        assert_eq!(reply, Reply::Check(Bytes::copy_from_slice(&[i])));
    }

    client.close().unwrap();
    peer.join().unwrap();
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_payload_too_large_keeps_connection() {
    let (port, peer) = echo_peer(1);
    let mut client = connected_client(port);

    let result = client.request(MessageType::DATA, &[0u8; 256]);
    assert!(matches!(
        result,
        Err(FrameError::PayloadTooLarge { size: 256, max: 255 })
    ));

    // Nothing was sent, so the connection is still usable
    assert!(client.is_connected());
    assert!(client.check_connection());

    client.close().unwrap();
    peer.join().unwrap();
}

#[test]
fn test_reply_timeout_drops_connection() {
    let (port, peer) = scripted_peer(|mut stream| {
        read_request(&mut stream);
        // Never reply; wait for the client to give up
        let mut buf = [0u8; 1];
        let _ = stream.read(&mut buf);
    });
    let config = ClientConfig::builder().read_timeout_ms(200).build();
    let mut client = Client::with_config(config);
    client.open("127.0.0.1", port).unwrap();

    match client.request(MessageType::CHECK, b"") {
        Err(e) => assert!(e.is_timeout(), "expected timeout, got {:?}", e),
        Ok(reply) => panic!("Expected timeout, got {:?}", reply),
    }
    assert!(!client.is_connected());

    peer.join().unwrap();
}

#[test]
fn test_peer_disconnect_drops_connection() {
    let (port, peer) = scripted_peer(|mut stream| {
        read_request(&mut stream);
    });
    let mut client = connected_client(port);

    match client.request(MessageType::CHECK, b"") {
        Err(e) => assert!(e.is_disconnect(), "expected disconnect, got {:?}", e),
        Ok(reply) => panic!("Expected disconnect, got {:?}", reply),
    }
    assert!(!client.is_connected());
    assert_eq!(client.send_and_await(MessageType::CHECK, b""), None);

    peer.join().unwrap();
}

#[test]
fn test_unknown_reply_type_drops_connection() {
    let (port, peer) = scripted_peer(|mut stream| {
        read_request(&mut stream);
        write_raw(&mut stream, UNREGISTERED_CODE, b"??");
    });
    let mut client = connected_client(port);

    assert!(matches!(
        client.request(MessageType::CHECK, b""),
        Err(FrameError::Decode(DecodeError::UnknownType(UNREGISTERED_CODE)))
    ));
    assert!(!client.is_connected());

    peer.join().unwrap();
}

#[test]
fn test_truncated_reply_drops_connection() {
    let (port, peer) = scripted_peer(|mut stream| {
        read_request(&mut stream);
        stream.write_all(&[0x01, 10, 1, 2, 3]).unwrap();
    });
    let mut client = connected_client(port);

    assert!(matches!(
        client.request(MessageType::DATA, &[0, 0, 0, 0]),
        Err(FrameError::Decode(DecodeError::TruncatedPayload {
            expected: 10,
            actual: 3
        }))
    ));
    assert!(!client.is_connected());

    peer.join().unwrap();
}
