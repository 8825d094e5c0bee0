//! Built-in handlers
//!
//! The CHECK / DATA / ERROR handlers every server and client starts with.
//! They are ordinary registrations and can be replaced like any other.

use bytes::Bytes;

use super::{ClientHandlers, DataPayload, HandlerResult, Reply, ServerHandlers};
use crate::error::HandlerError;
use crate::protocol::MessageType;

/// Register the default server handlers
pub fn register_server_defaults(handlers: &ServerHandlers) {
    handlers.register(MessageType::CHECK, server_check);
    handlers.register(MessageType::DATA, server_data);
    handlers.register(MessageType::ERROR, server_error);
}

/// Register the default client handlers
pub fn register_client_defaults(handlers: &ClientHandlers) {
    handlers.register(MessageType::CHECK, client_check);
    handlers.register(MessageType::DATA, client_data);
    handlers.register(MessageType::ERROR, client_error);
}

// =============================================================================
// Server side
// =============================================================================

/// Echo the probe payload
fn server_check(payload: &[u8]) -> HandlerResult<Vec<u8>> {
    tracing::debug!("Received CHECK message (server)");
    Ok(payload.to_vec())
}

/// Increment the number, echo the text
fn server_data(payload: &[u8]) -> HandlerResult<Vec<u8>> {
    let data = DataPayload::decode(payload)
        .ok_or_else(|| HandlerError::new("DATA payload shorter than 4 bytes"))?;
    tracing::debug!(number = data.number, text = %data.text, "Received DATA (server)");

    let number = data
        .number
        .checked_add(1)
        .ok_or_else(|| HandlerError::new("DATA number overflow"))?;

    let mut response = Vec::with_capacity(payload.len());
    response.extend_from_slice(&number.to_be_bytes());
    response.extend_from_slice(&payload[4..]);
    Ok(response)
}

fn server_error(payload: &[u8]) -> HandlerResult<Vec<u8>> {
    tracing::warn!(reason = %String::from_utf8_lossy(payload), "Received ERROR message (server)");
    Ok(Vec::new())
}

// =============================================================================
// Client side
// =============================================================================

fn client_check(payload: &[u8]) -> HandlerResult<Reply> {
    tracing::debug!("Received CHECK message (client)");
    Ok(Reply::Check(Bytes::copy_from_slice(payload)))
}

fn client_data(payload: &[u8]) -> HandlerResult<Reply> {
    match DataPayload::decode(payload) {
        Some(data) => {
            tracing::debug!(number = data.number, text = %data.text, "Received DATA (client)");
            Ok(Reply::Data(data))
        }
        None => {
            tracing::error!("Invalid DATA format (client)");
            Ok(Reply::Error(Bytes::new()))
        }
    }
}

fn client_error(payload: &[u8]) -> HandlerResult<Reply> {
    tracing::warn!(reason = %String::from_utf8_lossy(payload), "Received ERROR message (client)");
    Ok(Reply::Error(Bytes::copy_from_slice(payload)))
}
