//! Protocol Module
//!
//! Defines the wire protocol shared by client and server.
//!
//! ## Frame Format
//!
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Type (1) │ Len (1)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Predefined Types
//! - 0x00: CHECK - Payload: anything, echoed back
//! - 0x01: DATA  - Payload: number (4, big-endian) + UTF-8 text
//! - 0x02: ERROR - Payload: optional UTF-8 reason
//!
//! Further types are registered by name at runtime and must be registered
//! with the same codes on both peers.

mod message_type;
mod frame;
mod codec;

pub use message_type::MessageType;
pub use frame::{preview, Frame, HEADER_SIZE, MAX_PAYLOAD_SIZE, PREVIEW_LEN};
pub use codec::{decode, encode, encode_frame, read_frame, write_frame};
