//! Protocol module - wire format, framing, status codes and envelopes.
//!
//! This module implements the message layer:
//! - 8-byte header encoding/decoding
//! - Frame struct with length validation
//! - Status codes and their range partition
//! - Request/response envelopes and the command vocabulary

mod envelope;
mod frame;
mod status;
mod wire_format;

pub use envelope::{commands, keys, Args, Request, Response};
pub use frame::{build_frame, Frame};
pub use status::{Status, StatusClass};
pub use wire_format::{Header, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE, PROTOCOL_VERSION};
