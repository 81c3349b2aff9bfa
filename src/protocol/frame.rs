//! Frame struct: a validated header plus its payload.
//!
//! Uses `bytes::Bytes` so decoded payloads can be handed around without
//! copying.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use hurray_client::protocol::{build_frame, Frame, Header, HEADER_SIZE};
//!
//! let bytes = build_frame(b"hello").unwrap();
//! assert_eq!(bytes.len(), HEADER_SIZE + 5);
//!
//! let header = Header::decode(&bytes[..HEADER_SIZE]).unwrap();
//! let frame = Frame::try_new(header, Bytes::copy_from_slice(&bytes[HEADER_SIZE..])).unwrap();
//! assert_eq!(frame.payload(), b"hello");
//! ```

use bytes::Bytes;

use super::wire_format::{Header, HEADER_SIZE};
use crate::error::{HurrayError, Result};

/// A complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Pair a header with its payload.
    ///
    /// Fails if the declared length differs from the actual payload size.
    pub fn try_new(header: Header, payload: Bytes) -> Result<Self> {
        if header.payload_length as usize != payload.len() {
            return Err(HurrayError::Protocol(format!(
                "Frame declares {} payload bytes but carries {}",
                header.payload_length,
                payload.len()
            )));
        }
        Ok(Self { header, payload })
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Protocol version announced by the sender.
    #[inline]
    pub fn protocol_version(&self) -> u32 {
        self.header.protocol_version
    }
}

/// Build a complete frame as a single byte vector.
///
/// The length field is always computed from `payload`.
pub fn build_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let header = Header::for_payload(payload)?;
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    Ok(buf)
}
