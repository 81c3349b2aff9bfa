//! Wire format encoding and decoding.
//!
//! Implements the 8-byte frame header:
//! ```text
//! ┌──────────────────┬──────────────────┐
//! │ Protocol version │ Payload length   │
//! │ 4 bytes          │ 4 bytes          │
//! │ uint32 BE        │ uint32 BE        │
//! └──────────────────┴──────────────────┘
//! ```
//!
//! All multi-byte integers are Big Endian.

use crate::error::{HurrayError, Result};

/// Header size in bytes (fixed, exactly 8).
pub const HEADER_SIZE: usize = 8;

/// Protocol version written into every outgoing frame.
pub const PROTOCOL_VERSION: u32 = 1;

/// Default maximum payload size (1 GB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 1_073_741_824;

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Protocol version announced by the sender.
    pub protocol_version: u32,
    /// Payload length in bytes.
    pub payload_length: u32,
}

impl Header {
    /// Create a header for the current protocol version.
    pub fn new(payload_length: u32) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            payload_length,
        }
    }

    /// Create a header for a payload, failing if it does not fit in `u32`.
    pub fn for_payload(payload: &[u8]) -> Result<Self> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            HurrayError::Protocol(format!("Payload of {} bytes cannot be framed", payload.len()))
        })?;
        Ok(Self::new(len))
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use hurray_client::protocol::Header;
    ///
    /// let bytes = Header::new(100).encode();
    /// assert_eq!(bytes, [0, 0, 0, 1, 0, 0, 0, 100]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (8 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..4].copy_from_slice(&self.protocol_version.to_be_bytes());
        buf[4..8].copy_from_slice(&self.payload_length.to_be_bytes());
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            protocol_version: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            payload_length: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Validate the header before reading its payload.
    ///
    /// The version is not used to branch decoding yet; only the payload
    /// bound is enforced.
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        if self.payload_length > max_payload_size {
            return Err(HurrayError::Protocol(format!(
                "Payload size {} exceeds maximum {}",
                self.payload_length, max_payload_size
            )));
        }
        Ok(())
    }

    /// Check if the peer speaks the version this client writes.
    #[inline]
    pub fn is_current_version(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
    }
}
