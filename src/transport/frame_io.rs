//! Blocking frame reader/writer over any byte stream.

use std::io::{self, Read, Write};

use bytes::Bytes;

use crate::error::{HurrayError, Result};
use crate::protocol::{build_frame, Frame, Header, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};

/// Reads and writes whole frames.
///
/// A frame is either transferred completely or the call fails; the
/// transport has no partial-frame state of its own.
pub struct FrameTransport<S> {
    stream: S,
    max_payload_size: u32,
}

impl<S: Read + Write> FrameTransport<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    /// Bound on the declared length of incoming frames.
    pub fn with_max_payload_size(mut self, max_payload_size: u32) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    /// Send one frame: a single write of header and payload, then flush.
    pub fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        let frame = build_frame(payload)?;
        self.stream.write_all(&frame).map_err(closed_on_eof)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Receive one frame.
    ///
    /// End of stream before the header or inside the payload is
    /// `ConnectionClosed`.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let mut raw = [0u8; HEADER_SIZE];
        self.stream.read_exact(&mut raw).map_err(closed_on_eof)?;
        let header = Header::decode(&raw)
            .ok_or_else(|| HurrayError::Protocol("Short frame header".into()))?;

        if !header.is_current_version() {
            tracing::warn!(
                "Peer announced protocol version {}, expected {}",
                header.protocol_version,
                crate::protocol::PROTOCOL_VERSION
            );
        }
        header.validate(self.max_payload_size)?;

        let mut payload = vec![0u8; header.payload_length as usize];
        self.stream.read_exact(&mut payload).map_err(closed_on_eof)?;
        Frame::try_new(header, Bytes::from(payload))
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

fn closed_on_eof(e: io::Error) -> HurrayError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof | io::ErrorKind::WriteZero => HurrayError::ConnectionClosed,
        _ => HurrayError::Io(e),
    }
}
