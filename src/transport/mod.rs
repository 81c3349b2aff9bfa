//! Transport module - sockets and frame I/O.
//!
//! Provides:
//! - [`Stream`] over TCP and Unix Domain Sockets
//! - [`FrameTransport`] for reading/writing whole frames

mod frame_io;
mod stream;

pub use frame_io::FrameTransport;
pub use stream::{connect, Stream};
