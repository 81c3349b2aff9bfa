//! Error types for hurray-client.
//!
//! Every failure surfaces as a [`HurrayError`]. Callers that only care about
//! the broad category match on [`HurrayError::kind`]; callers that need the
//! server's sub-condition (e.g. "attribute key not found") compare
//! [`HurrayError::status`] against the [`Status`] constants.

use thiserror::Error;

use crate::codec::Value;
use crate::protocol::Status;

/// Main error type for all hurray operations.
#[derive(Debug, Error)]
pub enum HurrayError {
    /// I/O error on the underlying socket (includes read/write timeouts).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the stream before a full frame was transferred.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Malformed frame or envelope.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// JSON error while loading a client configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Status 200-299: the server rejected the request itself.
    #[error("Message error: {status}")]
    Message { status: Status, detail: Option<Value> },

    /// Status 300-399: file-level failure.
    #[error("File error: {status}")]
    File { status: Status, detail: Option<Value> },

    /// Status 400-499: node-level failure.
    #[error("Node error: {status}")]
    Node { status: Status, detail: Option<Value> },

    /// Status 500-599: opaque server failure.
    #[error("Server error: {status}")]
    Server { status: Status, detail: Option<Value> },

    /// A local precondition failed before anything was sent.
    #[error("Usage error: {0}")]
    Usage(String),

    /// The handle refers to a retired file or a dead connection.
    #[error("Stale handle: {0}")]
    Stale(String),
}

/// Coarse error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Message,
    File,
    Node,
    Server,
    Usage,
    Stale,
}

impl HurrayError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::ConnectionClosed => ErrorKind::Transport,
            Self::Protocol(_) | Self::MsgPackEncode(_) | Self::MsgPackDecode(_) => {
                ErrorKind::Protocol
            }
            Self::Message { .. } => ErrorKind::Message,
            Self::File { .. } => ErrorKind::File,
            Self::Node { .. } => ErrorKind::Node,
            Self::Server { .. } => ErrorKind::Server,
            Self::Usage(_) | Self::Json(_) => ErrorKind::Usage,
            Self::Stale(_) => ErrorKind::Stale,
        }
    }

    /// Server status carried by status-derived errors.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Message { status, .. }
            | Self::File { status, .. }
            | Self::Node { status, .. }
            | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Diagnostic payload the server attached to a failure, if any.
    pub fn detail(&self) -> Option<&Value> {
        match self {
            Self::Message { detail, .. }
            | Self::File { detail, .. }
            | Self::Node { detail, .. }
            | Self::Server { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }

    /// True for failures that leave the connection unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Protocol)
    }

    /// True if this is the node-level "key not found" condition.
    pub fn is_key_error(&self) -> bool {
        self.status() == Some(Status::KEY_ERROR)
    }
}

/// Result type alias using HurrayError.
pub type Result<T> = std::result::Result<T, HurrayError>;
