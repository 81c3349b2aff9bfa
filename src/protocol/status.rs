//! Status codes returned by the server.
//!
//! The numeric range decides the error kind:
//! ```text
//! 0-199    success (OK, CREATED, ...)
//! 200-299  malformed request / missing argument / missing data
//! 300-399  file-level error
//! 400-499  node-level error
//! 500-599  server-internal error
//! ```

use std::fmt;

use crate::codec::Value;
use crate::error::{HurrayError, Result};

/// Integer outcome code of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Status(pub i64);

/// Range partition of [`Status`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Message,
    File,
    Node,
    Server,
    /// Negative or >= 600.
    Invalid,
}

impl Status {
    pub const OK: Status = Status(0);
    pub const CREATED: Status = Status(1);

    pub const UNKNOWN_COMMAND: Status = Status(200);
    pub const INVALID_ARGUMENT: Status = Status(201);
    pub const MISSING_ARGUMENT: Status = Status(202);
    pub const MISSING_DATA: Status = Status(203);

    pub const FILE_EXISTS: Status = Status(300);
    pub const FILE_NOT_FOUND: Status = Status(301);

    pub const GROUP_EXISTS: Status = Status(400);
    pub const NODE_NOT_FOUND: Status = Status(401);
    pub const DATASET_EXISTS: Status = Status(402);
    pub const VALUE_ERROR: Status = Status(403);
    pub const TYPE_ERROR: Status = Status(404);
    pub const KEY_ERROR: Status = Status(405);
    pub const INCOMPATIBLE_DATA: Status = Status(406);

    pub const INTERNAL_SERVER_ERROR: Status = Status(500);

    /// Numeric value.
    #[inline]
    pub fn code(&self) -> i64 {
        self.0
    }

    /// Range this status falls into.
    pub fn class(&self) -> StatusClass {
        match self.0 {
            0..=199 => StatusClass::Success,
            200..=299 => StatusClass::Message,
            300..=399 => StatusClass::File,
            400..=499 => StatusClass::Node,
            500..=599 => StatusClass::Server,
            _ => StatusClass::Invalid,
        }
    }

    /// Check if this status is a success variant.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.class() == StatusClass::Success
    }

    /// Symbolic name for the known codes.
    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Status::OK => "OK",
            Status::CREATED => "CREATED",
            Status::UNKNOWN_COMMAND => "UNKNOWN_COMMAND",
            Status::INVALID_ARGUMENT => "INVALID_ARGUMENT",
            Status::MISSING_ARGUMENT => "MISSING_ARGUMENT",
            Status::MISSING_DATA => "MISSING_DATA",
            Status::FILE_EXISTS => "FILE_EXISTS",
            Status::FILE_NOT_FOUND => "FILE_NOT_FOUND",
            Status::GROUP_EXISTS => "GROUP_EXISTS",
            Status::NODE_NOT_FOUND => "NODE_NOT_FOUND",
            Status::DATASET_EXISTS => "DATASET_EXISTS",
            Status::VALUE_ERROR => "VALUE_ERROR",
            Status::TYPE_ERROR => "TYPE_ERROR",
            Status::KEY_ERROR => "KEY_ERROR",
            Status::INCOMPATIBLE_DATA => "INCOMPATIBLE_DATA",
            Status::INTERNAL_SERVER_ERROR => "INTERNAL_SERVER_ERROR",
            _ => return None,
        };
        Some(name)
    }

    /// Turn the status into `Ok(())` or the matching typed error.
    pub fn into_result(self, detail: Option<Value>) -> Result<()> {
        let status = self;
        match self.class() {
            StatusClass::Success => Ok(()),
            StatusClass::Message => Err(HurrayError::Message { status, detail }),
            StatusClass::File => Err(HurrayError::File { status, detail }),
            StatusClass::Node => Err(HurrayError::Node { status, detail }),
            StatusClass::Server => Err(HurrayError::Server { status, detail }),
            StatusClass::Invalid => Err(HurrayError::Protocol(format!(
                "Status {} is outside the known ranges",
                self.0
            ))),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} {}", self.0, name),
            None => write!(f, "{}", self.0),
        }
    }
}
