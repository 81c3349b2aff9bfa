//! Request and response envelopes.
//!
//! A request is a map with exactly three keys:
//! ```text
//! { "cmd": <string>, "args": { <string>: <value>, ... }, "data": <value|nil> }
//! ```
//! A response is a map with a `status` integer and an optional `data` value.

use std::collections::BTreeMap;

use crate::codec::Value;
use crate::error::{HurrayError, Result};

use super::status::Status;

/// Argument map of a request. A fresh one is built for every call.
pub type Args = BTreeMap<String, Value>;

/// Envelope and argument key names.
pub mod keys {
    pub const CMD: &str = "cmd";
    pub const ARGS: &str = "args";
    pub const DATA: &str = "data";
    pub const STATUS: &str = "status";

    /// File identifier, injected by the connection.
    pub const FILE: &str = "db";
    pub const PATH: &str = "path";
    pub const KEY: &str = "key";
    pub const SHAPE: &str = "shape";
    pub const DTYPE: &str = "dtype";
    pub const EXACT: &str = "exact";
    pub const CHUNKS: &str = "chunks";
    pub const COMPRESSION: &str = "compression";
    pub const COMPRESSION_OPTS: &str = "compression_opts";
    pub const FILLVALUE: &str = "fillvalue";
    pub const NEW_NAME: &str = "new_name";

    /// Keys inside a response `data` map.
    pub const KEYS: &str = "keys";
    pub const TREE: &str = "tree";
    pub const CONTAINS: &str = "contains";
}

/// Command names understood by the server.
pub mod commands {
    pub const CREATE_FILE: &str = "create_db";
    pub const USE_FILE: &str = "connect_db";
    pub const RENAME_FILE: &str = "rename_db";
    pub const DELETE_FILE: &str = "delete_db";
    pub const FILE_SIZE: &str = "get_filesize";

    pub const CREATE_GROUP: &str = "create_group";
    pub const REQUIRE_GROUP: &str = "require_group";
    pub const CREATE_DATASET: &str = "create_dataset";
    pub const REQUIRE_DATASET: &str = "require_dataset";
    pub const GET_NODE: &str = "get_node";
    pub const GET_KEYS: &str = "get_keys";
    pub const GET_TREE: &str = "get_tree";

    pub const SLICE_DATASET: &str = "slice_dataset";
    pub const BROADCAST_DATASET: &str = "broadcast_dataset";

    pub const ATTRS_GET: &str = "attrs_getitem";
    pub const ATTRS_SET: &str = "attrs_setitem";
    pub const ATTRS_CONTAINS: &str = "attrs_contains";
    pub const ATTRS_KEYS: &str = "attrs_keys";
}

/// One command sent to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub command: String,
    pub args: Args,
    pub data: Option<Value>,
}

impl Request {
    /// Start a request with an empty argument map.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Args::new(),
            data: None,
        }
    }

    /// Add one argument.
    pub fn arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    /// Add one argument if present.
    pub fn arg_opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.arg(key, v),
            None => self,
        }
    }

    /// Attach the payload value.
    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// File identifier present in the argument map, if any.
    pub fn file(&self) -> Option<&str> {
        self.args.get(keys::FILE).and_then(Value::as_str)
    }

    /// Envelope as a wire value.
    pub fn into_value(self) -> Value {
        let mut map = BTreeMap::new();
        map.insert(keys::CMD.to_string(), Value::Str(self.command));
        map.insert(keys::ARGS.to_string(), Value::Map(self.args));
        map.insert(keys::DATA.to_string(), self.data.unwrap_or(Value::Nil));
        Value::Map(map)
    }

    /// Parse a decoded envelope (server side and tests).
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Map(mut map) = value else {
            return Err(HurrayError::Protocol("Request envelope is not a map".into()));
        };
        let command = match map.remove(keys::CMD) {
            Some(Value::Str(cmd)) => cmd,
            Some(_) => return Err(HurrayError::Protocol("'cmd' is not a string".into())),
            None => return Err(HurrayError::Protocol("Request is missing 'cmd'".into())),
        };
        let args = match map.remove(keys::ARGS) {
            Some(Value::Map(args)) => args,
            Some(_) => return Err(HurrayError::Protocol("'args' is not a map".into())),
            None => return Err(HurrayError::Protocol("Request is missing 'args'".into())),
        };
        let data = match map.remove(keys::DATA) {
            Some(Value::Nil) => None,
            Some(v) => Some(v),
            None => return Err(HurrayError::Protocol("Request is missing 'data'".into())),
        };
        Ok(Self { command, args, data })
    }
}

/// One reply received from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: Status,
    pub data: Option<Value>,
}

impl Response {
    pub fn new(status: Status, data: Option<Value>) -> Self {
        Self { status, data }
    }

    /// Parse a decoded reply envelope.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Map(mut map) = value else {
            return Err(HurrayError::Protocol("Response envelope is not a map".into()));
        };
        let status = match map.remove(keys::STATUS) {
            Some(v) => v.as_i64().map(Status).ok_or_else(|| {
                HurrayError::Protocol("'status' is not an integer".into())
            })?,
            None => return Err(HurrayError::Protocol("Response is missing 'status'".into())),
        };
        let data = match map.remove(keys::DATA) {
            None | Some(Value::Nil) => None,
            Some(v) => Some(v),
        };
        Ok(Self { status, data })
    }

    /// Reply as a wire value.
    pub fn into_value(self) -> Value {
        let mut map = BTreeMap::new();
        map.insert(keys::STATUS.to_string(), Value::Int(self.status.code()));
        if let Some(data) = self.data {
            map.insert(keys::DATA.to_string(), data);
        }
        Value::Map(map)
    }

    /// Payload of a successful reply, or the typed error for a failed one.
    pub fn into_data(self) -> Result<Option<Value>> {
        if self.status.is_success() {
            return Ok(self.data);
        }
        self.status.into_result(self.data)?;
        Ok(None)
    }
}
