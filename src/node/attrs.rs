//! Attribute map of a node.

use super::{reply_field, NodeHandle};
use crate::codec::Value;
use crate::error::{HurrayError, Result};
use crate::protocol::{commands, keys};

/// Keyed attributes stored on one remote node.
#[derive(Debug, Clone)]
pub struct AttributeView {
    handle: NodeHandle,
}

impl AttributeView {
    pub(crate) fn new(handle: NodeHandle) -> Self {
        Self { handle }
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        let reply = self.handle.send(self.handle.request(commands::ATTRS_KEYS))?;
        reply_field(reply, keys::KEYS)?
            .to_string_list()
            .ok_or_else(|| HurrayError::Protocol("'keys' is not a list of names".into()))
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        let request = self
            .handle
            .request(commands::ATTRS_CONTAINS)
            .arg(keys::KEY, key);
        let reply = self.handle.send(request)?;
        reply_field(reply, keys::CONTAINS)?
            .as_bool()
            .ok_or_else(|| HurrayError::Protocol("'contains' is not a boolean".into()))
    }

    /// Value of `key`; a missing key is a node error with `KEY_ERROR`.
    pub fn get(&self, key: &str) -> Result<Value> {
        let request = self.handle.request(commands::ATTRS_GET).arg(keys::KEY, key);
        Ok(self.handle.send(request)?.unwrap_or(Value::Nil))
    }

    /// Value of `key`, or `default` if the key does not exist.
    ///
    /// Only the missing-key condition is replaced; other errors propagate.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Result<Value> {
        match self.get(key) {
            Err(e) if e.is_key_error() => Ok(default.into()),
            other => other,
        }
    }

    /// Set or overwrite `key`.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let request = self
            .handle
            .request(commands::ATTRS_SET)
            .arg(keys::KEY, key)
            .data(value);
        self.handle.send(request)?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
