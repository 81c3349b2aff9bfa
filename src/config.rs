//! Client configuration.
//!
//! A connection string is either `host[:port]` (TCP, default port 2222) or a
//! filesystem path containing `/` (Unix Domain Socket).
//!
//! # Example
//!
//! ```
//! use hurray_client::config::{Address, ClientConfig};
//!
//! let config = ClientConfig::from_json(r#"{"address": "db.local", "file": "weather.h5"}"#).unwrap();
//! assert_eq!(config.address, Address::Tcp { host: "db.local".into(), port: 2222 });
//! assert_eq!(config.file.as_deref(), Some("weather.h5"));
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{HurrayError, Result};
use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;

/// Port used when a connection string names only a host.
pub const DEFAULT_PORT: u16 = 2222;

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl Address {
    /// Parse a connection string.
    ///
    /// # Errors
    ///
    /// `Usage` if the string is empty or malformed.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(HurrayError::Usage("Empty connection string".into()));
        }
        if s.contains('/') {
            return Ok(Address::Unix(PathBuf::from(s)));
        }
        // bracketed IPv6 literal, e.g. [::1]:2222
        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| HurrayError::Usage(format!("Unclosed '[' in '{}'", s)))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => parse_port(port, s)?,
                None if tail.is_empty() => DEFAULT_PORT,
                None => return Err(HurrayError::Usage(format!("Invalid address '{}'", s))),
            };
            return Ok(Address::Tcp {
                host: host.to_string(),
                port,
            });
        }
        match s.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => Ok(Address::Tcp {
                host: host.to_string(),
                port: parse_port(port, s)?,
            }),
            _ => Ok(Address::Tcp {
                host: s.to_string(),
                port: DEFAULT_PORT,
            }),
        }
    }
}

fn parse_port(port: &str, address: &str) -> Result<u16> {
    port.parse()
        .map_err(|_| HurrayError::Usage(format!("Invalid port in '{}'", address)))
}

impl FromStr for Address {
    type Err = HurrayError;

    fn from_str(s: &str) -> Result<Self> {
        Address::parse(s)
    }
}

impl Default for Address {
    fn default() -> Self {
        Address::Tcp {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Tcp { host, port } if host.contains(':') => write!(f, "[{}]:{}", host, port),
            Address::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Address::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Settings for one connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub address: Address,
    /// File bound right after connecting.
    pub file: Option<String>,
    /// Upper bound on the payload size of incoming frames.
    pub max_payload_size: u32,
    /// Read/write deadline in milliseconds; `None` blocks indefinitely.
    pub io_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: Address::default(),
            file: None,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            io_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    /// # Errors
    ///
    /// `Json` (a usage error) if the text is not a valid config.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_ms.map(Duration::from_millis)
    }
}
