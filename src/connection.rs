//! Connection to a Hurray server.
//!
//! A [`Connection`] owns one stream and runs strictly alternating
//! request/reply exchanges over it. Every proxy handed out by the object
//! model keeps a clone of the connection it came from.
//!
//! # Example
//!
//! ```ignore
//! use hurray_client::prelude::*;
//!
//! let conn = Connection::builder()
//!     .address(Address::parse("localhost:2222")?)
//!     .io_timeout(std::time::Duration::from_secs(30))
//!     .connect()?;
//!
//! let file = conn.create_file("weather.h5")?;
//! let group = file.require_group("stations")?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use crate::codec::{MsgPackCodec, Resolver, Value};
use crate::config::{Address, ClientConfig};
use crate::error::{HurrayError, Result};
use crate::node::{File, NodeLike, NodeRef};
use crate::protocol::{commands, keys, Request, Response};
use crate::transport::{self, FrameTransport, Stream};

/// Shared, retirable file identifier.
///
/// Every proxy of one file holds a clone of the same slot; retiring it
/// (rename/delete) makes all of them stale at once.
#[derive(Clone)]
pub(crate) struct FileSlot(Arc<RwLock<Option<String>>>);

impl FileSlot {
    fn new(name: &str) -> Self {
        FileSlot(Arc::new(RwLock::new(Some(name.to_string()))))
    }

    /// Current identifier, or `Stale` once retired.
    pub(crate) fn name(&self) -> Result<String> {
        self.current()
            .ok_or_else(|| HurrayError::Stale("File was renamed or deleted".into()))
    }

    pub(crate) fn current(&self) -> Option<String> {
        let guard = self.0.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    fn retire(&self) -> Option<String> {
        let mut guard = self.0.write().unwrap_or_else(|e| e.into_inner());
        guard.take()
    }

    pub(crate) fn same(&self, other: &FileSlot) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Same slot, or two live slots naming the same file.
    ///
    /// Retired slots only match themselves.
    pub(crate) fn same_file(&self, other: &FileSlot) -> bool {
        if self.same(other) {
            return true;
        }
        match (self.current(), other.current()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for FileSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.current() {
            Some(name) => write!(f, "FileSlot({})", name),
            None => f.write_str("FileSlot(<retired>)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Open,
    Broken(String),
    Closed,
}

struct Session {
    transport: FrameTransport<Box<dyn Stream>>,
    state: State,
    bound: Option<FileSlot>,
}

impl Session {
    fn check_usable(&self) -> Result<()> {
        match &self.state {
            State::Open => Ok(()),
            State::Broken(reason) => Err(HurrayError::Stale(format!(
                "Connection is broken: {}",
                reason
            ))),
            State::Closed => Err(HurrayError::Stale("Connection is closed".into())),
        }
    }

    fn roundtrip(&mut self, payload: &[u8]) -> Result<bytes::Bytes> {
        self.transport.write_frame(payload)?;
        Ok(self.transport.read_frame()?.payload)
    }
}

struct Shared {
    session: Mutex<Session>,
    // separate from the session so decoding can look up slots mid-request
    files: Mutex<HashMap<String, FileSlot>>,
    config: ClientConfig,
}

/// A live connection to one server.
///
/// Cloning is cheap; clones share the stream. Use from one thread at a
/// time: requests are serialized, never pipelined.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

impl Connection {
    /// Connect with default settings to `host[:port]` or a socket path.
    ///
    /// # Errors
    ///
    /// `Usage` for an unparsable address, `Io` if the socket cannot be
    /// opened.
    pub fn connect(address: &str) -> Result<Self> {
        Self::builder().address(Address::parse(address)?).connect()
    }

    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Connect as described by `config`.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        ConnectionBuilder { config }.connect()
    }

    fn with_stream(mut stream: Box<dyn Stream>, config: ClientConfig) -> Result<Self> {
        stream.set_io_timeout(config.io_timeout())?;
        let transport = FrameTransport::new(stream).with_max_payload_size(config.max_payload_size);
        Ok(Self {
            shared: Arc::new(Shared {
                session: Mutex::new(Session {
                    transport,
                    state: State::Open,
                    bound: None,
                }),
                files: Mutex::new(HashMap::new()),
                config,
            }),
        })
    }

    pub fn address(&self) -> &Address {
        &self.shared.config.address
    }

    pub fn is_open(&self) -> bool {
        self.session().state == State::Open
    }

    /// File that requests without an explicit identifier go to.
    pub fn current_file(&self) -> Option<String> {
        self.session().bound.as_ref().and_then(FileSlot::current)
    }

    /// Create a new file on the server.
    ///
    /// # Errors
    ///
    /// A file error with status `FILE_EXISTS` if the name is taken.
    pub fn create_file(&self, name: &str) -> Result<File> {
        self.request_in(&self.slot(name), Request::new(commands::CREATE_FILE))?;
        Ok(File::open(self.clone(), self.slot(name)))
    }

    /// Open an existing file and make it the current file.
    pub fn use_file(&self, name: &str) -> Result<File> {
        let file = self.file(name)?;
        self.session().bound = Some(file.handle().file.clone());
        tracing::debug!("Bound connection to file {}", name);
        Ok(file)
    }

    /// Open an existing file without changing the current file.
    ///
    /// # Errors
    ///
    /// A file error with status `FILE_NOT_FOUND` if there is no such file.
    pub fn file(&self, name: &str) -> Result<File> {
        let slot = self.slot(name);
        self.request_in(&slot, Request::new(commands::USE_FILE))?;
        Ok(File::open(self.clone(), slot))
    }

    /// Send one request and wait for its reply.
    ///
    /// The current file is added as `db` unless the request names one.
    ///
    /// # Errors
    ///
    /// Statuses of 200 and above come back as typed errors. A request
    /// naming a file other than the current one is a `Usage` error and is
    /// not sent. After a Transport or Protocol error every later call fails
    /// with `Stale`.
    pub fn request(&self, mut request: Request) -> Result<Response> {
        let bound = match self.session().bound.clone() {
            Some(slot) => Some(slot.name()?),
            None => None,
        };
        inject_file(&mut request, bound.as_deref())?;
        self.exchange(request)
    }

    /// Like [`request`](Self::request), but against the file held in `slot`.
    pub(crate) fn request_in(&self, slot: &FileSlot, mut request: Request) -> Result<Option<Value>> {
        let name = slot.name()?;
        inject_file(&mut request, Some(&name))?;
        Ok(self.exchange(request)?.data)
    }

    fn exchange(&self, request: Request) -> Result<Response> {
        let mut session = self.session();
        session.check_usable()?;

        let command = request.command.clone();
        let payload = MsgPackCodec::encode(&request.into_value())?;
        tracing::debug!("Sending {} ({} bytes)", command, payload.len());

        let reply = session
            .roundtrip(&payload)
            .and_then(|bytes| MsgPackCodec::decode(&bytes, &mut Binder { conn: self }))
            .and_then(Response::from_value)
            .and_then(|response| {
                let status = response.status;
                Ok(Response::new(status, response.into_data()?))
            });

        match reply {
            Ok(response) => {
                tracing::debug!("Reply to {}: {}", command, response.status);
                Ok(response)
            }
            Err(e) => {
                if e.is_fatal() {
                    tracing::warn!("Connection broken during {}: {}", command, e);
                    session.state = State::Broken(e.to_string());
                } else {
                    tracing::debug!("{} failed: {}", command, e);
                }
                Err(e)
            }
        }
    }

    /// Close the stream. Every proxy of this connection becomes stale.
    pub fn close(&self) -> Result<()> {
        let mut session = self.session();
        if session.state == State::Closed {
            return Ok(());
        }
        session.state = State::Closed;
        tracing::info!("Closing connection to {}", self.shared.config.address);
        match session.transport.get_mut().shutdown() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Live slot for `name`, created on first use.
    pub(crate) fn slot(&self, name: &str) -> FileSlot {
        self.files()
            .entry(name.to_string())
            .or_insert_with(|| FileSlot::new(name))
            .clone()
    }

    /// Retire `slot`; its file no longer exists under that identifier.
    pub(crate) fn retire(&self, slot: &FileSlot) {
        let Some(name) = slot.retire() else {
            return;
        };
        let mut files = self.files();
        if files.get(&name).is_some_and(|s| s.same(slot)) {
            files.remove(&name);
        }
        drop(files);

        let mut session = self.session();
        if session.bound.as_ref().is_some_and(|s| s.same(slot)) {
            session.bound = None;
        }
        tracing::warn!("File identifier {} retired; its proxies are now stale", name);
    }

    /// Retire `old` and hand out a slot for `new_name`; the current file
    /// follows the rename.
    pub(crate) fn rename(&self, old: &FileSlot, new_name: &str) -> FileSlot {
        let was_bound = self
            .session()
            .bound
            .as_ref()
            .is_some_and(|s| s.same(old));
        self.retire(old);
        let slot = self.slot(new_name);
        if was_bound {
            self.session().bound = Some(slot.clone());
        }
        slot
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.shared.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn files(&self) -> MutexGuard<'_, HashMap<String, FileSlot>> {
        self.shared.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.shared.config.address)
            .finish_non_exhaustive()
    }
}

/// Add the file identifier to `request`, refusing a conflicting one.
fn inject_file(request: &mut Request, file: Option<&str>) -> Result<()> {
    match (request.args.get(keys::FILE), file) {
        (Some(given), Some(file)) if given.as_str() != Some(file) => {
            Err(HurrayError::Usage(format!(
                "Request names file {:?} but is bound to '{}'",
                given, file
            )))
        }
        (None, Some(file)) => {
            request
                .args
                .insert(keys::FILE.to_string(), Value::from(file));
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Binds decoded node references to the connection that received them.
struct Binder<'a> {
    conn: &'a Connection,
}

impl Resolver for Binder<'_> {
    fn resolve(&mut self, reference: NodeRef) -> Result<Value> {
        let slot = self.conn.slot(&reference.file);
        Ok(Value::Node(reference.bind(self.conn.clone(), slot)))
    }
}

/// Builder for configuring and opening a [`Connection`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionBuilder {
    config: ClientConfig,
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(mut self, address: Address) -> Self {
        self.config.address = address;
        self
    }

    /// File to bind right after connecting.
    pub fn file(mut self, name: &str) -> Self {
        self.config.file = Some(name.to_string());
        self
    }

    /// Set the maximum accepted payload size of incoming frames.
    ///
    /// Default: 1 GiB
    pub fn max_payload_size(mut self, limit: u32) -> Self {
        self.config.max_payload_size = limit;
        self
    }

    /// Deadline for each socket read and write; expiry breaks the connection.
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.config.io_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Open the socket and bind the configured file.
    ///
    /// # Errors
    ///
    /// `Io` if the socket cannot be opened; any error of
    /// [`Connection::use_file`] for the configured file.
    pub fn connect(self) -> Result<Connection> {
        let stream = transport::connect(&self.config.address, self.config.io_timeout())?;
        tracing::info!("Connected to {}", self.config.address);
        self.connect_with(stream)
    }

    /// Run the protocol over an already connected stream.
    pub fn connect_with(self, stream: Box<dyn Stream>) -> Result<Connection> {
        let file = self.config.file.clone();
        let conn = Connection::with_stream(stream, self.config)?;
        if let Some(name) = file {
            conn.use_file(&name)?;
        }
        Ok(conn)
    }
}
