//! Remote object model.
//!
//! Proxies for the nodes of a remote file:
//! - [`File`] and [`Group`] - containers ([`Container`])
//! - [`Dataset`] - n-dimensional array with indexed read/write
//! - [`AttributeView`] - the attribute map of any node
//!
//! Every proxy method issues at most one request. Proxies only come from a
//! decoded node reference or from composing a path under an existing proxy.

mod attrs;
mod dataset;
mod group;
mod tree;

pub use attrs::AttributeView;
pub use dataset::{Dataset, DatasetOptions, COMPRESSION_FILTERS};
pub use group::{Container, File, Group};
pub use tree::Tree;

use std::collections::BTreeMap;
use std::fmt;

use crate::codec::{tags, DType, Value};
use crate::connection::{Connection, FileSlot};
use crate::error::{HurrayError, Result};
use crate::protocol::{keys, Request};

/// Kind of a remote node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Group,
    Dataset,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Group => "group",
            NodeKind::Dataset => "dataset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(NodeKind::File),
            "group" => Some(NodeKind::Group),
            "dataset" => Some(NodeKind::Dataset),
            _ => None,
        }
    }
}

/// A decoded node reference, not yet attached to a connection.
///
/// [`bind`](NodeRef::bind) consumes it, so a reference is bound exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub file: String,
    pub path: String,
    /// Datasets only.
    pub shape: Option<Vec<usize>>,
    /// Datasets only.
    pub dtype: Option<DType>,
}

impl NodeRef {
    /// Read a reference out of a tagged wire map.
    pub fn from_map(kind: NodeKind, map: &BTreeMap<String, Value>) -> Result<Self> {
        let text = |key: &str| -> Result<String> {
            map.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    HurrayError::Protocol(format!(
                        "{} reference is missing '{}'",
                        kind.as_str(),
                        key
                    ))
                })
        };
        let file = text(tags::NODE_FILE)?;
        let path = text(tags::NODE_PATH)?;
        if !path.starts_with('/') {
            return Err(HurrayError::Protocol(format!(
                "Node path '{}' is not absolute",
                path
            )));
        }

        let (shape, dtype) = if kind == NodeKind::Dataset {
            let shape = map
                .get(tags::NODE_SHAPE)
                .and_then(Value::to_shape)
                .ok_or_else(|| {
                    HurrayError::Protocol("dataset reference is missing 'shape'".into())
                })?;
            let dtype = text(tags::NODE_DTYPE)?.parse::<DType>()?;
            (Some(shape), Some(dtype))
        } else {
            (None, None)
        };

        Ok(Self {
            kind,
            file,
            path,
            shape,
            dtype,
        })
    }

    /// Reference as its tagged wire map.
    pub fn into_value(self) -> Value {
        let mut map = BTreeMap::new();
        map.insert(tags::NODE_TYPE.to_string(), Value::from(self.kind.as_str()));
        map.insert(tags::NODE_FILE.to_string(), Value::Str(self.file));
        map.insert(tags::NODE_PATH.to_string(), Value::Str(self.path));
        if let Some(shape) = self.shape {
            map.insert(tags::NODE_SHAPE.to_string(), Value::shape(&shape));
        }
        if let Some(dtype) = self.dtype {
            map.insert(tags::NODE_DTYPE.to_string(), Value::from(dtype));
        }
        Value::Map(map)
    }

    /// Attach the reference to `conn`, producing a usable proxy.
    pub(crate) fn bind(self, conn: Connection, file: FileSlot) -> Node {
        let handle = NodeHandle {
            conn,
            file,
            path: self.path,
        };
        match (self.kind, self.shape, self.dtype) {
            (NodeKind::File, ..) => Node::File(File::from_handle(handle)),
            (NodeKind::Dataset, Some(shape), Some(dtype)) => {
                Node::Dataset(Dataset::from_handle(handle, shape, dtype))
            }
            _ => Node::Group(Group::from_handle(handle)),
        }
    }
}

/// Join `name` onto `base` unless it is already absolute.
///
/// ```
/// use hurray_client::node::compose;
///
/// assert_eq!(compose("/", "a"), "/a");
/// assert_eq!(compose("/a", "b/c"), "/a/b/c");
/// assert_eq!(compose("/a", "/x"), "/x");
/// ```
pub fn compose(base: &str, name: &str) -> String {
    if name.starts_with('/') {
        return name.to_string();
    }
    let base = base.trim_end_matches('/');
    format!("{}/{}", base, name)
}

/// What every proxy carries: its connection, file and absolute path.
#[derive(Clone)]
pub struct NodeHandle {
    pub(crate) conn: Connection,
    pub(crate) file: FileSlot,
    pub(crate) path: String,
}

impl NodeHandle {
    pub(crate) fn new(conn: Connection, file: FileSlot, path: String) -> Self {
        Self { conn, file, path }
    }

    /// Handle for a path in the same file.
    pub(crate) fn at(&self, path: String) -> Self {
        Self {
            conn: self.conn.clone(),
            file: self.file.clone(),
            path,
        }
    }

    /// Request addressed at this node's path.
    pub(crate) fn request(&self, command: &str) -> Request {
        Request::new(command).arg(keys::PATH, self.path.as_str())
    }

    /// Send `request` against this node's file.
    pub(crate) fn send(&self, request: Request) -> Result<Option<Value>> {
        self.conn.request_in(&self.file, request)
    }

    fn file_label(&self) -> String {
        self.file
            .current()
            .unwrap_or_else(|| "<retired>".to_string())
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("file", &self.file)
            .field("path", &self.path)
            .finish()
    }
}

/// Capabilities shared by all proxies.
pub trait NodeLike {
    fn handle(&self) -> &NodeHandle;

    /// Absolute path inside the file.
    fn path(&self) -> &str {
        &self.handle().path
    }

    /// Last path component; `/` for the root.
    fn name(&self) -> &str {
        let path = self.path();
        match path.rsplit('/').next() {
            Some(name) if !name.is_empty() => name,
            _ => "/",
        }
    }

    /// Identifier of the file this node lives in.
    fn file_id(&self) -> Result<String> {
        self.handle().file.name()
    }

    fn connection(&self) -> &Connection {
        &self.handle().conn
    }

    fn attrs(&self) -> AttributeView {
        AttributeView::new(self.handle().clone())
    }
}

/// Any bound proxy.
#[derive(Debug, Clone)]
pub enum Node {
    File(File),
    Group(Group),
    Dataset(Dataset),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::File(_) => NodeKind::File,
            Node::Group(_) => NodeKind::Group,
            Node::Dataset(_) => NodeKind::Dataset,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Node::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_dataset(&self) -> Option<&Dataset> {
        match self {
            Node::Dataset(d) => Some(d),
            _ => None,
        }
    }

    pub fn into_group(self) -> Option<Group> {
        match self {
            Node::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn into_dataset(self) -> Option<Dataset> {
        match self {
            Node::Dataset(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        !matches!(self, Node::Dataset(_))
    }

    /// The wire reference for this node.
    pub fn reference(&self) -> Result<NodeRef> {
        let handle = self.handle();
        let (shape, dtype) = match self {
            Node::Dataset(d) => (Some(d.shape().to_vec()), Some(d.dtype())),
            _ => (None, None),
        };
        Ok(NodeRef {
            kind: self.kind(),
            file: handle.file.name()?,
            path: handle.path.clone(),
            shape,
            dtype,
        })
    }
}

impl NodeLike for Node {
    fn handle(&self) -> &NodeHandle {
        match self {
            Node::File(f) => f.handle(),
            Node::Group(g) => g.handle(),
            Node::Dataset(d) => d.handle(),
        }
    }
}

/// Same kind, file and path.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.handle(), other.handle());
        self.kind() == other.kind()
            && a.path == b.path
            && a.file.same_file(&b.file)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::File(n) => fmt::Display::fmt(n, f),
            Node::Group(n) => fmt::Display::fmt(n, f),
            Node::Dataset(n) => fmt::Display::fmt(n, f),
        }
    }
}

impl From<File> for Node {
    fn from(v: File) -> Self {
        Node::File(v)
    }
}

impl From<Group> for Node {
    fn from(v: Group) -> Self {
        Node::Group(v)
    }
}

impl From<Dataset> for Node {
    fn from(v: Dataset) -> Self {
        Node::Dataset(v)
    }
}

/// Expect a proxy of `kind` in a reply payload.
pub(crate) fn expect_node(data: Option<Value>, what: &str) -> Result<Node> {
    match data {
        Some(Value::Node(node)) => Ok(node),
        Some(other) => Err(HurrayError::Protocol(format!(
            "Expected a node reference for {}, got {}",
            what,
            other.type_name()
        ))),
        None => Err(HurrayError::Protocol(format!(
            "Reply to {} carries no node reference",
            what
        ))),
    }
}

/// Take `key` out of a reply map (or accept the bare value).
pub(crate) fn reply_field(data: Option<Value>, key: &str) -> Result<Value> {
    match data {
        Some(Value::Map(mut map)) if map.contains_key(key) => {
            Ok(map.remove(key).unwrap_or(Value::Nil))
        }
        Some(Value::Map(_)) | None => Err(HurrayError::Protocol(format!(
            "Reply is missing '{}'",
            key
        ))),
        Some(other) => Ok(other),
    }
}
