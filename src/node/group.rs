//! Groups and files.

use std::fmt;

use super::dataset::{Dataset, DatasetOptions};
use super::tree::Tree;
use super::{compose, expect_node, reply_field, Node, NodeHandle, NodeLike};
use crate::codec::Value;
use crate::connection::{Connection, FileSlot};
use crate::error::{HurrayError, Result};
use crate::protocol::{commands, keys, Request, Status};

/// Operations of nodes that hold children.
///
/// Names may be relative (joined onto this node's path) or absolute.
///
/// # Errors
///
/// Every method fails with `Stale` once the file was renamed or deleted or
/// the connection is closed or broken. Transport and protocol failures
/// break the connection. Server statuses surface as the matching
/// [`HurrayError`] kind.
pub trait Container: NodeLike {
    /// Create a group.
    ///
    /// # Errors
    ///
    /// A node error with status `GROUP_EXISTS` if the path is taken.
    fn create_group(&self, name: &str) -> Result<Group> {
        let handle = self.handle();
        let path = compose(&handle.path, name);
        handle.send(handle.at(path.clone()).request(commands::CREATE_GROUP))?;
        Ok(Group::from_handle(handle.at(path)))
    }

    /// Open a group, creating it if missing.
    ///
    /// An existing non-group node at the path is a node error.
    fn require_group(&self, name: &str) -> Result<Group> {
        let handle = self.handle();
        let path = compose(&handle.path, name);
        handle.send(handle.at(path.clone()).request(commands::REQUIRE_GROUP))?;
        Ok(Group::from_handle(handle.at(path)))
    }

    /// Create a dataset from data, or from a shape and optional dtype.
    ///
    /// # Errors
    ///
    /// `Usage` if `options` carries neither data nor a shape; nothing is
    /// sent then. A node error with status `DATASET_EXISTS` if the path is
    /// taken.
    fn create_dataset(&self, name: &str, options: DatasetOptions) -> Result<Dataset> {
        let handle = self.handle();
        let path = compose(&handle.path, name);
        let request = options.into_request(commands::CREATE_DATASET, &path, false)?;
        let reply = handle.send(request)?;
        dataset_from_reply(reply, commands::CREATE_DATASET)
    }

    /// Open a dataset, creating it if missing.
    ///
    /// An existing dataset whose shape/dtype do not fit `options` fails with
    /// a node error of status `TYPE_ERROR`.
    fn require_dataset(&self, name: &str, options: DatasetOptions) -> Result<Dataset> {
        let handle = self.handle();
        let path = compose(&handle.path, name);
        let request = options.into_request(commands::REQUIRE_DATASET, &path, true)?;
        let reply = handle.send(request).map_err(|e| match e {
            HurrayError::Node { status, detail } if status == Status::INCOMPATIBLE_DATA => {
                HurrayError::Node {
                    status: Status::TYPE_ERROR,
                    detail,
                }
            }
            other => other,
        })?;
        dataset_from_reply(reply, commands::REQUIRE_DATASET)
    }

    /// Look up a child (or any absolute path) in this file.
    ///
    /// # Errors
    ///
    /// A node error with status `NODE_NOT_FOUND` if nothing is there.
    fn get(&self, name: &str) -> Result<Node> {
        let handle = self.handle();
        let path = compose(&handle.path, name);
        let reply = handle.send(handle.at(path).request(commands::GET_NODE))?;
        expect_node(reply, commands::GET_NODE)
    }

    /// Whether a node exists at `name`.
    ///
    /// # Errors
    ///
    /// Only failures other than `NODE_NOT_FOUND`.
    fn contains(&self, name: &str) -> Result<bool> {
        match self.get(name) {
            Ok(_) => Ok(true),
            Err(e) if e.status() == Some(Status::NODE_NOT_FOUND) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Names of the direct children.
    fn keys(&self) -> Result<Vec<String>> {
        let handle = self.handle();
        let reply = handle.send(handle.request(commands::GET_KEYS))?;
        reply_field(reply, keys::KEYS)?
            .to_string_list()
            .ok_or_else(|| HurrayError::Protocol("'keys' is not a list of names".into()))
    }

    /// Direct children with their names, from one tree snapshot.
    fn items(&self) -> Result<Vec<(String, Node)>> {
        let tree = self.tree()?;
        Ok(tree
            .children
            .into_iter()
            .map(|child| (child.node.name().to_string(), child.node))
            .collect())
    }

    /// Snapshot of the whole subtree.
    fn tree(&self) -> Result<Tree> {
        let handle = self.handle();
        let reply = handle.send(handle.request(commands::GET_TREE))?;
        Tree::from_value(reply_field(reply, keys::TREE)?)
    }

    /// Walk the subtree pre-order with each node's path.
    ///
    /// The first `Some` returned by `f` stops the walk and is returned.
    fn visit<R, F>(&self, mut f: F) -> Result<Option<R>>
    where
        Self: Sized,
        F: FnMut(&str) -> Option<R>,
    {
        Ok(self.tree()?.walk(&mut |node: &Node| f(node.path())))
    }

    /// Like [`visit`](Container::visit), with the proxy as well.
    fn visit_items<R, F>(&self, mut f: F) -> Result<Option<R>>
    where
        Self: Sized,
        F: FnMut(&str, &Node) -> Option<R>,
    {
        Ok(self.tree()?.walk(&mut |node: &Node| f(node.path(), node)))
    }
}

fn dataset_from_reply(reply: Option<Value>, command: &str) -> Result<Dataset> {
    match expect_node(reply, command)? {
        Node::Dataset(dataset) => Ok(dataset),
        other => Err(HurrayError::Protocol(format!(
            "{} returned a {} instead of a dataset",
            command,
            other.kind().as_str()
        ))),
    }
}

/// A group inside a file.
#[derive(Debug, Clone)]
pub struct Group {
    handle: NodeHandle,
}

impl Group {
    pub(crate) fn from_handle(handle: NodeHandle) -> Self {
        Self { handle }
    }
}

impl NodeLike for Group {
    fn handle(&self) -> &NodeHandle {
        &self.handle
    }
}

impl Container for Group {}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Group (db={}, path={})>",
            self.handle.file_label(),
            self.handle.path
        )
    }
}

/// The root group of a file, plus file-level operations.
#[derive(Debug, Clone)]
pub struct File {
    handle: NodeHandle,
}

impl File {
    pub(crate) fn open(conn: Connection, file: FileSlot) -> Self {
        Self::from_handle(NodeHandle::new(conn, file, "/".to_string()))
    }

    pub(crate) fn from_handle(handle: NodeHandle) -> Self {
        Self { handle }
    }

    /// File size in bytes.
    pub fn size(&self) -> Result<u64> {
        let reply = self.handle.send(Request::new(commands::FILE_SIZE))?;
        reply
            .as_ref()
            .and_then(Value::as_u64)
            .ok_or_else(|| HurrayError::Protocol("File size is not an integer".into()))
    }

    /// File size with a unit suffix, e.g. `2.3G`.
    pub fn size_formatted(&self) -> Result<String> {
        Ok(format_size(self.size()?))
    }

    /// Rename the file on the server.
    ///
    /// Every proxy of the old name becomes stale; the returned file is bound
    /// to the new name.
    pub fn rename(&self, new_name: &str) -> Result<File> {
        let request = Request::new(commands::RENAME_FILE).arg(keys::NEW_NAME, new_name);
        self.handle.send(request)?;
        let slot = self.handle.conn.rename(&self.handle.file, new_name);
        Ok(File::open(self.handle.conn.clone(), slot))
    }

    /// Delete the file on the server. Every proxy of it becomes stale.
    pub fn delete(&self) -> Result<()> {
        self.handle.send(Request::new(commands::DELETE_FILE))?;
        self.handle.conn.retire(&self.handle.file);
        Ok(())
    }
}

impl NodeLike for File {
    fn handle(&self) -> &NodeHandle {
        &self.handle
    }
}

impl Container for File {}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<File (db={}, path={})>",
            self.handle.file_label(),
            self.handle.path
        )
    }
}

/// Decimal units: `T`, `G` and `M` with one decimal, `K` rounded, then bytes.
fn format_size(size: u64) -> String {
    let size_f = size as f64;
    if size > 1_000_000_000_000 {
        format!("{:.1}T", size_f / 1e12)
    } else if size > 1_000_000_000 {
        format!("{:.1}G", size_f / 1e9)
    } else if size > 1_000_000 {
        format!("{:.1}M", size_f / 1e6)
    } else if size > 1_000 {
        format!("{:.0}K", size_f / 1e3)
    } else {
        format!("{}b", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0b");
        assert_eq!(format_size(999), "999b");
        assert_eq!(format_size(1_000), "1000b");
        assert_eq!(format_size(12_345), "12K");
        assert_eq!(format_size(1_500_000), "1.5M");
        assert_eq!(format_size(2_300_000_000), "2.3G");
        assert_eq!(format_size(4_200_000_000_000), "4.2T");
    }
}
