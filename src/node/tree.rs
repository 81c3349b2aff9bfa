//! Subtree snapshots.
//!
//! On the wire a tree node is a two-element array `[node, [children...]]`.

use std::fmt;

use super::dataset::format_shape;
use super::{Node, NodeLike};
use crate::codec::Value;
use crate::error::{HurrayError, Result};

/// One node of a snapshot with its children.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub node: Node,
    pub children: Vec<Tree>,
}

impl Tree {
    pub fn from_value(value: Value) -> Result<Self> {
        let invalid = |what: &str| HurrayError::Protocol(format!("Malformed tree: {}", what));
        let Value::Array(pair) = value else {
            return Err(invalid("entry is not a [node, children] pair"));
        };
        let [node, children]: [Value; 2] = pair
            .try_into()
            .map_err(|_| invalid("entry is not a [node, children] pair"))?;
        let Value::Node(node) = node else {
            return Err(invalid("entry does not start with a node"));
        };
        let Value::Array(children) = children else {
            return Err(invalid("children are not a list"));
        };
        let children = children
            .into_iter()
            .map(Tree::from_value)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { node, children })
    }

    /// Pre-order walk; stops at the first `Some`.
    pub fn walk<R>(&self, f: &mut dyn FnMut(&Node) -> Option<R>) -> Option<R> {
        if let Some(found) = f(&self.node) {
            return Some(found);
        }
        self.children.iter().find_map(|child| child.walk(f))
    }

    /// Pre-order list of all paths.
    pub fn paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.walk(&mut |node: &Node| -> Option<()> {
            paths.push(node.path().to_string());
            None
        });
        paths
    }

    /// Number of nodes in the snapshot, root included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Tree::node_count).sum::<usize>()
    }

    fn render(&self, lines: &mut Vec<String>, prefix: &str, last: bool, depth: usize) {
        let marker = match (depth, last) {
            (0, _) => "──",
            (_, true) => "└─",
            _ => "├─",
        };
        let label = match &self.node {
            Node::Dataset(d) => format!("{} {} {}", d.name(), format_shape(d.shape()), d.dtype()),
            other => other.name().to_string(),
        };
        lines.push(format!("{}{} {}", prefix, marker, label));

        let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
        let count = self.children.len();
        for (i, child) in self.children.iter().enumerate() {
            child.render(lines, &child_prefix, i + 1 == count, depth + 1);
        }
    }
}

/// Box-drawing outline, one node per line.
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        self.render(&mut lines, "", true, 0);
        f.write_str(&lines.join("\n"))
    }
}
