//! Key expressions.
//!
//! An [`ExpressionEngine`] translates configuration keys such as
//! `db.servers(1).host` or `db[@driver]` into locations in a node tree, and
//! renders tree locations back into keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TreeError;
use crate::node::Node;

/// One parsed component of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySegment {
    /// A child node name, optionally narrowed to one of several same-named
    /// siblings.
    Child { name: String, index: Option<usize> },
    /// An attribute of the node selected so far. Only valid as the last
    /// segment.
    Attribute { name: String },
}

impl KeySegment {
    pub fn child(name: impl Into<String>) -> Self {
        KeySegment::Child {
            name: name.into(),
            index: None,
        }
    }
}

/// Location of a query result inside a tree.
///
/// Paths are child positions starting at the root; the empty path is the
/// root itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeHandle {
    Node(Vec<usize>),
    Attribute { node: Vec<usize>, index: usize },
}

impl NodeHandle {
    /// Path of the node this handle points at or into.
    pub fn node_path(&self) -> &[usize] {
        match self {
            NodeHandle::Node(path) => path,
            NodeHandle::Attribute { node, .. } => node,
        }
    }

    /// Read the value behind the handle.
    pub fn value<'a>(&self, root: &'a Node) -> Option<&'a Value> {
        match self {
            NodeHandle::Node(path) => root.child_at_path(path)?.value(),
            NodeHandle::Attribute { node, index } => {
                root.child_at_path(node)?.attributes().get(*index).map(|a| &a.value)
            }
        }
    }
}

/// Where and how a new value is attached for an add operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPlan {
    /// Existing node the new structure hangs from.
    pub parent: Vec<usize>,
    /// Names of the nodes to create below `parent`, outermost first.
    pub new_nodes: Vec<String>,
    /// Set when the key ends in an attribute.
    pub attribute: Option<String>,
}

impl AddPlan {
    /// Create the planned structure in `root` and store `value` at its end.
    ///
    /// Returns the location that received the value.
    pub fn apply(&self, root: &mut Node, value: Value) -> Result<NodeHandle, TreeError> {
        let mut path = self.parent.clone();
        let mut target = root
            .child_at_path_mut(&self.parent)
            .ok_or_else(|| TreeError::MissingPath(self.parent.clone()))?;

        for name in &self.new_nodes {
            path.push(target.children().len());
            target = target.add_child(Node::new(name.clone()));
        }

        match &self.attribute {
            Some(attr) => {
                target.add_attribute(attr.clone(), value);
                let index = target.attributes().len() - 1;
                Ok(NodeHandle::Attribute { node: path, index })
            }
            None => {
                target.set_value(Some(value));
                Ok(NodeHandle::Node(path))
            }
        }
    }
}

/// Two-way mapping between key strings and tree locations.
///
/// Implementors only define the key syntax; querying and add planning are
/// provided on top of [`ExpressionEngine::parse_key`].
pub trait ExpressionEngine: Send + Sync + fmt::Debug {
    /// Split a key into segments. Never fails: unknown names simply match
    /// nothing later on.
    fn parse_key(&self, key: &str) -> Vec<KeySegment>;

    /// Key of a child called `name` below the node whose key is `parent_key`.
    fn node_key(&self, parent_key: &str, name: &str) -> String;

    /// Key of the attribute `name` of the node whose key is `parent_key`.
    fn attribute_key(&self, parent_key: &str, name: &str) -> String;

    /// Locate all nodes and attributes selected by `key`.
    ///
    /// The empty key selects the root. A key that runs off the tree yields
    /// no handles.
    fn query(&self, root: &Node, key: &str) -> Vec<NodeHandle> {
        let segments = self.parse_key(key);
        let mut current: Vec<Vec<usize>> = vec![Vec::new()];

        for (pos, segment) in segments.iter().enumerate() {
            match segment {
                KeySegment::Child { name, index } => {
                    let mut next = Vec::new();
                    for path in &current {
                        let Some(node) = root.child_at_path(path) else {
                            continue;
                        };
                        let positions = node.child_positions(name);
                        let selected: Vec<usize> = match index {
                            Some(i) => positions.get(*i).copied().into_iter().collect(),
                            None => positions,
                        };
                        for i in selected {
                            let mut child = path.clone();
                            child.push(i);
                            next.push(child);
                        }
                    }
                    current = next;
                }
                KeySegment::Attribute { name } => {
                    if pos + 1 != segments.len() {
                        return Vec::new();
                    }
                    return current
                        .into_iter()
                        .flat_map(|path| {
                            let indices: Vec<usize> = root
                                .child_at_path(&path)
                                .map(|node| {
                                    node.attributes()
                                        .iter()
                                        .enumerate()
                                        .filter(|(_, a)| &a.name == name)
                                        .map(|(i, _)| i)
                                        .collect()
                                })
                                .unwrap_or_default();
                            indices.into_iter().map(move |index| NodeHandle::Attribute {
                                node: path.clone(),
                                index,
                            })
                        })
                        .collect();
                }
            }
            if current.is_empty() {
                break;
            }
        }

        current.into_iter().map(NodeHandle::Node).collect()
    }

    /// Work out where a new value for `key` is attached.
    ///
    /// Existing nodes are followed as long as they exist: an explicit index
    /// picks that sibling, otherwise the last same-named sibling is used.
    /// The final segment always creates a new node or attribute.
    fn prepare_add(&self, root: &Node, key: &str) -> Result<AddPlan, TreeError> {
        let segments = self.parse_key(key);
        let Some((last, init)) = segments.split_last() else {
            return Err(TreeError::invalid_key(key, "cannot add a value at the root"));
        };

        let mut parent = Vec::new();
        let mut node = root;
        let mut new_nodes = Vec::new();
        let mut following = true;

        for segment in init {
            let KeySegment::Child { name, index } = segment else {
                return Err(TreeError::invalid_key(key, "attribute in the middle of the key"));
            };
            if following {
                let positions = node.child_positions(name);
                let pick = match index {
                    Some(i) => positions.get(*i).copied(),
                    None => positions.last().copied(),
                };
                if let Some(i) = pick {
                    parent.push(i);
                    node = &node.children()[i];
                    continue;
                }
                following = false;
            }
            new_nodes.push(name.clone());
        }

        let attribute = match last {
            KeySegment::Child { name, .. } => {
                new_nodes.push(name.clone());
                None
            }
            KeySegment::Attribute { name } => Some(name.clone()),
        };

        Ok(AddPlan {
            parent,
            new_nodes,
            attribute,
        })
    }
}

/// Markers recognised by [`DefaultExpressionEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Symbols {
    pub property_delimiter: String,
    /// Written inside a name to stand for a literal delimiter.
    pub escaped_delimiter: String,
    pub index_start: String,
    pub index_end: String,
    pub attribute_start: String,
    pub attribute_end: String,
}

impl Default for Symbols {
    fn default() -> Self {
        Self {
            property_delimiter: ".".to_string(),
            escaped_delimiter: "..".to_string(),
            index_start: "(".to_string(),
            index_end: ")".to_string(),
            attribute_start: "[@".to_string(),
            attribute_end: "]".to_string(),
        }
    }
}

/// Dot-path key syntax: `a.b(2).c[@attr]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultExpressionEngine {
    symbols: Symbols,
}

impl DefaultExpressionEngine {
    pub fn new(symbols: Symbols) -> Self {
        Self { symbols }
    }

    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    /// Read one child name starting at the beginning of `rest`.
    ///
    /// Returns the unescaped name and the number of bytes consumed.
    fn read_name(&self, rest: &str) -> (String, usize) {
        let s = &self.symbols;
        let mut name = String::new();
        let mut pos = 0;

        while pos < rest.len() {
            let tail = &rest[pos..];
            if marks(tail, &s.escaped_delimiter) {
                name.push_str(&s.property_delimiter);
                pos += s.escaped_delimiter.len();
            } else if marks(tail, &s.property_delimiter) || marks(tail, &s.attribute_start) {
                break;
            } else if let Some(c) = tail.chars().next() {
                name.push(c);
                pos += c.len_utf8();
            }
        }
        (name, pos)
    }

    /// Split a trailing `(n)` index off a name.
    fn split_index(&self, name: String) -> (String, Option<usize>) {
        let s = &self.symbols;
        if s.index_start.is_empty() || !marks_end(&name, &s.index_end) {
            return (name, None);
        }
        let body = &name[..name.len() - s.index_end.len()];
        match body.rfind(&s.index_start) {
            Some(start) => {
                let digits = &body[start + s.index_start.len()..];
                match digits.parse::<usize>() {
                    Ok(index) => (body[..start].to_string(), Some(index)),
                    Err(_) => (name, None),
                }
            }
            None => (name, None),
        }
    }
}

impl ExpressionEngine for DefaultExpressionEngine {
    fn parse_key(&self, key: &str) -> Vec<KeySegment> {
        let s = &self.symbols;
        let mut segments = Vec::new();
        let mut rest = key;

        while !rest.is_empty() {
            if let Some(after) = strip_marker(rest, &s.attribute_start) {
                if let Some(end) = after.find(&s.attribute_end) {
                    segments.push(KeySegment::Attribute {
                        name: after[..end].to_string(),
                    });
                    rest = &after[end + s.attribute_end.len()..];
                    rest = strip_marker(rest, &s.property_delimiter).unwrap_or(rest);
                    continue;
                }
                // Unterminated marker: the rest is a plain name.
                segments.push(KeySegment::child(rest));
                break;
            }

            let (name, consumed) = self.read_name(rest);
            rest = &rest[consumed..];
            if !name.is_empty() {
                let (name, index) = self.split_index(name);
                segments.push(KeySegment::Child { name, index });
            }
            if let Some(after) = strip_marker(rest, &s.property_delimiter) {
                rest = after;
            }
        }

        segments
    }

    fn node_key(&self, parent_key: &str, name: &str) -> String {
        let s = &self.symbols;
        let escaped = name.replace(&s.property_delimiter, &s.escaped_delimiter);
        if parent_key.is_empty() {
            escaped
        } else {
            format!("{}{}{}", parent_key, s.property_delimiter, escaped)
        }
    }

    fn attribute_key(&self, parent_key: &str, name: &str) -> String {
        let s = &self.symbols;
        format!("{}{}{}{}", parent_key, s.attribute_start, name, s.attribute_end)
    }
}

/// Empty markers never match, so a misconfigured symbol set cannot stall
/// the parser.
fn marks(tail: &str, marker: &str) -> bool {
    !marker.is_empty() && tail.starts_with(marker)
}

fn marks_end(text: &str, marker: &str) -> bool {
    !marker.is_empty() && text.ends_with(marker)
}

fn strip_marker<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    if marker.is_empty() {
        None
    } else {
        text.strip_prefix(marker)
    }
}
