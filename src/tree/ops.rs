//! Key-based operations on node trees.
//!
//! Shared by every configuration that keeps its content as a [`Node`] tree,
//! including the cached tree of a combined configuration.

use std::collections::HashSet;

use cfgtree_node::{ExpressionEngine, Node, NodeHandle, TreeError};
use serde_json::Value;

use crate::configuration::collapse;
use crate::convert;
use crate::error::Result;

pub(crate) fn get(engine: &dyn ExpressionEngine, root: &Node, key: &str) -> Option<Value> {
    let values = engine
        .query(root, key)
        .iter()
        .filter_map(|h| h.value(root).cloned())
        .collect();
    collapse(values)
}

pub(crate) fn add(engine: &dyn ExpressionEngine, root: &mut Node, key: &str, value: Value) -> Result<()> {
    for scalar in convert::scalars(key, value)? {
        let plan = engine.prepare_add(root, key)?;
        plan.apply(root, scalar)?;
    }
    Ok(())
}

/// Overwrite the selected locations in order; extra values are added,
/// locations left over are cleared.
pub(crate) fn set(engine: &dyn ExpressionEngine, root: &mut Node, key: &str, value: Value) -> Result<()> {
    let mut values = convert::scalars(key, value)?.into_iter();
    let mut surplus = Vec::new();

    for handle in engine.query(root, key) {
        match values.next() {
            Some(v) => write(root, &handle, v)?,
            None => surplus.push(handle),
        }
    }
    for v in values {
        engine.prepare_add(root, key)?.apply(root, v)?;
    }
    clear_values(root, surplus);
    Ok(())
}

pub(crate) fn clear_property(engine: &dyn ExpressionEngine, root: &mut Node, key: &str) {
    let handles = engine.query(root, key);
    clear_values(root, handles);
}

/// Remove the selected nodes with everything below them.
pub(crate) fn clear_tree(engine: &dyn ExpressionEngine, root: &mut Node, key: &str) {
    let mut handles = engine.query(root, key);
    sort_for_removal(&mut handles);

    for handle in handles {
        match handle {
            NodeHandle::Node(path) => match path.split_last() {
                Some((&last, parent)) => {
                    if let Some(p) = root.child_at_path_mut(parent) {
                        p.remove_child(last);
                    }
                    prune(root, parent);
                }
                None => *root = Node::new(root.name()),
            },
            NodeHandle::Attribute { node, index } => {
                if let Some(n) = root.child_at_path_mut(&node) {
                    n.remove_attribute(index);
                }
                prune(root, &node);
            }
        }
    }
}

/// Keys of all values and attributes in pre-order.
pub(crate) fn keys(engine: &dyn ExpressionEngine, root: &Node) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    collect_keys(engine, root, "", &mut out, &mut seen);
    out
}

fn collect_keys(
    engine: &dyn ExpressionEngine,
    node: &Node,
    key: &str,
    out: &mut Vec<String>,
    seen: &mut HashSet<String>,
) {
    let mut push = |k: String, out: &mut Vec<String>| {
        if seen.insert(k.clone()) {
            out.push(k);
        }
    };

    if !key.is_empty() && node.value().is_some() {
        push(key.to_string(), out);
    }
    for attr in node.attributes() {
        push(engine.attribute_key(key, &attr.name), out);
    }
    for child in node.children() {
        collect_keys(engine, child, &engine.node_key(key, child.name()), out, seen);
    }
}

/// The single node selected by `key`.
pub(crate) fn select(engine: &dyn ExpressionEngine, root: &Node, key: &str) -> Result<Node> {
    let handles = engine.query(root, key);
    match handles.as_slice() {
        [NodeHandle::Node(path)] => root
            .child_at_path(path)
            .cloned()
            .ok_or_else(|| TreeError::MissingPath(path.clone()).into()),
        other => Err(TreeError::InvalidKey {
            key: key.to_string(),
            reason: format!("selects {} locations, expected exactly one node", other.len()),
        }
        .into()),
    }
}

/// Build a tree by adding each key/value pair in order.
pub(crate) fn build_tree<I>(engine: &dyn ExpressionEngine, pairs: I) -> Result<Node>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut root = Node::root();
    for (key, value) in pairs {
        add(engine, &mut root, &key, value)?;
    }
    Ok(root)
}

fn write(root: &mut Node, handle: &NodeHandle, value: Value) -> Result<()> {
    match handle {
        NodeHandle::Node(path) => {
            root.child_at_path_mut(path)
                .ok_or_else(|| TreeError::MissingPath(path.clone()))?
                .set_value(Some(value));
        }
        NodeHandle::Attribute { node, index } => {
            let attr = root
                .child_at_path_mut(node)
                .and_then(|n| n.attribute_mut(*index))
                .ok_or_else(|| TreeError::MissingPath(node.clone()))?;
            attr.value = value;
        }
    }
    Ok(())
}

/// Clear values, then drop nodes left without value, children or
/// attributes.
fn clear_values(root: &mut Node, mut handles: Vec<NodeHandle>) {
    sort_for_removal(&mut handles);

    for handle in handles {
        match handle {
            NodeHandle::Node(path) => {
                if let Some(node) = root.child_at_path_mut(&path) {
                    node.set_value(None);
                }
                prune(root, &path);
            }
            NodeHandle::Attribute { node, index } => {
                if let Some(n) = root.child_at_path_mut(&node) {
                    n.remove_attribute(index);
                }
                prune(root, &node);
            }
        }
    }
}

/// Deepest and rightmost first, so removals never shift a pending path.
fn sort_for_removal(handles: &mut [NodeHandle]) {
    fn order_key(handle: &NodeHandle) -> (&[usize], Option<usize>) {
        match handle {
            NodeHandle::Node(path) => (path, None),
            NodeHandle::Attribute { node, index } => (node, Some(*index)),
        }
    }
    handles.sort_by(|a, b| order_key(b).cmp(&order_key(a)));
}

fn prune(root: &mut Node, path: &[usize]) {
    let mut path = path.to_vec();
    while let Some(&last) = path.last() {
        let defined = root.child_at_path(&path).map_or(true, Node::is_defined);
        if defined {
            break;
        }
        path.pop();
        if let Some(parent) = root.child_at_path_mut(&path) {
            parent.remove_child(last);
        }
    }
}
