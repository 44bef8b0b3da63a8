//! Tree combination policies.
//!
//! A [`NodeCombiner`] merges a left (higher priority) and a right (lower
//! priority) tree into a new, independent tree:
//! - Union: nodes from both sides, recursively merged where a name occurs
//!   exactly once on each side; left wins value clashes
//! - Override: left shadows right, either per leaf or per subtree
//! - Custom: caller-supplied function
//!
//! Names registered as list nodes are never merged: both sides' nodes are
//! concatenated.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::node::Node;

/// Signature of a custom combination function.
pub type CombineFn = dyn Fn(&Node, &Node, &BTreeSet<String>) -> Node + Send + Sync;

/// How far an override reaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideGranularity {
    /// Same-named nodes unique on both sides are merged recursively, so only
    /// clashing leaves are overridden. Repeated names in left hide right's
    /// nodes of that name entirely.
    #[default]
    Leaf,
    /// Any top-level name left defines hides right's whole subtree of that
    /// name.
    Subtree,
}

/// The merge policy.
#[derive(Clone)]
pub enum CombinerKind {
    Union,
    Override(OverrideGranularity),
    Custom(Arc<CombineFn>),
}

impl fmt::Debug for CombinerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombinerKind::Union => f.write_str("Union"),
            CombinerKind::Override(g) => f.debug_tuple("Override").field(g).finish(),
            CombinerKind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Merges two node trees according to a [`CombinerKind`].
#[derive(Debug, Clone)]
pub struct NodeCombiner {
    kind: CombinerKind,
    list_nodes: BTreeSet<String>,
}

impl Default for NodeCombiner {
    fn default() -> Self {
        Self::union()
    }
}

impl NodeCombiner {
    pub fn new(kind: CombinerKind) -> Self {
        Self {
            kind,
            list_nodes: BTreeSet::new(),
        }
    }

    pub fn union() -> Self {
        Self::new(CombinerKind::Union)
    }

    /// Override combiner with leaf granularity.
    pub fn override_first() -> Self {
        Self::new(CombinerKind::Override(OverrideGranularity::Leaf))
    }

    pub fn override_with(granularity: OverrideGranularity) -> Self {
        Self::new(CombinerKind::Override(granularity))
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Node, &Node, &BTreeSet<String>) -> Node + Send + Sync + 'static,
    {
        Self::new(CombinerKind::Custom(Arc::new(f)))
    }

    pub fn kind(&self) -> &CombinerKind {
        &self.kind
    }

    /// Register a node name whose occurrences are concatenated, not merged.
    pub fn add_list_node(&mut self, name: impl Into<String>) {
        self.list_nodes.insert(name.into());
    }

    pub fn with_list_node(mut self, name: impl Into<String>) -> Self {
        self.add_list_node(name);
        self
    }

    pub fn list_nodes(&self) -> &BTreeSet<String> {
        &self.list_nodes
    }

    pub fn is_list_node(&self, node: &Node) -> bool {
        self.list_nodes.contains(node.name())
    }

    /// Combine two trees. Neither input is modified; the result shares no
    /// structure with them.
    pub fn combine(&self, left: &Node, right: &Node) -> Node {
        match &self.kind {
            CombinerKind::Union => self.union_nodes(left, right),
            CombinerKind::Override(OverrideGranularity::Leaf) => self.override_leaves(left, right),
            CombinerKind::Override(OverrideGranularity::Subtree) => self.override_subtrees(left, right),
            CombinerKind::Custom(f) => (f.as_ref())(left, right, &self.list_nodes),
        }
    }

    /// Combine trees whose content sits below `path`.
    ///
    /// `right` holds its content below a chain of nodes named by `path`.
    /// The chain is merged by name, so the policy applies from the end of
    /// the path down: content placed at sibling paths never shadows itself.
    /// Where left has no single mergeable node for a path name the trees are
    /// combined as they are.
    pub fn combine_below(&self, left: &Node, right: &Node, path: &[String]) -> Node {
        let Some((name, rest)) = path.split_first() else {
            return self.combine(left, right);
        };
        let (Some(l), Some(r)) = (self.single_child(left, name), self.single_child(right, name)) else {
            return self.combine(left, right);
        };

        let mut result = combined_shell(left, right);
        for (i, child) in left.children().iter().enumerate() {
            if i == l {
                result.add_child(self.combine_below(child, &right.children()[r], rest));
            } else {
                result.add_child(child.clone());
            }
        }
        for child in right.children() {
            if child.name() != name.as_str() && left.child_count(child.name()) == 0 {
                result.add_child(child.clone());
            }
        }
        result
    }

    fn single_child(&self, parent: &Node, name: &str) -> Option<usize> {
        if self.list_nodes.contains(name) {
            return None;
        }
        match parent.child_positions(name).as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    fn union_nodes(&self, left: &Node, right: &Node) -> Node {
        let mut result = combined_shell(left, right);
        let mut used = vec![false; right.children().len()];

        for child in left.children() {
            match self.counterpart(left, right, child) {
                Some(i) => {
                    used[i] = true;
                    result.add_child(self.union_nodes(child, &right.children()[i]));
                }
                None => {
                    result.add_child(child.clone());
                }
            }
        }

        for (child, used) in right.children().iter().zip(used) {
            if !used {
                result.add_child(child.clone());
            }
        }
        result
    }

    fn override_leaves(&self, left: &Node, right: &Node) -> Node {
        let mut result = combined_shell(left, right);

        for child in left.children() {
            match self.counterpart(left, right, child) {
                Some(i) => {
                    result.add_child(self.override_leaves(child, &right.children()[i]));
                }
                None => {
                    result.add_child(child.clone());
                }
            }
        }

        for child in right.children() {
            if self.is_list_node(child) || left.child_count(child.name()) == 0 {
                result.add_child(child.clone());
            }
        }
        result
    }

    fn override_subtrees(&self, left: &Node, right: &Node) -> Node {
        let mut result = combined_shell(left, right);
        result.append_children(left);

        for child in right.children() {
            if self.is_list_node(child) || left.child_count(child.name()) == 0 {
                result.add_child(child.clone());
            }
        }
        result
    }

    /// Position of the right-side node `child` can be merged with.
    ///
    /// Only names that occur exactly once on both sides and are not list
    /// nodes have a counterpart.
    fn counterpart(&self, left: &Node, right: &Node, child: &Node) -> Option<usize> {
        if self.is_list_node(child) || left.child_count(child.name()) != 1 {
            return None;
        }
        match right.child_positions(child.name()).as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

/// New node with left's name, left's value falling back to right's, and
/// left's attributes plus those of right whose names left lacks.
fn combined_shell(left: &Node, right: &Node) -> Node {
    let mut result = Node::new(left.name());
    result.set_value(left.value().or(right.value()).cloned());
    result.append_attributes(left);
    for attr in right.attributes() {
        if !left.has_attribute(&attr.name) {
            result.add_attribute(attr.name.clone(), attr.value.clone());
        }
    }
    result
}
