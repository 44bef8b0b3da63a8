//! Child entries of a combined configuration.

use cfgtree_node::{DefaultExpressionEngine, ExpressionEngine, KeySegment, Node, TreeError};

use crate::configuration::SharedConfiguration;
use crate::error::Result;
use crate::event::ListenerId;

/// One child configuration with its optional name and graft path.
pub(crate) struct ConfigData {
    pub(crate) config: SharedConfiguration,
    pub(crate) name: Option<String>,
    pub(crate) at: Option<String>,
    at_path: Vec<String>,
    pub(crate) listener: ListenerId,
}

impl ConfigData {
    pub(crate) fn new(
        config: SharedConfiguration,
        name: Option<String>,
        at: Option<String>,
        listener: ListenerId,
    ) -> Result<Self> {
        let at_path = match at.as_deref() {
            Some(at) => parse_at_path(at)?,
            None => Vec::new(),
        };
        Ok(Self {
            config,
            name,
            at,
            at_path,
            listener,
        })
    }

    /// Node names of the `at` path, outermost first.
    pub(crate) fn at_path(&self) -> &[String] {
        &self.at_path
    }

    /// The child's tree, grafted below its `at` path.
    pub(crate) fn transformed_root(&self) -> Result<Node> {
        let content = self.config.root_node()?;
        Ok(graft(&content, &self.at_path))
    }
}

/// Split an `at` path into node names.
///
/// Uses the key grammar, but only plain names are meaningful when building
/// structure: indices are ignored and attributes are rejected.
pub(crate) fn parse_at_path(at: &str) -> Result<Vec<String>> {
    DefaultExpressionEngine::default()
        .parse_key(at)
        .into_iter()
        .map(|segment| match segment {
            KeySegment::Child { name, .. } => Ok(name),
            KeySegment::Attribute { .. } => Err(TreeError::InvalidKey {
                key: at.to_string(),
                reason: "an at path cannot address an attribute".to_string(),
            }
            .into()),
        })
        .collect()
}

/// Wrap `content` in a chain of synthetic nodes named by `path`.
///
/// The content root's children and attributes move under the innermost
/// node; its name and value are dropped.
pub(crate) fn graft(content: &Node, path: &[String]) -> Node {
    let mut result = Node::root();
    let mut cursor = &mut result;
    for name in path {
        cursor = cursor.add_child(Node::new(name.clone()));
    }
    cursor.append_children(content);
    cursor.append_attributes(content);
    result
}
