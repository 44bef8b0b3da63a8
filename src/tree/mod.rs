//! Node-backed hierarchical configuration.

pub(crate) mod ops;

use std::fs;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use cfgtree_node::{DefaultExpressionEngine, ExpressionEngine, Node};
use serde_json::Value;
use tracing::debug;

use crate::configuration::Configuration;
use crate::error::{Error, Result};
use crate::event::{EventKind, EventSource};
use crate::loader::{self, SourceInfo};

/// A configuration whose content is a [`Node`] tree addressed through an
/// [`ExpressionEngine`].
#[derive(Debug)]
pub struct TreeConfiguration {
    root: RwLock<Node>,
    engine: Arc<dyn ExpressionEngine>,
    events: EventSource,
    source: RwLock<Option<SourceInfo>>,
}

impl Default for TreeConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeConfiguration {
    pub fn new() -> Self {
        Self::with_root(Node::root())
    }

    pub fn with_root(root: Node) -> Self {
        Self {
            root: RwLock::new(root),
            engine: Arc::new(DefaultExpressionEngine::default()),
            events: EventSource::new(),
            source: RwLock::new(None),
        }
    }

    /// Copy the content of any configuration into a tree.
    pub fn from_configuration(config: &dyn Configuration) -> Result<Self> {
        Ok(Self::with_root(config.root_node()?))
    }

    pub fn with_expression_engine(mut self, engine: Arc<dyn ExpressionEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub(crate) fn with_source(self, source: SourceInfo) -> Self {
        *self.source.write().unwrap_or_else(PoisonError::into_inner) = Some(source);
        self
    }

    pub fn expression_engine(&self) -> &Arc<dyn ExpressionEngine> {
        &self.engine
    }

    /// Where the content was loaded from, if it came from a file or string.
    pub fn source(&self) -> Option<SourceInfo> {
        self.source.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Remove the nodes selected by `key` with all their descendants.
    pub fn clear_tree(&self, key: &str) -> Result<()> {
        self.events.around(EventKind::ClearTree, Some(key), None, || {
            ops::clear_tree(&*self.engine, &mut self.write(), key);
            Ok(())
        })
    }

    /// Remove all content.
    pub fn clear(&self) -> Result<()> {
        self.events.around(EventKind::Clear, None, None, || {
            let mut root = self.write();
            *root = Node::new(root.name());
            Ok(())
        })
    }

    /// Detached copy of the subtree selected by `key` as its own
    /// configuration. The key must select exactly one node.
    pub fn configuration_at(&self, key: &str) -> Result<TreeConfiguration> {
        let node = ops::select(&*self.engine, &self.read(), key)?;
        Ok(TreeConfiguration::with_root(node).with_expression_engine(Arc::clone(&self.engine)))
    }

    /// Re-read the file this configuration was loaded from.
    ///
    /// Returns `Ok(false)` when there is no backing file or its content is
    /// unchanged.
    pub fn reload(&self) -> Result<bool> {
        let Some(current) = self.source() else {
            return Ok(false);
        };
        let Some(path) = current.path.as_deref() else {
            return Ok(false);
        };

        let bytes = fs::read(path).map_err(|e| Error::Io(path.into(), e))?;
        if loader::digest(&bytes) == current.digest {
            return Ok(false);
        }

        let (node, info) = loader::parse_bytes(current.format, &bytes, Some(path))?;
        self.events.around(EventKind::Reload, None, None, || {
            *self.write() = node;
            *self.source.write().unwrap_or_else(PoisonError::into_inner) = Some(info);
            Ok(())
        })?;
        debug!(path, "reloaded configuration");
        Ok(true)
    }

    fn read(&self) -> RwLockReadGuard<'_, Node> {
        self.root.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Node> {
        self.root.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Configuration for TreeConfiguration {
    fn get_property(&self, key: &str) -> Result<Option<Value>> {
        Ok(ops::get(&*self.engine, &self.read(), key))
    }

    fn set_property(&self, key: &str, value: Value) -> Result<()> {
        self.events.around(EventKind::SetProperty, Some(key), Some(&value), || {
            ops::set(&*self.engine, &mut self.write(), key, value.clone())
        })
    }

    fn add_property(&self, key: &str, value: Value) -> Result<()> {
        self.events.around(EventKind::AddProperty, Some(key), Some(&value), || {
            ops::add(&*self.engine, &mut self.write(), key, value.clone())
        })
    }

    fn clear_property(&self, key: &str) -> Result<()> {
        self.events.around(EventKind::ClearProperty, Some(key), None, || {
            ops::clear_property(&*self.engine, &mut self.write(), key);
            Ok(())
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(ops::keys(&*self.engine, &self.read()))
    }

    fn root_node(&self) -> Result<Node> {
        Ok(self.read().clone())
    }

    fn event_source(&self) -> &EventSource {
        &self.events
    }
}
