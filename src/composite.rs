//! First-match-wins chain of configurations.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use cfgtree_node::{DefaultExpressionEngine, Node};
use serde_json::Value;

use crate::configuration::{Configuration, SharedConfiguration};
use crate::error::Result;
use crate::event::{EventKind, EventSource};
use crate::map::MapConfiguration;
use crate::tree::ops;

/// Looks a key up in each child in turn and returns the first hit.
///
/// Values written through the composite land in an in-memory configuration
/// consulted after all children. Setting or clearing a key also clears it
/// in every child so the new value is the one read back.
pub struct CompositeConfiguration {
    children: RwLock<Vec<SharedConfiguration>>,
    in_memory: Arc<MapConfiguration>,
    events: EventSource,
}

impl Default for CompositeConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeConfiguration {
    pub fn new() -> Self {
        Self {
            children: RwLock::new(Vec::new()),
            in_memory: Arc::new(MapConfiguration::new()),
            events: EventSource::new(),
        }
    }

    pub fn add_configuration(&self, config: SharedConfiguration) {
        self.children
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(config);
    }

    /// Returns whether the configuration was a child.
    pub fn remove_configuration(&self, config: &SharedConfiguration) -> bool {
        let mut children = self.children.write().unwrap_or_else(PoisonError::into_inner);
        let before = children.len();
        children.retain(|c| !same_configuration(c, config));
        children.len() != before
    }

    pub fn number_of_configurations(&self) -> usize {
        self.children().len()
    }

    pub fn configuration(&self, index: usize) -> Option<SharedConfiguration> {
        self.children().get(index).cloned()
    }

    pub fn in_memory_configuration(&self) -> &Arc<MapConfiguration> {
        &self.in_memory
    }

    fn children(&self) -> RwLockReadGuard<'_, Vec<SharedConfiguration>> {
        self.children.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Children followed by the in-memory configuration.
    fn chain(&self) -> Vec<SharedConfiguration> {
        let mut chain = self.children().clone();
        chain.push(Arc::clone(&self.in_memory) as SharedConfiguration);
        chain
    }
}

/// Identity of a shared configuration, ignoring vtable pointers.
pub(crate) fn same_configuration(a: &SharedConfiguration, b: &SharedConfiguration) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl Configuration for CompositeConfiguration {
    fn get_property(&self, key: &str) -> Result<Option<Value>> {
        for config in self.chain() {
            if let Some(value) = config.get_property(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn set_property(&self, key: &str, value: Value) -> Result<()> {
        self.events.around(EventKind::SetProperty, Some(key), Some(&value), || {
            for config in self.chain() {
                config.clear_property(key)?;
            }
            self.in_memory.add_property(key, value.clone())
        })
    }

    fn add_property(&self, key: &str, value: Value) -> Result<()> {
        self.events.around(EventKind::AddProperty, Some(key), Some(&value), || {
            self.in_memory.add_property(key, value.clone())
        })
    }

    fn clear_property(&self, key: &str) -> Result<()> {
        self.events.around(EventKind::ClearProperty, Some(key), None, || {
            for config in self.chain() {
                config.clear_property(key)?;
            }
            Ok(())
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for config in self.chain() {
            for key in config.keys()? {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }

    fn root_node(&self) -> Result<Node> {
        let mut pairs = Vec::new();
        for key in self.keys()? {
            if let Some(value) = self.get_property(&key)? {
                pairs.push((key, value));
            }
        }
        ops::build_tree(&DefaultExpressionEngine::default(), pairs)
    }

    fn event_source(&self) -> &EventSource {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layered() -> (CompositeConfiguration, SharedConfiguration, SharedConfiguration) {
        let first: SharedConfiguration =
            Arc::new(MapConfiguration::from_pairs([("a", json!(1))]));
        let second: SharedConfiguration =
            Arc::new(MapConfiguration::from_pairs([("a", json!(2)), ("b", json!(3))]));
        let composite = CompositeConfiguration::new();
        composite.add_configuration(Arc::clone(&first));
        composite.add_configuration(Arc::clone(&second));
        (composite, first, second)
    }

    #[test]
    fn test_first_match_wins() {
        let (composite, _, _) = layered();
        assert_eq!(composite.get_i64("a").unwrap(), Some(1));
        assert_eq!(composite.get_i64("b").unwrap(), Some(3));
        assert_eq!(composite.keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_set_clears_children_and_stores_in_memory() {
        let (composite, first, _) = layered();
        composite.set_property("a", json!(9)).unwrap();

        assert_eq!(composite.get_i64("a").unwrap(), Some(9));
        assert!(!first.contains_key("a").unwrap());
        assert!(composite.in_memory_configuration().contains_key("a").unwrap());
    }

    #[test]
    fn test_add_goes_to_in_memory_last() {
        let (composite, _, _) = layered();
        composite.add_property("c", json!("x")).unwrap();
        composite.add_property("a", json!(5)).unwrap();

        assert_eq!(composite.get_i64("a").unwrap(), Some(1));
        assert_eq!(composite.get_string("c").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_remove_configuration() {
        let (composite, first, _) = layered();
        assert!(composite.remove_configuration(&first));
        assert!(!composite.remove_configuration(&first));
        assert_eq!(composite.number_of_configurations(), 1);
        assert_eq!(composite.get_i64("a").unwrap(), Some(2));
    }
}
