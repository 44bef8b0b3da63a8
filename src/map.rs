//! Flat in-memory configuration.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use cfgtree_node::{DefaultExpressionEngine, Node};
use serde_json::Value;

use crate::configuration::Configuration;
use crate::error::Result;
use crate::event::{EventKind, EventSource};
use crate::tree::ops;

/// Ordered key/value pairs with no structure of their own.
///
/// The tree view is built on demand by adding every key through the default
/// expression engine, so `db.host` becomes a `host` node below `db`.
#[derive(Debug, Default)]
pub struct MapConfiguration {
    entries: RwLock<Vec<(String, Value)>>,
    events: EventSource,
}

impl MapConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let config = Self::new();
        {
            let mut entries = config.write();
            for (key, value) in pairs {
                insert_or_append(&mut entries, key.into(), value);
            }
        }
        config
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<(String, Value)>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<(String, Value)>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn insert_or_append(entries: &mut Vec<(String, Value)>, key: String, value: Value) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some((_, existing)) => {
            let mut items = match existing.take() {
                Value::Array(items) => items,
                single => vec![single],
            };
            match value {
                Value::Array(more) => items.extend(more),
                single => items.push(single),
            }
            *existing = Value::Array(items);
        }
        None => entries.push((key, value)),
    }
}

impl Configuration for MapConfiguration {
    fn get_property(&self, key: &str) -> Result<Option<Value>> {
        Ok(self
            .read()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()))
    }

    fn set_property(&self, key: &str, value: Value) -> Result<()> {
        self.events.around(EventKind::SetProperty, Some(key), Some(&value), || {
            let mut entries = self.write();
            match entries.iter_mut().find(|(k, _)| k == key) {
                Some((_, existing)) => *existing = value.clone(),
                None => entries.push((key.to_string(), value.clone())),
            }
            Ok(())
        })
    }

    fn add_property(&self, key: &str, value: Value) -> Result<()> {
        self.events.around(EventKind::AddProperty, Some(key), Some(&value), || {
            insert_or_append(&mut self.write(), key.to_string(), value.clone());
            Ok(())
        })
    }

    fn clear_property(&self, key: &str) -> Result<()> {
        self.events.around(EventKind::ClearProperty, Some(key), None, || {
            self.write().retain(|(k, _)| k != key);
            Ok(())
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.read().iter().map(|(k, _)| k.clone()).collect())
    }

    fn root_node(&self) -> Result<Node> {
        let pairs = self.read().clone();
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

    #[test]
    fn test_add_appends_values() {
        let config = MapConfiguration::new();
        config.add_property("tags", json!("a")).unwrap();
        config.add_property("tags", json!(["b", "c"])).unwrap();
        assert_eq!(config.get_property("tags").unwrap(), Some(json!(["a", "b", "c"])));
    }

    #[test]
    fn test_set_replaces_and_keeps_order() {
        let config = MapConfiguration::from_pairs([("a", json!(1)), ("b", json!(2))]);
        config.set_property("a", json!(3)).unwrap();
        assert_eq!(config.keys().unwrap(), vec!["a", "b"]);
        assert_eq!(config.get_i64("a").unwrap(), Some(3));
    }

    #[test]
    fn test_clear_property() {
        let config = MapConfiguration::from_pairs([("a", json!(1))]);
        config.clear_property("a").unwrap();
        assert!(config.is_empty().unwrap());
    }

    #[test]
    fn test_root_node_builds_hierarchy() {
        let config = MapConfiguration::from_pairs([
            ("db.host", json!("h1")),
            ("db.port", json!(5432)),
        ]);
        let root = config.root_node().unwrap();
        assert_eq!(root.child_count("db"), 1);
        assert_eq!(root.children()[0].children().len(), 2);
    }
}
