//! Prefix view over another configuration.

use cfgtree_node::{DefaultExpressionEngine, Node};
use serde_json::Value;

use crate::configuration::{Configuration, SharedConfiguration};
use crate::error::Result;
use crate::event::EventSource;
use crate::tree::ops;

/// Exposes the keys of a parent that start with `prefix.`, with the prefix
/// removed. Reads and writes go straight to the parent, and so do listener
/// registrations.
pub struct SubsetConfiguration {
    parent: SharedConfiguration,
    prefix: String,
    delimiter: String,
}

impl SubsetConfiguration {
    pub fn new(parent: SharedConfiguration, prefix: impl Into<String>) -> Self {
        Self {
            parent,
            prefix: prefix.into(),
            delimiter: ".".to_string(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn parent(&self) -> &SharedConfiguration {
        &self.parent
    }

    fn parent_key(&self, key: &str) -> String {
        match (self.prefix.is_empty(), key.is_empty()) {
            (true, _) => key.to_string(),
            (false, true) => self.prefix.clone(),
            (false, false) => format!("{}{}{}", self.prefix, self.delimiter, key),
        }
    }

    fn child_key(&self, parent_key: &str) -> Option<String> {
        if self.prefix.is_empty() {
            return Some(parent_key.to_string());
        }
        parent_key
            .strip_prefix(&self.prefix)?
            .strip_prefix(&self.delimiter)
            .map(str::to_string)
    }
}

impl Configuration for SubsetConfiguration {
    fn get_property(&self, key: &str) -> Result<Option<Value>> {
        self.parent.get_property(&self.parent_key(key))
    }

    fn set_property(&self, key: &str, value: Value) -> Result<()> {
        self.parent.set_property(&self.parent_key(key), value)
    }

    fn add_property(&self, key: &str, value: Value) -> Result<()> {
        self.parent.add_property(&self.parent_key(key), value)
    }

    fn clear_property(&self, key: &str) -> Result<()> {
        self.parent.clear_property(&self.parent_key(key))
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .parent
            .keys()?
            .iter()
            .filter_map(|k| self.child_key(k))
            .collect())
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
        self.parent.event_source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapConfiguration;
    use serde_json::json;
    use std::sync::Arc;

    fn parent() -> SharedConfiguration {
        Arc::new(MapConfiguration::from_pairs([
            ("db.host", json!("h1")),
            ("db.port", json!(5432)),
            ("dbx", json!(true)),
            ("name", json!("app")),
        ]))
    }

    #[test]
    fn test_keys_strip_prefix() {
        let subset = SubsetConfiguration::new(parent(), "db");
        assert_eq!(subset.keys().unwrap(), vec!["host", "port"]);
        assert_eq!(subset.get_i64("port").unwrap(), Some(5432));
    }

    #[test]
    fn test_writes_reach_parent() {
        let parent = parent();
        let subset = SubsetConfiguration::new(Arc::clone(&parent), "db");
        subset.set_property("user", json!("admin")).unwrap();
        assert_eq!(
            parent.get_string("db.user").unwrap().as_deref(),
            Some("admin")
        );
    }

    #[test]
    fn test_root_node_holds_subset_only() {
        let subset = SubsetConfiguration::new(parent(), "db");
        let root = subset.root_node().unwrap();
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.child_count("host"), 1);
    }

    #[test]
    fn test_empty_prefix_is_identity() {
        let subset = SubsetConfiguration::new(parent(), "");
        assert_eq!(subset.keys().unwrap().len(), 4);
    }
}
