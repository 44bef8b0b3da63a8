//! The uniform property-access interface.

use std::sync::Arc;

use cfgtree_node::Node;
use serde_json::Value;

use crate::convert;
use crate::error::Result;
use crate::event::EventSource;

/// Shared handle to any configuration.
pub type SharedConfiguration = Arc<dyn Configuration>;

/// Key/value access over a configuration source.
///
/// All methods take `&self`: implementations use interior mutability so a
/// configuration can be shared between several decorators at once.
/// Multi-valued properties are returned as `Value::Array`.
pub trait Configuration: Send + Sync {
    fn get_property(&self, key: &str) -> Result<Option<Value>>;

    /// Replace all values of `key`.
    fn set_property(&self, key: &str, value: Value) -> Result<()>;

    /// Add a value to `key`, keeping the existing ones.
    fn add_property(&self, key: &str, value: Value) -> Result<()>;

    fn clear_property(&self, key: &str) -> Result<()>;

    /// All keys holding a value, in source order, without duplicates.
    fn keys(&self) -> Result<Vec<String>>;

    /// Hierarchical view of the content.
    fn root_node(&self) -> Result<Node>;

    fn event_source(&self) -> &EventSource;

    fn contains_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_property(key)?.is_some())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.keys()?.is_empty())
    }

    fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.get_property(key)?
            .map(|v| convert::to_string(key, &v))
            .transpose()
    }

    fn get_string_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.get_string(key)?.unwrap_or_else(|| default.to_string()))
    }

    fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        self.get_property(key)?
            .map(|v| convert::to_i64(key, &v))
            .transpose()
    }

    fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        self.get_property(key)?
            .map(|v| convert::to_f64(key, &v))
            .transpose()
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        self.get_property(key)?
            .map(|v| convert::to_bool(key, &v))
            .transpose()
    }

    /// All values of `key`; empty when undefined.
    fn get_list(&self, key: &str) -> Result<Vec<Value>> {
        Ok(match self.get_property(key)? {
            None => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(single) => vec![single],
        })
    }
}

/// Collapse the values found for a key into the shape `get_property`
/// returns.
pub(crate) fn collapse(mut values: Vec<Value>) -> Option<Value> {
    match values.len() {
        0 => None,
        1 => values.pop(),
        _ => Some(Value::Array(values)),
    }
}
