//! Read-only configuration from environment variables.

use cfgtree_node::Node;
use serde_json::Value;

use crate::configuration::Configuration;
use crate::error::{Error, Result};
use crate::event::EventSource;
use crate::map::MapConfiguration;

/// Separator in variable names that maps to a key delimiter.
const NESTING_SEPARATOR: &str = "__";

/// Snapshot of environment variables taken at construction.
///
/// With a prefix, only matching variables are kept; the prefix is stripped,
/// names are lower-cased and `__` becomes `.`, so `APP_DB__HOST` is read as
/// `db.host`.
#[derive(Debug)]
pub struct EnvironmentConfiguration {
    values: MapConfiguration,
}

impl EnvironmentConfiguration {
    /// All variables of the current process, names unchanged.
    pub fn new() -> Self {
        Self::from_vars(std::env::vars(), None)
    }

    pub fn with_prefix(prefix: &str) -> Self {
        Self::from_vars(std::env::vars(), Some(prefix))
    }

    pub fn from_vars<I>(vars: I, prefix: Option<&str>) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut pairs: Vec<(String, Value)> = vars
            .into_iter()
            .filter_map(|(name, value)| {
                let key = match prefix {
                    Some(p) => name
                        .strip_prefix(p)?
                        .to_ascii_lowercase()
                        .replace(NESTING_SEPARATOR, "."),
                    None => name,
                };
                (!key.is_empty()).then(|| (key, Value::String(value)))
            })
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            values: MapConfiguration::from_pairs(pairs),
        }
    }
}

impl Default for EnvironmentConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl Configuration for EnvironmentConfiguration {
    fn get_property(&self, key: &str) -> Result<Option<Value>> {
        self.values.get_property(key)
    }

    fn set_property(&self, key: &str, _value: Value) -> Result<()> {
        Err(Error::ReadOnly(key.to_string()))
    }

    fn add_property(&self, key: &str, _value: Value) -> Result<()> {
        Err(Error::ReadOnly(key.to_string()))
    }

    fn clear_property(&self, key: &str) -> Result<()> {
        Err(Error::ReadOnly(key.to_string()))
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.values.keys()
    }

    fn root_node(&self) -> Result<Node> {
        self.values.root_node()
    }

    fn event_source(&self) -> &EventSource {
        self.values.event_source()
    }
}
