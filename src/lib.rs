//! cfgtree - hierarchical configuration access
//!
//! Uniform key/value access over several configuration sources, and a
//! [`CombinedConfiguration`] that merges the node trees of its children
//! into one view through a pluggable [`NodeCombiner`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use cfgtree::{CombinedConfiguration, Configuration, NodeCombiner};
//!
//! let combined = CombinedConfiguration::new(NodeCombiner::override_first());
//! combined.add_configuration(Arc::new(cfgtree::loader::from_toml_str("a = 1")?), Some("user"), None)?;
//! combined.add_configuration(Arc::new(cfgtree::loader::from_toml_str("a = 2\nb = 3")?), None, None)?;
//! assert_eq!(combined.get_i64("a")?, Some(1));
//! # Ok::<(), cfgtree::Error>(())
//! ```

pub mod combined;
pub mod composite;
pub mod configuration;
pub mod convert;
pub mod env;
pub mod error;
pub mod event;
pub mod loader;
pub mod map;
pub mod subset;
pub mod tree;

pub use cfgtree_node::{
    Attribute, CombinerKind, DefaultExpressionEngine, ExpressionEngine, KeySegment, Node,
    NodeCombiner, NodeHandle, OverrideGranularity, Symbols, TreeError,
};
pub use combined::CombinedConfiguration;
pub use composite::CompositeConfiguration;
pub use configuration::{Configuration, SharedConfiguration};
pub use env::EnvironmentConfiguration;
pub use error::{Error, Result};
pub use event::{ConfigurationEvent, ConfigurationListener, EventKind, EventSource, ListenerId};
pub use loader::{SourceFormat, SourceInfo};
pub use map::MapConfiguration;
pub use subset::SubsetConfiguration;
pub use tree::TreeConfiguration;
