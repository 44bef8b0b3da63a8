//! Error types shared by all configurations.

use std::path::PathBuf;

use cfgtree_node::TreeError;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("a configuration named `{0}` is already registered")]
    DuplicateName(String),

    #[error("configuration is read-only, cannot modify `{0}`")]
    ReadOnly(String),

    #[error("cannot convert `{key}` to {target}: {value}")]
    Conversion {
        key: String,
        target: &'static str,
        value: String,
    },

    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("unsupported configuration format: `{0}`")]
    UnsupportedFormat(String),

    /// Failure reported by a custom configuration implementation.
    #[error("configuration source error: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, Error>;
