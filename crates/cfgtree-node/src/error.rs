//! Tree manipulation errors.

use thiserror::Error;

/// Errors raised while resolving or applying keys against a node tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("invalid key `{key}`: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value for `{0}` is not a scalar")]
    NonScalarValue(String),

    #[error("node path {0:?} does not exist in the tree")]
    MissingPath(Vec<usize>),
}

impl TreeError {
    pub(crate) fn invalid_key(key: &str, reason: impl Into<String>) -> Self {
        TreeError::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
