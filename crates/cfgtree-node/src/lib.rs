//! Configuration node trees.
//!
//! This crate holds the pure tree model behind hierarchical configurations:
//! the [`Node`] type, the [`ExpressionEngine`] that maps key strings onto
//! tree locations, and the [`NodeCombiner`] policies that merge two trees
//! into one.

mod combiner;
mod error;
mod expr;
mod node;

pub use combiner::{CombineFn, CombinerKind, NodeCombiner, OverrideGranularity};
pub use error::TreeError;
pub use expr::{AddPlan, DefaultExpressionEngine, ExpressionEngine, KeySegment, NodeHandle, Symbols};
pub use node::{Attribute, Node};
