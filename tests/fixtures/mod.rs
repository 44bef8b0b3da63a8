//! Test fixtures for combination assertions
//!
//! This module provides:
//! - Source documents (TOML and JSON) used by the file-based tests
//! - A corpus of combination cases with the expected key values

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Directory holding the source documents
pub fn sources_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sources")
}

/// Path to one source document
pub fn source_path(name: &str) -> PathBuf {
    sources_dir().join(name)
}

/// Path to the combination corpus
pub fn combination_cases_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/combination_cases.json")
}

/// One combination case from combination_cases.json
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CombinationCase {
    pub id: String,
    pub combiner: String,
    #[serde(default)]
    pub list_nodes: Vec<String>,
    pub sources: Vec<serde_json::Value>,
    /// Key to expected value; `null` means undefined
    pub expected: BTreeMap<String, serde_json::Value>,
}

/// Full combination corpus
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CombinationCorpus {
    pub schema_version: u32,
    pub description: String,
    pub cases: Vec<CombinationCase>,
}

impl CombinationCorpus {
    /// Load corpus from the fixture file
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(combination_cases_path())?;
        let corpus: CombinationCorpus = serde_json::from_str(&content)?;
        Ok(corpus)
    }
}
