//! Loading trees from TOML and JSON documents.
//!
//! Documents are parsed into `serde_json::Value` first (TOML through
//! `toml::Value`), then turned into nodes: tables become children, arrays
//! become repeated same-named children, scalars become values. Every loaded
//! tree records where it came from and a SHA-256 digest of the raw bytes.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use cfgtree_node::Node;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::tree::TreeConfiguration;

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Toml,
    Json,
}

impl SourceFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(SourceFormat::Toml),
            Some("json") => Ok(SourceFormat::Json),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Provenance of a loaded tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub format: SourceFormat,

    /// File path (None for in-memory text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of the raw bytes
    pub digest: String,

    pub loaded_at: DateTime<Utc>,
}

/// Load a TOML or JSON file, chosen by extension.
pub fn load_file(path: &Path) -> Result<TreeConfiguration> {
    let format = SourceFormat::from_path(path)?;
    let bytes = fs::read(path).map_err(|e| Error::Io(path.to_path_buf(), e))?;
    let source = path.to_string_lossy();
    let (node, info) = parse_bytes(format, &bytes, Some(&source))?;
    debug!(path = %source, digest = %info.digest, "loaded configuration file");
    Ok(TreeConfiguration::with_root(node).with_source(info))
}

/// Load every `.toml` and `.json` file below `dir`, sorted by path.
pub fn load_dir(dir: &Path) -> Result<Vec<(PathBuf, TreeConfiguration)>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::Io(path, e.into())
        })?;
        if entry.file_type().is_file() && SourceFormat::from_path(entry.path()).is_ok() {
            paths.push(entry.into_path());
        }
    }

    paths
        .into_iter()
        .map(|path| {
            let config = load_file(&path)?;
            Ok((path, config))
        })
        .collect()
}

pub fn from_toml_str(text: &str) -> Result<TreeConfiguration> {
    from_str(SourceFormat::Toml, text)
}

pub fn from_json_str(text: &str) -> Result<TreeConfiguration> {
    from_str(SourceFormat::Json, text)
}

fn from_str(format: SourceFormat, text: &str) -> Result<TreeConfiguration> {
    let (node, info) = parse_bytes(format, text.as_bytes(), None)?;
    Ok(TreeConfiguration::with_root(node).with_source(info))
}

/// Parse raw document bytes into a tree plus its provenance.
pub(crate) fn parse_bytes(
    format: SourceFormat,
    bytes: &[u8],
    path: Option<&str>,
) -> Result<(Node, SourceInfo)> {
    let contents = std::str::from_utf8(bytes)
        .map_err(|e| Error::Parse(format!("Invalid UTF-8: {}", e)))?;

    let document = match format {
        SourceFormat::Toml => {
            let value: toml::Value = toml::from_str(contents)
                .map_err(|e| Error::Parse(format!("TOML parse error: {}", e)))?;
            toml_to_json(value)
        }
        SourceFormat::Json => serde_json::from_str(contents)
            .map_err(|e| Error::Parse(format!("JSON parse error: {}", e)))?,
    };

    if !document.is_object() {
        return Err(Error::Parse("document root must be a table".to_string()));
    }

    let info = SourceInfo {
        format,
        path: path.map(str::to_string),
        digest: digest(bytes),
        loaded_at: Utc::now(),
    };
    Ok((Node::from_json("", &document), info))
}

pub(crate) fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Convert TOML Value to JSON Value
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            Value::Object(map)
        }
    }
}
