//! Deployment environment settings
//!
//! An environment adjusts how a template is expanded into instances without
//! touching the template itself: it can change the cardinality of any node
//! and attach string properties to the instances at a given path. Paths are
//! the slash-joined names from the root, e.g. `/shebang/ning/resolver`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or parsing environment files
#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("Failed to read environment file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse environment TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Per-path cardinality and properties
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Optional name for the environment
    pub name: Option<String>,
    /// Instance count overrides: path -> count
    pub cardinality: HashMap<String, i64>,
    /// Properties handed to every instance at a path
    pub properties: HashMap<String, BTreeMap<String, String>>,
}

/// TOML structure for deserializing environments
#[derive(Deserialize)]
struct TomlEnvironment {
    metadata: Option<TomlMetadata>,
    #[serde(default)]
    cardinality: HashMap<String, i64>,
    #[serde(default)]
    properties: HashMap<String, BTreeMap<String, String>>,
}

#[derive(Deserialize)]
struct TomlMetadata {
    name: Option<String>,
}

impl Environment {
    /// Load environment from TOML file
    pub fn from_file(path: &Path) -> Result<Self, EnvironmentError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load environment from TOML string
    pub fn from_str(content: &str) -> Result<Self, EnvironmentError> {
        let parsed: TomlEnvironment = toml::from_str(content)?;

        Ok(Environment {
            name: parsed.metadata.and_then(|m| m.name),
            cardinality: parsed.cardinality,
            properties: parsed.properties,
        })
    }

    /// Number of copies to create for the node at `path`.
    ///
    /// The environment wins over the declared count; negative values mean no
    /// copies at all.
    pub fn cardinality_for(&self, path: &str, declared: i64) -> usize {
        let count = self.cardinality.get(path).copied().unwrap_or(declared);
        usize::try_from(count).unwrap_or(0)
    }

    /// Properties for instances at `path`
    pub fn properties_for(&self, path: &str) -> BTreeMap<String, String> {
        self.properties.get(path).cloned().unwrap_or_default()
    }
}
