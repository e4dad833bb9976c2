//! Build configuration files.
//!
//! A configuration lists the schema files to compile and the base URL each
//! is mounted under:
//!
//! ```json
//! {
//!   "controller": "jsonschema-rest-api",
//!   "document": "openapi.json",
//!   "schemas": [
//!     { "path": "schemas/basic.json", "baseUrl": "/basic" },
//!     { "path": "schemas/branching.json", "baseUrl": "/branching" }
//!   ]
//! }
//! ```
//!
//! Relative paths resolve against the directory holding the configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::loader::load_schema;
use crate::plugin::PluginOptions;

/// One schema file to compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Contents of a build configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Dispatch entry name to bind into paths. Generated when absent.
    #[serde(default)]
    pub controller: Option<String>,
    /// Host OpenAPI document to merge into.
    #[serde(default)]
    pub document: Option<PathBuf>,
    #[serde(default)]
    pub schemas: Vec<SchemaEntry>,
}

impl BuildConfig {
    /// Read a configuration file, resolving relative paths against its
    /// directory.
    ///
    /// # Errors
    ///
    /// Any [`LoadError`] from reading the file, or `InvalidJson` if it does
    /// not match the configuration shape.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let raw = load_schema(path)?;
        let mut config: BuildConfig =
            serde_json::from_value(raw).map_err(|source| LoadError::InvalidJson { source })?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        if let Some(document) = config.document.take() {
            config.document = Some(dir.join(document));
        }
        for entry in &mut config.schemas {
            entry.path = dir.join(&entry.path);
        }
        Ok(config)
    }

    /// Load and dereference every listed schema.
    ///
    /// # Errors
    ///
    /// The first [`LoadError`] hit.
    pub fn plugin_options(&self) -> Result<PluginOptions, LoadError> {
        let mut options = PluginOptions::new();
        for entry in &self.schemas {
            options.add_schema_file(&entry.path, entry.base_url.clone().unwrap_or_default())?;
        }
        Ok(options)
    }
}
