//! # Schema Directory Loader
//!
//! Builds a [`MethodSchemas`] validation set from a directory with one file
//! per method. The file stem is the method name; `.json`, `.yaml` and `.yml`
//! files are read, anything else is skipped.
//!
//! Each file is an object with two optional members:
//!
//! ```yaml
//! params:            # a schema: params are required and validated
//!   type: array
//!   items: {type: number}
//! result: null       # null: the method returns nothing
//! ```
//!
//! A missing member declares nothing for that half of the method, which the
//! service reports as a configuration defect once validation is enabled.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use jsonrpc11_server::{MethodSchemas, SYSTEM_PREFIX, SchemaError, SchemaKind};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("Schema directory not found: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Schema document {0} is not an object")]
    NotAnObject(PathBuf),

    #[error("Invalid schema document {path}: {source}")]
    InvalidDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Schema file name is not a valid method name: {0}")]
    InvalidFileName(PathBuf),

    #[error("Method '{method}' is defined by both {first} and {second}")]
    DuplicateMethod {
        method: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub type Result<T> = std::result::Result<T, SchemaLoadError>;

/// Contents of one method file. `Some(Value::Null)` is an explicit `null`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MethodDocument {
    #[serde(default, deserialize_with = "present")]
    params: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Some(Format::Json),
            Some("yaml") | Some("yml") => Some(Format::Yaml),
            _ => None,
        }
    }
}

/// A directory of per-method schema files.
#[derive(Debug, Clone)]
pub struct SchemaDirectory {
    root: PathBuf,
}

impl SchemaDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read and compile every method file in the directory.
    pub fn load(&self) -> Result<MethodSchemas> {
        if !self.root.is_dir() {
            return Err(SchemaLoadError::NotADirectory(self.root.clone()));
        }

        let mut files: BTreeMap<String, (PathBuf, Format)> = BTreeMap::new();
        for entry in fs::read_dir(&self.root).map_err(|source| SchemaLoadError::Io {
            path: self.root.clone(),
            source,
        })? {
            let entry = entry.map_err(|source| SchemaLoadError::Io {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(format) = Format::from_path(&path) else {
                debug!("Skipping non-schema file: {}", path.display());
                continue;
            };
            let method = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .filter(|stem| !stem.is_empty())
                .ok_or_else(|| SchemaLoadError::InvalidFileName(path.clone()))?
                .to_string();

            if let Some((first, _)) = files.get(&method) {
                let (first, second) = if first < &path {
                    (first.clone(), path)
                } else {
                    (path, first.clone())
                };
                return Err(SchemaLoadError::DuplicateMethod {
                    method,
                    first,
                    second,
                });
            }
            files.insert(method, (path, format));
        }

        let mut schemas = MethodSchemas::new();
        for (method, (path, format)) in files {
            if method.starts_with(SYSTEM_PREFIX) {
                warn!(
                    "Ignoring schema for built-in method {} ({})",
                    method,
                    path.display()
                );
                continue;
            }
            let document = read_document(&path, format)?;
            declare(&mut schemas, &method, SchemaKind::Params, document.params)?;
            declare(&mut schemas, &method, SchemaKind::Result, document.result)?;
        }

        info!(
            "Loaded schemas for {} methods from {}",
            schemas.len(),
            self.root.display()
        );
        Ok(schemas)
    }
}

/// Shorthand for `SchemaDirectory::new(path).load()`.
pub fn load_dir(path: impl AsRef<Path>) -> Result<MethodSchemas> {
    SchemaDirectory::new(path.as_ref()).load()
}

fn read_document(path: &Path, format: Format) -> Result<MethodDocument> {
    let text = fs::read_to_string(path).map_err(|source| SchemaLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value = match format {
        Format::Json => serde_json::from_str(&text).map_err(|source| SchemaLoadError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        Format::Yaml => serde_yaml::from_str(&text).map_err(|source| SchemaLoadError::Yaml {
            path: path.to_path_buf(),
            source,
        })?,
    };
    // Structs also deserialize from sequences; only mappings are documents.
    if !document.is_object() {
        return Err(SchemaLoadError::NotAnObject(path.to_path_buf()));
    }
    serde_json::from_value(document).map_err(|source| SchemaLoadError::InvalidDocument {
        path: path.to_path_buf(),
        source,
    })
}

fn declare(
    schemas: &mut MethodSchemas,
    method: &str,
    kind: SchemaKind,
    declaration: Option<Value>,
) -> Result<()> {
    match declaration {
        None => Ok(()),
        Some(Value::Null) => {
            schemas.insert_absent(method, kind);
            Ok(())
        }
        Some(schema) => Ok(schemas.insert(method, kind, Some(&schema))?),
    }
}
