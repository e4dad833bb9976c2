//! Schema loading from various sources.
//!
//! Handles loading schemas from files, strings, and HTTP URLs, and inlining
//! `$ref`s so the compiler always sees one self-contained tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::LoadError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a schema from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_schema(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_schema_str(&content)
}

/// Load a schema from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_schema_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a schema from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the response
/// isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_schema_url(url: &str) -> Result<Value, LoadError> {
    let network = |source: reqwest::Error| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(network)?
        .json()
        .map_err(network)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a schema from a file path or URL.
///
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_schema_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_schema_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: PathBuf::from(source),
            })
        }
    } else {
        load_schema(Path::new(source))
    }
}

/// Navigate a JSON Pointer fragment (e.g. `#/definitions/address`).
///
/// # Errors
///
/// `LoadError::RefError` if any segment is missing.
pub fn navigate_fragment(schema: &Value, fragment: &str) -> Result<Value, LoadError> {
    let path = fragment.trim_start_matches('#').trim_start_matches('/');
    if path.is_empty() {
        return Ok(schema.clone());
    }

    let mut current = schema;
    for part in path.split('/') {
        // JSON Pointer escapes: ~1 = /, ~0 = ~
        let key = part.replace("~1", "/").replace("~0", "~");
        let next = match current {
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => current.get(&key),
        };
        current = next.ok_or_else(|| LoadError::RefError {
            reference: fragment.to_string(),
            message: "fragment not found".to_string(),
        })?;
    }
    Ok(current.clone())
}

/// Inline every `$ref` in `schema`.
///
/// Internal refs (`#/...`) resolve against the document they appear in;
/// external refs are file paths relative to `base_dir` (or to the file
/// containing them), or URLs with the `remote` feature. Keywords next to a
/// `$ref` are kept and win over the referenced schema's. The input is not
/// modified.
///
/// # Errors
///
/// `LoadError::RefError` for missing fragments and circular references,
/// and any error from loading a referenced document.
pub fn dereference(schema: &Value, base_dir: &Path) -> Result<Value, LoadError> {
    let mut resolved = schema.clone();
    let root = Document {
        root: schema,
        dir: base_dir,
        key: String::new(),
    };
    dereference_node(&mut resolved, &root, &mut HashSet::new())?;
    Ok(resolved)
}

/// A document refs are resolved against.
struct Document<'a> {
    root: &'a Value,
    dir: &'a Path,
    /// Identity used for cycle detection; empty for the root document.
    key: String,
}

fn dereference_node(
    node: &mut Value,
    doc: &Document<'_>,
    visiting: &mut HashSet<String>,
) -> Result<(), LoadError> {
    match node {
        Value::Object(obj) => {
            let Some(reference) = obj.get("$ref").and_then(Value::as_str).map(str::to_string)
            else {
                for value in obj.values_mut() {
                    dereference_node(value, doc, visiting)?;
                }
                return Ok(());
            };

            let (file_part, fragment) = match reference.find('#') {
                Some(idx) => (&reference[..idx], &reference[idx..]),
                None => (reference.as_str(), ""),
            };

            let target = if file_part.is_empty() {
                let visit_key = format!("{}|{}", doc.key, fragment);
                let mut target = navigate_fragment(doc.root, fragment)?;
                enter(visiting, &visit_key, &reference)?;
                dereference_node(&mut target, doc, visiting)?;
                visiting.remove(&visit_key);
                target
            } else {
                let (loaded, location, dir) = load_external(file_part, doc.dir)?;
                let visit_key = format!("{}|{}", location, fragment);
                let mut target = navigate_fragment(&loaded, fragment)?;
                enter(visiting, &visit_key, &reference)?;
                let external = Document {
                    root: &loaded,
                    dir: &dir,
                    key: location,
                };
                dereference_node(&mut target, &external, visiting)?;
                visiting.remove(&visit_key);
                target
            };

            obj.shift_remove("$ref");
            for value in obj.values_mut() {
                dereference_node(value, doc, visiting)?;
            }
            if let Value::Object(target) = target {
                for (key, value) in target {
                    obj.entry(key).or_insert(value);
                }
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                dereference_node(item, doc, visiting)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn enter(visiting: &mut HashSet<String>, key: &str, reference: &str) -> Result<(), LoadError> {
    if visiting.insert(key.to_string()) {
        Ok(())
    } else {
        Err(LoadError::RefError {
            reference: reference.to_string(),
            message: "circular reference".to_string(),
        })
    }
}

/// Load the document an external ref points at.
///
/// Returns the document, its identity and the directory its own relative
/// refs resolve against.
fn load_external(location: &str, base_dir: &Path) -> Result<(Value, String, PathBuf), LoadError> {
    if is_url(location) {
        let loaded = load_schema_auto(location)?;
        return Ok((loaded, location.to_string(), base_dir.to_path_buf()));
    }
    let path = base_dir.join(location);
    let loaded = load_schema(&path)?;
    let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
    let dir = path
        .parent()
        .map_or_else(|| base_dir.to_path_buf(), Path::to_path_buf);
    Ok((loaded, canonical.display().to_string(), dir))
}

/// Reject documents that are not well-formed JSON Schemas.
///
/// # Errors
///
/// `LoadError::InvalidSchema` with the validator's message.
pub fn check_schema(schema: &Value) -> Result<(), LoadError> {
    jsonschema::validator_for(schema)
        .map(|_| ())
        .map_err(|e| LoadError::InvalidSchema {
            message: e.to_string(),
        })
}
