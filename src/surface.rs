//! The compiled API surface: resource paths and their type catalog.
//!
//! An [`ApiSurface`] is built once and then only read, so it can be shared
//! between request workers behind an `Arc`.

use serde_json::{json, Map, Value};

use crate::error::BuildError;
use crate::types::{
    OperationKind, PathParameter, SchemaStep, TypeRef, BLANK_OBJECT_KEY, CONTROLLER_KEY,
    DISPATCHER_KEY, PATH_BASE_KEY, PATH_TEMPLATE_KEY, SCHEMA_PATH_KEY,
};

/// Whether a path addresses a whole collection or one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// List and create; no trailing identifier.
    Collection,
    /// Get, modify, replace and delete one resource.
    Item,
}

/// Request or response payload of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub description: String,
    pub schema: Option<TypeRef>,
}

/// One operation on a compiled path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    pub summary: String,
    pub operation_id: String,
    pub request_body: Option<Payload>,
    pub status: u16,
    pub response: Payload,
}

impl Operation {
    fn to_openapi(&self, parameters: &[PathParameter]) -> Value {
        let mut op = Map::new();
        op.insert("summary".to_string(), json!(self.summary));
        op.insert("operationId".to_string(), json!(self.operation_id));
        op.insert(
            "parameters".to_string(),
            Value::Array(parameters.iter().map(PathParameter::to_openapi).collect()),
        );
        if let Some(body) = &self.request_body {
            let mut request = json!({
                "description": body.description,
                "required": true,
            });
            if let Some(schema) = &body.schema {
                request["content"] = json_content(schema);
            }
            op.insert("requestBody".to_string(), request);
        }

        let mut response = json!({ "description": self.response.description });
        if let Some(schema) = &self.response.schema {
            response["content"] = json_content(schema);
        }
        op.insert(
            "responses".to_string(),
            json!({ self.status.to_string(): response }),
        );
        Value::Object(op)
    }
}

fn json_content(schema: &TypeRef) -> Value {
    json!({ "application/json": { "schema": schema.to_openapi() } })
}

/// One addressable path and everything dispatch needs to serve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    /// Full path key: base URL followed by the template.
    pub url: String,
    pub base_url: String,
    /// Accumulated template without the base URL, `/` when empty.
    pub template: String,
    pub kind: PathKind,
    pub parameters: Vec<PathParameter>,
    pub schema_path: Vec<SchemaStep>,
    /// Local handler key from the schema's `x-rest-controller`.
    pub controller: String,
    /// Name of the dispatch entry point.
    pub dispatcher: String,
    /// Serialized blank instance, or the schema's override.
    pub blank_object: String,
    pub operations: Vec<Operation>,
}

impl ResourcePath {
    pub fn operation(&self, kind: OperationKind) -> Option<&Operation> {
        self.operations.iter().find(|op| op.kind == kind)
    }

    /// Render as an OpenAPI Path Item Object.
    pub fn to_openapi(&self) -> Value {
        let mut item = Map::new();
        item.insert(DISPATCHER_KEY.to_string(), json!(self.dispatcher));
        item.insert(CONTROLLER_KEY.to_string(), json!(self.controller));
        item.insert(BLANK_OBJECT_KEY.to_string(), json!(self.blank_object));
        item.insert(PATH_TEMPLATE_KEY.to_string(), json!(self.template));
        item.insert(PATH_BASE_KEY.to_string(), json!(self.base_url));
        item.insert(SCHEMA_PATH_KEY.to_string(), json!(self.schema_path));
        for op in &self.operations {
            item.insert(
                op.kind.method().to_string(),
                op.to_openapi(&self.parameters),
            );
        }
        Value::Object(item)
    }
}

/// Result of compiling one or more schema roots.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSurface {
    pub(crate) dispatcher: String,
    pub(crate) paths: Vec<ResourcePath>,
    pub(crate) schemas: Map<String, Value>,
}

impl ApiSurface {
    pub(crate) fn new(dispatcher: impl Into<String>) -> Self {
        Self {
            dispatcher: dispatcher.into(),
            paths: Vec::new(),
            schemas: Map::new(),
        }
    }

    /// Name of the dispatch entry point bound into every path.
    pub fn dispatcher(&self) -> &str {
        &self.dispatcher
    }

    /// Paths in emission order.
    pub fn paths(&self) -> &[ResourcePath] {
        &self.paths
    }

    /// Look up a path by its full URL key.
    pub fn path(&self, url: &str) -> Option<&ResourcePath> {
        self.paths.iter().find(|p| p.url == url)
    }

    /// Type catalog keyed by namespaced title.
    pub fn schemas(&self) -> &Map<String, Value> {
        &self.schemas
    }

    pub fn schema(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    pub(crate) fn contains_path(&self, url: &str) -> bool {
        self.path(url).is_some()
    }

    /// Render as an OpenAPI fragment: `{ paths, components: { schemas } }`.
    pub fn to_openapi(&self) -> Value {
        let paths: Map<String, Value> = self
            .paths
            .iter()
            .map(|p| (p.url.clone(), p.to_openapi()))
            .collect();
        json!({
            "paths": paths,
            "components": { "schemas": self.schemas }
        })
    }

    /// Insert paths and catalog entries into a host OpenAPI document.
    ///
    /// Missing `paths` / `components.schemas` objects are created. The
    /// document shape and every collision with an existing entry are checked
    /// before anything is inserted, so a failed merge leaves the document
    /// unchanged.
    ///
    /// # Errors
    ///
    /// `BuildError::MalformedDocument` if the document, `paths`,
    /// `components` or `components.schemas` is present but not an object;
    /// otherwise `BuildError::DuplicatePath` or `BuildError::DuplicateTitle`.
    pub fn merge_into(&self, doc: &mut Value) -> Result<(), BuildError> {
        for location in ["", "/paths", "/components", "/components/schemas"] {
            if doc.pointer(location).is_some_and(|v| !v.is_object()) {
                return Err(BuildError::MalformedDocument {
                    location: if location.is_empty() {
                        "/".to_string()
                    } else {
                        location.to_string()
                    },
                });
            }
        }
        for path in &self.paths {
            if doc.pointer(&pointer(&["paths", path.url.as_str()])).is_some() {
                return Err(BuildError::DuplicatePath {
                    path: path.url.clone(),
                    title: path.controller.clone(),
                });
            }
        }
        for name in self.schemas.keys() {
            if doc
                .pointer(&pointer(&["components", "schemas", name.as_str()]))
                .is_some()
            {
                return Err(BuildError::DuplicateTitle {
                    title: name.clone(),
                });
            }
        }

        let Value::Object(root) = doc else {
            return Err(BuildError::MalformedDocument {
                location: "/".to_string(),
            });
        };
        let paths = object_entry(root, "paths")?;
        for path in &self.paths {
            paths.insert(path.url.clone(), path.to_openapi());
        }
        let schemas = object_entry(object_entry(root, "components")?, "schemas")?;
        for (name, schema) in &self.schemas {
            schemas.insert(name.clone(), schema.clone());
        }
        Ok(())
    }
}

/// Get the object at `key`, creating it when missing.
fn object_entry<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
) -> Result<&'a mut Map<String, Value>, BuildError> {
    match map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
    {
        Value::Object(inner) => Ok(inner),
        _ => Err(BuildError::MalformedDocument {
            location: format!("/{}", key),
        }),
    }
}

/// Build a JSON Pointer from raw segments (RFC 6901 escaping).
fn pointer(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| format!("/{}", s.replace('~', "~0").replace('/', "~1")))
        .collect()
}
