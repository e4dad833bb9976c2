//! Core types and schema classification helpers.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Schema keyword naming the handler a resource is bound to.
///
/// The same key is emitted on compiled path items and may be overridden
/// on individual operations of a host document.
pub const CONTROLLER_KEY: &str = "x-rest-controller";

/// Schema keyword carrying a serialized blank-instance override.
pub const BLANK_OBJECT_KEY: &str = "x-rest-blank-object";

/// Path item extension naming the dispatch entry point.
pub const DISPATCHER_KEY: &str = "x-rest-dispatcher";

/// Path item extension holding the path template without the base URL.
pub const PATH_TEMPLATE_KEY: &str = "x-rest-path-template";

/// Path item extension holding the base URL the path was compiled under.
pub const PATH_BASE_KEY: &str = "x-rest-path-base";

/// Path item extension holding the schema path steps.
pub const SCHEMA_PATH_KEY: &str = "x-rest-schema-path";

/// Keywords that never leave the compiler in a catalog entry.
pub const INTERNAL_ANNOTATIONS: &[&str] =
    &["$id", "$schema", "default", CONTROLLER_KEY, BLANK_OBJECT_KEY];

/// The declared `type` of a schema, when it is a single string.
pub fn schema_type(schema: &Value) -> Option<&str> {
    schema.get("type").and_then(Value::as_str)
}

/// True if the schema declares a stable identifier (`$id`).
pub fn has_identifier(schema: &Value) -> bool {
    schema.get("$id").is_some_and(|id| !id.is_null())
}

pub fn has_properties(schema: &Value) -> bool {
    schema.get("properties").is_some_and(Value::is_object)
}

pub fn is_read_only(schema: &Value) -> bool {
    schema
        .get("readOnly")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

pub fn is_array(schema: &Value) -> bool {
    schema_type(schema) == Some("array")
}

/// Object type, or any node that carries `properties`.
///
/// Used when deciding whether a property becomes a nested resource.
pub fn is_object_like(schema: &Value) -> bool {
    schema_type(schema) == Some("object") || has_properties(schema)
}

/// Object type, or untyped with `properties`.
///
/// Used by the blank-instance materializer, which only assembles objects
/// for nodes that are not explicitly typed as something else.
pub fn is_object_shaped(schema: &Value) -> bool {
    match schema.get("type") {
        Some(Value::String(t)) => t == "object",
        None => has_properties(schema),
        Some(_) => false,
    }
}

/// True if the node may be returned either inline or as a link.
///
/// Requires an `$id` or `title`, and an object, boolean or missing type.
pub fn is_sub_schema(schema: &Value) -> bool {
    let named = has_identifier(schema) || schema.get("title").is_some_and(|t| !t.is_null());
    let typed = match schema.get("type") {
        None => true,
        Some(Value::String(t)) => t == "object" || t == "boolean",
        Some(_) => false,
    };
    named && typed
}

pub fn title(schema: &Value) -> Option<&str> {
    schema.get("title").and_then(Value::as_str)
}

/// Integer path parameter identifying one member of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParameter {
    pub name: String,
    pub description: String,
}

impl PathParameter {
    /// Positional parameter: the Nth placeholder introduced along the path.
    pub fn positional(index: usize, title: Option<&str>) -> Self {
        Self {
            name: format!("pathParam{}", index),
            description: format!("ID for {}", title.unwrap_or("item")),
        }
    }

    pub fn placeholder(&self) -> String {
        format!("{{{}}}", self.name)
    }

    pub fn to_openapi(&self) -> Value {
        json!({
            "in": "path",
            "name": self.name,
            "schema": { "type": "integer" },
            "required": true,
            "description": self.description,
        })
    }
}

/// One step from the document root towards a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaStep {
    /// Descend into the named property.
    Property(String),
    /// Select one array member by the named path parameter.
    Item(String),
}

/// The operations a compiled path can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    GetItem,
    PatchItem,
    PutItem,
    DeleteItem,
    GetItems,
    PostItems,
}

impl OperationKind {
    /// HTTP method, lowercase as used for OpenAPI operation keys.
    pub fn method(&self) -> &'static str {
        match self {
            OperationKind::GetItem | OperationKind::GetItems => "get",
            OperationKind::PatchItem => "patch",
            OperationKind::PutItem => "put",
            OperationKind::DeleteItem => "delete",
            OperationKind::PostItems => "post",
        }
    }

    /// Prefix of the generated `operationId`.
    pub fn operation_name(&self) -> &'static str {
        match self {
            OperationKind::GetItem => "getItem",
            OperationKind::PatchItem => "patchItem",
            OperationKind::PutItem => "putItem",
            OperationKind::DeleteItem => "deleteItem",
            OperationKind::GetItems => "getItems",
            OperationKind::PostItems => "postItems",
        }
    }
}

/// Reference from an operation to a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Schema(String),
    ArrayOf(String),
}

impl TypeRef {
    pub fn to_openapi(&self) -> Value {
        match self {
            TypeRef::Schema(name) => json!({ "$ref": component_ref(name) }),
            TypeRef::ArrayOf(name) => json!({
                "type": "array",
                "items": { "$ref": component_ref(name) }
            }),
        }
    }
}

fn component_ref(name: &str) -> String {
    format!("#/components/schemas/{}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_schema_requires_name_and_object_like_type() {
        assert!(is_sub_schema(&json!({ "type": "object", "$id": "a" })));
        assert!(is_sub_schema(&json!({ "title": "Address" })));
        assert!(is_sub_schema(&json!({ "type": "boolean", "title": "Flag" })));
        assert!(!is_sub_schema(&json!({ "type": "string", "$id": "a" })));
        assert!(!is_sub_schema(&json!({ "type": "object" })));
        assert!(!is_sub_schema(&json!({ "type": ["object", "null"], "$id": "a" })));
    }

    #[test]
    fn object_like_includes_any_node_with_properties() {
        assert!(is_object_like(&json!({ "type": "object" })));
        assert!(is_object_like(&json!({ "properties": {} })));
        assert!(is_object_like(&json!({ "type": "string", "properties": {} })));
        assert!(!is_object_like(&json!({ "type": "string" })));

        assert!(is_object_shaped(&json!({ "properties": {} })));
        assert!(!is_object_shaped(&json!({ "type": "string", "properties": {} })));
    }

    #[test]
    fn positional_parameter() {
        let param = PathParameter::positional(2, Some("Employee"));
        assert_eq!(param.name, "pathParam2");
        assert_eq!(param.placeholder(), "{pathParam2}");
        assert_eq!(param.description, "ID for Employee");
        assert_eq!(
            PathParameter::positional(0, None).description,
            "ID for item"
        );
    }

    #[test]
    fn parameter_renders_as_required_integer() {
        let rendered = PathParameter::positional(0, Some("Employee")).to_openapi();
        assert_eq!(
            rendered,
            json!({
                "in": "path",
                "name": "pathParam0",
                "schema": { "type": "integer" },
                "required": true,
                "description": "ID for Employee"
            })
        );
    }

    #[test]
    fn type_ref_rendering() {
        assert_eq!(
            TypeRef::ArrayOf("Employee".into()).to_openapi(),
            json!({ "type": "array", "items": { "$ref": "#/components/schemas/Employee" } })
        );
    }

    #[test]
    fn schema_step_serialization() {
        let steps = vec![
            SchemaStep::Property("employees".into()),
            SchemaStep::Item("pathParam0".into()),
        ];
        assert_eq!(
            serde_json::to_value(&steps).unwrap(),
            json!([{ "property": "employees" }, { "item": "pathParam0" }])
        );
    }
}
