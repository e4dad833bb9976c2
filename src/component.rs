//! Conversion of schema nodes into OpenAPI component definitions.
//!
//! Sub-resources that get their own path are retrievable by link, so every
//! embedded sub-resource is rewritten to `oneOf: [<inline shape>, <uri string>]`.
//! Compiler annotations are stripped and the remaining keywords are shaped for
//! OpenAPI 3.0.

use serde_json::{json, Map, Value};

use crate::types::{is_sub_schema, INTERNAL_ANNOTATIONS};
use crate::walker::{reattach, walk, PathStep, SchemaVisitor, Walk, WalkContext};

/// Convert a schema into a catalog-safe OpenAPI component definition.
///
/// The input is not modified.
pub fn to_component(schema: &Value) -> Value {
    walk(schema.clone(), &mut ComponentVisitor)
}

/// The alternative used when a sub-resource is returned by link.
pub fn uri_reference() -> Value {
    json!({ "type": "string", "format": "uri" })
}

struct ComponentVisitor;

impl SchemaVisitor for ComponentVisitor {
    type Output = Value;

    fn enter(&mut self, schema: Value, _ctx: &WalkContext<'_>) -> Walk {
        Walk::Descend(schema)
    }

    fn leave(
        &mut self,
        schema: Value,
        children: Vec<(PathStep, Value)>,
        ctx: &WalkContext<'_>,
    ) -> Value {
        let linkable = !ctx.is_root()
            && matches!(ctx.step(), Some(PathStep::Property(_) | PathStep::Items))
            && is_sub_schema(&schema);

        let Value::Object(mut node) = schema else {
            return schema;
        };

        for (step, child) in children {
            reattach(&mut node, step, child);
        }

        for key in INTERNAL_ANNOTATIONS {
            node.shift_remove(*key);
        }
        shape_for_openapi(&mut node);

        if linkable {
            json!({ "oneOf": [Value::Object(node), uri_reference()] })
        } else {
            Value::Object(node)
        }
    }
}

/// Rewrite JSON Schema keywords that OpenAPI 3.0 expresses differently.
fn shape_for_openapi(node: &mut Map<String, Value>) {
    if let Some(Value::Array(types)) = node.get("type").cloned() {
        let nullable = types.iter().any(|t| t == "null");
        let concrete: Vec<Value> = types.iter().filter(|t| *t != "null").cloned().collect();

        match concrete.as_slice() {
            [] => {
                node.shift_remove("type");
            }
            [single] => {
                node.insert("type".to_string(), single.clone());
            }
            several => {
                let branches = several.iter().map(|t| json!({ "type": t })).collect();
                node.shift_remove("type");
                node.insert("anyOf".to_string(), Value::Array(branches));
            }
        }
        if nullable {
            node.insert("nullable".to_string(), Value::Bool(true));
        }
    }

    if let Some(value) = node.shift_remove("const") {
        node.insert("enum".to_string(), Value::Array(vec![value]));
    }

    if let Some(examples) = node.shift_remove("examples") {
        if let Some(first) = examples.as_array().and_then(|e| e.first()) {
            node.insert("example".to_string(), first.clone());
        }
    }

    for (exclusive, bound) in [
        ("exclusiveMinimum", "minimum"),
        ("exclusiveMaximum", "maximum"),
    ] {
        if let Some(limit @ Value::Number(_)) = node.get(exclusive).cloned() {
            node.insert(bound.to_string(), limit);
            node.insert(exclusive.to_string(), Value::Bool(true));
        }
    }

    if let Some(patterns) = node.shift_remove("patternProperties") {
        node.insert("x-patternProperties".to_string(), patterns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_schema_stays_empty() {
        assert_eq!(to_component(&json!({})), json!({}));
    }

    #[test]
    fn plain_scalar_is_unchanged() {
        let schema = json!({ "type": "string" });
        assert_eq!(to_component(&schema), schema);
    }

    #[test]
    fn strips_identifier_from_scalar() {
        let schema = json!({ "type": "string", "$id": "myid" });
        assert_eq!(to_component(&schema), json!({ "type": "string" }));
    }

    #[test]
    fn strips_defaults_and_bindings() {
        let schema = json!({
            "title": "Employee",
            "$schema": "http://json-schema.org/draft-04/schema#",
            "x-rest-controller": "Employee",
            "x-rest-blank-object": "{}",
            "properties": {
                "age": { "type": "integer", "default": 37 }
            }
        });
        assert_eq!(
            to_component(&schema),
            json!({
                "title": "Employee",
                "properties": { "age": { "type": "integer" } }
            })
        );
    }

    #[test]
    fn stripping_keeps_document_order() {
        let schema = json!({
            "$id": "https://example.com/employee",
            "title": "Employee",
            "type": "object",
            "x-rest-controller": "Employee",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        });
        let keys: Vec<String> = to_component(&schema)
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["title", "type", "properties", "required"]);
        assert_eq!(
            serde_json::to_string(&to_component(&schema)).unwrap(),
            r#"{"title":"Employee","type":"object","properties":{"name":{"type":"string"}},"required":["name"]}"#
        );
    }

    #[test]
    fn identified_property_object_becomes_union() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "$id": "myid" },
                "address": { "type": "object", "$id": "addressId" }
            }
        });
        assert_eq!(
            to_component(&schema),
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "address": { "oneOf": [{ "type": "object" }, { "type": "string", "format": "uri" }] }
                }
            })
        );
    }

    #[test]
    fn identified_array_items_become_union() {
        let schema = json!({
            "type": "object",
            "properties": {
                "addresses": { "type": "array", "items": { "type": "object", "$id": "addressList" } }
            }
        });
        assert_eq!(
            to_component(&schema),
            json!({
                "type": "object",
                "properties": {
                    "addresses": {
                        "type": "array",
                        "items": { "oneOf": [{ "type": "object" }, { "type": "string", "format": "uri" }] }
                    }
                }
            })
        );
    }

    #[test]
    fn root_is_never_wrapped() {
        let schema = json!({ "type": "object", "$id": "root", "title": "Root" });
        assert_eq!(
            to_component(&schema),
            json!({ "type": "object", "title": "Root" })
        );
    }

    #[test]
    fn tuple_items_are_cleaned_but_not_wrapped() {
        let schema = json!({
            "type": "array",
            "items": [{ "type": "object", "$id": "myid" }]
        });
        assert_eq!(
            to_component(&schema),
            json!({ "type": "array", "items": [{ "type": "object" }] })
        );
    }

    #[test]
    fn nested_sub_resources_are_transformed_inside_the_union() {
        let schema = json!({
            "type": "object",
            "properties": {
                "department": {
                    "title": "Department",
                    "properties": {
                        "head": { "title": "Employee", "type": "object", "default": {} }
                    }
                }
            }
        });
        let uri = uri_reference();
        assert_eq!(
            to_component(&schema),
            json!({
                "type": "object",
                "properties": {
                    "department": {
                        "oneOf": [
                            {
                                "title": "Department",
                                "properties": {
                                    "head": { "oneOf": [{ "title": "Employee", "type": "object" }, uri] }
                                }
                            },
                            uri
                        ]
                    }
                }
            })
        );
    }

    #[test]
    fn nullable_type_arrays() {
        assert_eq!(
            to_component(&json!({ "type": ["string", "null"] })),
            json!({ "type": "string", "nullable": true })
        );
        assert_eq!(
            to_component(&json!({ "type": ["string", "integer"] })),
            json!({ "anyOf": [{ "type": "string" }, { "type": "integer" }] })
        );
    }

    #[test]
    fn draft_keywords_are_rewritten() {
        let schema = json!({
            "type": "number",
            "const": 3,
            "examples": [3, 4],
            "exclusiveMinimum": 1
        });
        assert_eq!(
            to_component(&schema),
            json!({
                "type": "number",
                "enum": [3],
                "example": 3,
                "minimum": 1,
                "exclusiveMinimum": true
            })
        );
    }

    #[test]
    fn input_is_not_modified() {
        let schema = json!({ "properties": { "a": { "$id": "a", "type": "object" } } });
        let before = schema.clone();
        to_component(&schema);
        assert_eq!(schema, before);
    }
}
