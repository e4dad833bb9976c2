//! Integration tests for compiling schemas into API surfaces.

use jsonschema_rest::{
    blank_object, synthesize, to_component, BuildError, OperationKind, PathKind, Plugin,
    PluginOptions, SurfaceBuilder,
};
use serde_json::{json, Value};

fn employee_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "type": "object",
        "properties": {
            "employees": {
                "type": "array",
                "items": {
                    "$id": "https://example.com/schemas/employee",
                    "title": "Employee",
                    "type": "object",
                    "x-rest-controller": "Employee",
                    "properties": {
                        "firstName": { "type": "string" },
                        "lastName": { "type": "string" },
                        "age": { "type": "integer", "default": 37 },
                        "updated": { "type": "string", "readOnly": true }
                    }
                }
            }
        }
    })
}

mod blank_instances {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_writable_property_is_a_key() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "address": { "type": "string", "default": "Test1234" }
            }
        });
        assert_eq!(
            blank_object(&schema),
            json!({ "name": null, "address": "Test1234" })
        );
    }

    #[test]
    fn addressable_children_are_left_out() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "manager": { "$id": "manager", "type": "object" },
                "reports": { "type": "array", "items": { "$id": "report" } }
            }
        });
        assert_eq!(blank_object(&schema), json!({ "name": null }));
    }

    #[test]
    fn object_default_fills_keys_without_their_own_default() {
        let schema = json!({
            "type": "object",
            "default": { "street": "123 Fake Street", "city": "Springfield" },
            "properties": {
                "street": { "type": "string" },
                "city": { "type": "string", "default": "Waterloo" },
                "zip": { "type": "string" }
            }
        });
        assert_eq!(
            blank_object(&schema),
            json!({ "street": "123 Fake Street", "city": "Waterloo", "zip": null })
        );
    }
}

mod catalog {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identified_property_becomes_inline_or_link() {
        let schema = json!({
            "title": "Employee",
            "properties": {
                "address": {
                    "$id": "address",
                    "type": "object",
                    "properties": { "city": { "type": "string", "default": "Waterloo" } }
                }
            }
        });
        assert_eq!(
            to_component(&schema),
            json!({
                "title": "Employee",
                "properties": {
                    "address": {
                        "oneOf": [
                            { "type": "object", "properties": { "city": { "type": "string" } } },
                            { "type": "string", "format": "uri" }
                        ]
                    }
                }
            })
        );
    }

    #[test]
    fn catalog_entries_carry_no_compiler_annotations() {
        let surface = synthesize(&employee_schema(), "c", "").unwrap();
        let entry = surface.schema("Employee").unwrap();
        assert!(entry.get("$id").is_none());
        assert!(entry.get("x-rest-controller").is_none());
        assert!(entry["properties"]["age"].get("default").is_none());
    }
}

mod paths {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn employees_collection_and_item() {
        let surface = synthesize(&employee_schema(), "jsonschema-rest-7", "").unwrap();
        let rendered = surface.to_openapi();
        let paths = rendered["paths"].as_object().unwrap();
        assert_eq!(
            paths.keys().collect::<Vec<_>>(),
            vec!["/employees", "/employees/{pathParam0}"]
        );

        let collection = &paths["/employees"];
        assert_eq!(collection["x-rest-dispatcher"], "jsonschema-rest-7");
        assert_eq!(collection["x-rest-controller"], "Employee");
        assert_eq!(collection["x-rest-path-template"], "/employees");
        assert_eq!(collection["x-rest-path-base"], "");
        assert_eq!(
            collection["x-rest-blank-object"],
            r#"{"firstName":null,"lastName":null,"age":37}"#
        );
        assert_eq!(collection["get"]["operationId"], "getItems /employees");
        assert_eq!(
            collection["get"]["responses"]["200"]["content"]["application/json"]["schema"],
            json!({ "type": "array", "items": { "$ref": "#/components/schemas/Employee" } })
        );
        assert_eq!(collection["post"]["summary"], "Create a new Employee");
        assert!(collection["post"]["responses"].get("201").is_some());

        let item = &paths["/employees/{pathParam0}"];
        assert_eq!(
            item["get"]["parameters"],
            json!([{
                "in": "path",
                "name": "pathParam0",
                "schema": { "type": "integer" },
                "required": true,
                "description": "ID for Employee"
            }])
        );
        assert_eq!(
            item["x-rest-schema-path"],
            json!([{ "property": "employees" }, { "item": "pathParam0" }])
        );
        for method in ["get", "patch", "put", "delete"] {
            assert!(item.get(method).is_some(), "missing {}", method);
        }
        assert_eq!(
            item["delete"]["responses"],
            json!({ "204": { "description": "No content" } })
        );
    }

    #[test]
    fn root_never_gets_a_path() {
        let schema = json!({
            "$id": "https://example.com/root",
            "title": "Root",
            "type": "object",
            "x-rest-controller": "Root",
            "properties": { "name": { "type": "string" } }
        });
        let surface = synthesize(&schema, "c", "").unwrap();
        assert!(surface.paths().is_empty());
        assert!(surface.schemas().is_empty());
    }

    #[test]
    fn parameters_are_positional_across_nesting() {
        let schema = json!({
            "type": "object",
            "properties": {
                "departments": {
                    "type": "array",
                    "items": {
                        "$id": "department",
                        "title": "Department",
                        "x-rest-controller": "Department",
                        "type": "object",
                        "properties": {
                            "staff": {
                                "type": "array",
                                "items": {
                                    "$id": "employee",
                                    "title": "Employee",
                                    "x-rest-controller": "Employee",
                                    "type": "object",
                                    "properties": { "name": { "type": "string" } }
                                }
                            }
                        }
                    }
                }
            }
        });
        let surface = synthesize(&schema, "c", "/org").unwrap();
        let urls: Vec<&str> = surface.paths().iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "/org/departments",
                "/org/departments/{pathParam0}",
                "/org/departments/{pathParam0}/staff",
                "/org/departments/{pathParam0}/staff/{pathParam1}",
            ]
        );
        let staff = surface.path("/org/departments/{pathParam0}/staff").unwrap();
        assert_eq!(staff.kind, PathKind::Collection);
        assert_eq!(staff.parameters.len(), 1);
        assert_eq!(staff.controller, "Employee");

        let member = surface
            .path("/org/departments/{pathParam0}/staff/{pathParam1}")
            .unwrap();
        let names: Vec<&str> = member.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["pathParam0", "pathParam1"]);
        assert_eq!(
            member.operation(OperationKind::GetItem).unwrap().operation_id,
            "getItem /org/departments/{pathParam0}/staff/{pathParam1}"
        );

        assert_eq!(
            surface.schemas().keys().collect::<Vec<_>>(),
            vec![".org::Department", ".org::Employee"]
        );
    }

    #[test]
    fn compiling_twice_is_identical() {
        let schema = employee_schema();
        let first = synthesize(&schema, "c", "/basic").unwrap().to_openapi();
        let second = synthesize(&schema, "c", "/basic").unwrap().to_openapi();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}

mod multiple_roots {
    use super::*;

    #[test]
    fn duplicate_titles_across_roots_abort() {
        let result = SurfaceBuilder::new("c")
            .add_schema(&employee_schema(), "")
            .and_then(|b| {
                let mut other = employee_schema();
                other["properties"]["staff"] = other["properties"]["employees"].take();
                other["properties"]
                    .as_object_mut()
                    .unwrap()
                    .remove("employees");
                b.add_schema(&other, "")
            });
        assert!(matches!(
            result,
            Err(BuildError::DuplicateTitle { title }) if title == "Employee"
        ));
    }

    #[test]
    fn base_urls_keep_roots_apart() {
        let surface = SurfaceBuilder::new("c")
            .add_schema(&employee_schema(), "/basic")
            .and_then(|b| b.add_schema(&employee_schema(), "/branching"))
            .unwrap()
            .build();
        assert!(surface.path("/basic/employees").is_some());
        assert!(surface.path("/branching/employees").is_some());
        assert!(surface.schema(".basic::Employee").is_some());
        assert!(surface.schema(".branching::Employee").is_some());
    }
}

mod host_document {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plugin_merges_into_document() {
        let mut doc = json!({
            "openapi": "3.0.1",
            "info": { "title": "Employees", "version": "1.0.0" },
            "paths": { "/health": { "get": {} } }
        });
        let mut options = PluginOptions::new();
        options.add_schema(employee_schema(), "/basic");

        let plugin = Plugin::new(&mut doc, &options).unwrap();
        let paths = doc["paths"].as_object().unwrap();
        assert!(paths.contains_key("/health"));
        assert!(paths.contains_key("/basic/employees"));
        assert_eq!(
            doc["paths"]["/basic/employees"]["x-rest-dispatcher"],
            plugin.name()
        );
        assert!(doc["components"]["schemas"].get(".basic::Employee").is_some());
    }

    #[test]
    fn collisions_with_existing_entries_leave_document_untouched() {
        let mut doc = json!({
            "openapi": "3.0.0",
            "paths": {},
            "components": { "schemas": { "Employee": { "type": "object" } } }
        });
        let before = doc.clone();
        let mut options = PluginOptions::new();
        options.add_schema(employee_schema(), "");

        assert!(matches!(
            Plugin::new(&mut doc, &options),
            Err(BuildError::DuplicateTitle { .. })
        ));
        assert_eq!(doc, before);

        let mut doc = json!({ "openapi": "3.1.0", "paths": { "/employees": {} } });
        assert!(matches!(
            Plugin::new(&mut doc, &options),
            Err(BuildError::DuplicatePath { path, .. }) if path == "/employees"
        ));
    }

    #[test]
    fn malformed_host_sections_are_rejected() {
        let mut doc = json!({ "openapi": "3.0.0", "paths": ["/health"] });
        let before = doc.clone();
        let mut options = PluginOptions::new();
        options.add_schema(employee_schema(), "");

        assert!(matches!(
            Plugin::new(&mut doc, &options),
            Err(BuildError::MalformedDocument { location }) if location == "/paths"
        ));
        assert_eq!(doc, before);
    }

    #[test]
    fn build_errors_publish_nothing() {
        let mut doc = json!({ "openapi": "3.0.0" });
        let mut options = PluginOptions::new();
        options.add_schema(employee_schema(), "");
        options.add_schema(json!({ "type": "string" }), "/bad");

        assert!(matches!(
            Plugin::new(&mut doc, &options),
            Err(BuildError::InvalidRootShape)
        ));
        assert_eq!(doc, json!({ "openapi": "3.0.0" }));
    }
}
