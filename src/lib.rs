//! JSON Schema to REST compiler
//!
//! Compiles a JSON Schema document into a REST resource surface: OpenAPI
//! paths with CRUD operations, component schemas for every identified
//! resource, and a blank instance per path that seeds create and replace
//! bodies. A small dispatch layer routes requests on the compiled paths to
//! pluggable resource handlers.
//!
//! # Example
//!
//! ```
//! use jsonschema_rest::synthesize;
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "employees": {
//!             "type": "array",
//!             "items": {
//!                 "$id": "https://example.com/employee",
//!                 "title": "Employee",
//!                 "type": "object",
//!                 "x-rest-controller": "Employee",
//!                 "properties": {
//!                     "firstName": { "type": "string" },
//!                     "age": { "type": "integer", "default": 37 }
//!                 }
//!             }
//!         }
//!     }
//! });
//!
//! let surface = synthesize(&schema, "jsonschema-rest-0", "/basic").unwrap();
//!
//! // Collection and item paths for the array of identified objects
//! let item = surface.path("/basic/employees/{pathParam0}").unwrap();
//! assert_eq!(item.blank_object, r#"{"firstName":null,"age":37}"#);
//! assert!(surface.path("/basic/employees").is_some());
//!
//! // Catalog names are namespaced by base URL
//! assert!(surface.schema(".basic::Employee").is_some());
//! ```
//!
//! # Node Classification
//!
//! | Node | Result |
//! |------|--------|
//! | root | namespace only, never a path |
//! | array property whose `items` has `$id` | collection path + item path with a new `{pathParamN}` |
//! | object property with `$id` | catalog entry + item path |
//! | object property without `$id` | inline; its properties are still searched |
//! | anything else | inline field |
//!
//! # Extension Keywords
//!
//! | Keyword | Where | Meaning |
//! |---------|-------|---------|
//! | `x-rest-controller` | schema, path item, operation | handler key the resource is bound to |
//! | `x-rest-blank-object` | schema, path item, operation | serialized blank instance override |
//! | `x-rest-dispatcher` | path item | dispatch entry point name |
//! | `x-rest-path-template` | path item | template used to build the object path |

mod blank;
mod component;
mod config;
mod dispatch;
mod error;
mod generator;
mod loader;
mod plugin;
mod surface;
mod types;
pub mod walker;

pub use blank::blank_object;
pub use component::{to_component, uri_reference};
pub use config::{BuildConfig, SchemaEntry};
pub use dispatch::{
    DispatchResponse, HandlerMethod, HandlerSet, JsonSchemaController, ObjectPath,
    ObjectPathSegment, RequestContext, ResourceHandler, RouteBinding, CONTROLLER_BASE_NAME,
};
pub use error::{BuildError, DispatchError, HandlerError, LoadError};
pub use generator::{synthesize, SurfaceBuilder};
pub use loader::{
    check_schema, dereference, is_url, load_schema, load_schema_auto, load_schema_str,
    navigate_fragment,
};
pub use plugin::{ControllerRegistry, Plugin, PluginOptions, SchemaSource};
pub use surface::{ApiSurface, Operation, PathKind, Payload, ResourcePath};
pub use types::{
    OperationKind, PathParameter, SchemaStep, TypeRef, BLANK_OBJECT_KEY, CONTROLLER_KEY,
    DISPATCHER_KEY, PATH_BASE_KEY, PATH_TEMPLATE_KEY, SCHEMA_PATH_KEY,
};

#[cfg(feature = "remote")]
pub use loader::load_schema_url;
