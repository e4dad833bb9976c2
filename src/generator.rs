//! Resource-tree synthesis: schema roots in, [`ApiSurface`] out.
//!
//! The walk classifies every node as a collection, an item or an inline
//! field. Collections are array-valued properties whose items carry an `$id`;
//! they get a list/create path and an item path one parameter deeper. Items
//! are identified object-valued nodes; they get a catalog entry and a
//! get/modify/replace/delete path. The root is a pure namespace and never
//! gets a path of its own.

use serde_json::Value;
use tracing::{debug, info};

use crate::blank::blank_object;
use crate::component::to_component;
use crate::error::BuildError;
use crate::surface::{ApiSurface, Operation, PathKind, Payload, ResourcePath};
use crate::types::{
    has_identifier, has_properties, is_array, is_object_like, is_object_shaped, is_read_only, title,
    OperationKind, PathParameter, SchemaStep, TypeRef, BLANK_OBJECT_KEY, CONTROLLER_KEY,
};

/// Compile a single schema root.
///
/// Shorthand for a [`SurfaceBuilder`] with one root.
///
/// # Errors
///
/// Returns the first [`BuildError`] hit during the walk.
///
/// # Example
///
/// ```
/// use jsonschema_rest::synthesize;
/// use serde_json::json;
///
/// let schema = json!({
///     "type": "object",
///     "properties": {
///         "employees": {
///             "type": "array",
///             "items": {
///                 "$id": "https://example.com/employee",
///                 "title": "Employee",
///                 "type": "object",
///                 "x-rest-controller": "Employee",
///                 "properties": { "name": { "type": "string" } }
///             }
///         }
///     }
/// });
///
/// let surface = synthesize(&schema, "jsonschema-rest-0", "").unwrap();
/// assert!(surface.path("/employees").is_some());
/// assert!(surface.path("/employees/{pathParam0}").is_some());
/// ```
pub fn synthesize(
    schema: &Value,
    controller: &str,
    base_url: &str,
) -> Result<ApiSurface, BuildError> {
    SurfaceBuilder::new(controller)
        .add_schema(schema, base_url)
        .map(SurfaceBuilder::build)
}

/// Accumulates several schema roots into one surface.
///
/// Each [`add_schema`](Self::add_schema) consumes the builder, so a failing
/// root drops everything compiled so far.
#[derive(Debug)]
pub struct SurfaceBuilder {
    surface: ApiSurface,
}

impl SurfaceBuilder {
    /// Start a surface whose paths dispatch through `controller`.
    pub fn new(controller: impl Into<String>) -> Self {
        Self {
            surface: ApiSurface::new(controller),
        }
    }

    /// Compile one root under `base_url` (may be empty).
    ///
    /// # Errors
    ///
    /// `InvalidRootShape` if the root is not an object schema with
    /// properties; otherwise the first title, path or binding error found.
    pub fn add_schema(mut self, schema: &Value, base_url: &str) -> Result<Self, BuildError> {
        if !is_object_shaped(schema) || !has_properties(schema) {
            return Err(BuildError::InvalidRootShape);
        }

        let before = self.surface.paths.len();
        let mut generator = PathGenerator {
            surface: &mut self.surface,
            base_url,
            namespace: base_url.replace('/', "."),
        };
        generator.visit(&Context::default(), schema, Mode::Item, true)?;

        info!(
            base_url,
            paths = self.surface.paths.len() - before,
            "compiled schema root"
        );
        Ok(self)
    }

    pub fn build(self) -> ApiSurface {
        self.surface
    }
}

/// Position reached by the walk. Each step derives a new context.
#[derive(Debug, Clone, Default)]
struct Context {
    url_path: String,
    parameters: Vec<PathParameter>,
    schema_path: Vec<SchemaStep>,
}

impl Context {
    /// Descend into a named property.
    fn with_segment(&self, name: &str) -> Context {
        let mut next = self.clone();
        next.url_path = format!("{}/{}", self.url_path, name);
        next.schema_path.push(SchemaStep::Property(name.to_string()));
        next
    }

    /// Descend into one member of a collection.
    fn with_parameter(&self, item_title: Option<&str>) -> Context {
        let param = PathParameter::positional(self.parameters.len(), item_title);
        let mut next = self.clone();
        next.url_path = format!("{}/{}", self.url_path, param.placeholder());
        next.schema_path.push(SchemaStep::Item(param.name.clone()));
        next.parameters.push(param);
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Collection,
    Item,
}

struct PathGenerator<'a> {
    surface: &'a mut ApiSurface,
    base_url: &'a str,
    namespace: String,
}

impl PathGenerator<'_> {
    fn visit(
        &mut self,
        ctx: &Context,
        schema: &Value,
        mode: Mode,
        suppress: bool,
    ) -> Result<(), BuildError> {
        match mode {
            Mode::Collection => {
                if !suppress {
                    self.add_path(ctx, schema, PathKind::Collection)?;
                }
                let member = ctx.with_parameter(title(schema));
                self.visit(&member, schema, Mode::Item, !has_identifier(schema))
            }
            Mode::Item => {
                if !suppress {
                    if has_identifier(schema) {
                        self.add_definition(schema)?;
                    }
                    self.add_path(ctx, schema, PathKind::Item)?;
                }
                let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                    return Ok(());
                };
                for (name, property) in properties {
                    let nested = ctx.with_segment(name);
                    match property.get("items") {
                        Some(items) if is_array(property) && items.is_object() => {
                            self.visit(&nested, items, Mode::Collection, !has_identifier(items))?;
                        }
                        _ if is_object_like(property) => {
                            self.visit(&nested, property, Mode::Item, !has_identifier(property))?;
                        }
                        _ => {}
                    }
                }
                Ok(())
            }
        }
    }

    /// Catalog name: the title, prefixed by the namespace when there is one.
    fn schema_name(&self, schema: &Value) -> Result<String, BuildError> {
        let title = title(schema).ok_or_else(|| BuildError::MissingTitle {
            schema: schema.to_string(),
        })?;
        if self.namespace.is_empty() {
            Ok(title.to_string())
        } else {
            Ok(format!("{}::{}", self.namespace, title))
        }
    }

    fn add_definition(&mut self, schema: &Value) -> Result<(), BuildError> {
        let name = self.schema_name(schema)?;
        if self.surface.schemas.contains_key(&name) {
            return Err(BuildError::DuplicateTitle { title: name });
        }
        debug!(schema = %name, "added catalog entry");
        self.surface.schemas.insert(name, to_component(schema));
        Ok(())
    }

    fn add_path(&mut self, ctx: &Context, schema: &Value, kind: PathKind) -> Result<(), BuildError> {
        let display = title(schema).unwrap_or("item");
        let controller = schema
            .get(CONTROLLER_KEY)
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| BuildError::MissingControllerBinding {
                title: display.to_string(),
            })?;

        let url = match format!("{}{}", self.base_url, ctx.url_path) {
            url if url.is_empty() => "/".to_string(),
            url => url,
        };
        if self.surface.contains_path(&url) {
            return Err(BuildError::DuplicatePath {
                path: url,
                title: display.to_string(),
            });
        }
        let name = self.schema_name(schema)?;
        let blank_object = blank_instance(schema, display)?;

        let operations = match kind {
            PathKind::Item => item_operations(schema, display, &name, &url),
            PathKind::Collection => collection_operations(schema, display, &name, &url),
        };

        debug!(path = %url, controller, ?kind, "added path");
        self.surface.paths.push(ResourcePath {
            url,
            base_url: self.base_url.to_string(),
            template: if ctx.url_path.is_empty() {
                "/".to_string()
            } else {
                ctx.url_path.clone()
            },
            kind,
            parameters: ctx.parameters.clone(),
            schema_path: ctx.schema_path.clone(),
            controller: controller.to_string(),
            dispatcher: self.surface.dispatcher.clone(),
            blank_object,
            operations,
        });
        Ok(())
    }
}

/// Serialized blank instance, or the schema's own override.
fn blank_instance(schema: &Value, display: &str) -> Result<String, BuildError> {
    match schema.get(BLANK_OBJECT_KEY) {
        Some(Value::String(raw)) => {
            serde_json::from_str::<Value>(raw).map_err(|source| {
                BuildError::InvalidBlankObject {
                    title: display.to_string(),
                    source,
                }
            })?;
            Ok(raw.clone())
        }
        Some(value) => Ok(value.to_string()),
        None => Ok(blank_object(schema).to_string()),
    }
}

fn payload(description: String, schema: Option<TypeRef>) -> Payload {
    Payload {
        description,
        schema,
    }
}

fn operation(
    kind: OperationKind,
    url: &str,
    summary: String,
    request_body: Option<Payload>,
    status: u16,
    response: Payload,
) -> Operation {
    Operation {
        kind,
        summary,
        operation_id: format!("{} {}", kind.operation_name(), url),
        request_body,
        status,
        response,
    }
}

fn item_operations(schema: &Value, title: &str, name: &str, url: &str) -> Vec<Operation> {
    let single = || Some(TypeRef::Schema(name.to_string()));
    let mut ops = vec![
        operation(
            OperationKind::GetItem,
            url,
            format!("Gets a single {}", title),
            None,
            200,
            payload(format!("The {}", title), single()),
        ),
        operation(
            OperationKind::PatchItem,
            url,
            format!("Modify a {}", title),
            Some(payload(format!("The modified {} values", title), single())),
            200,
            payload(format!("The modified {}", title), single()),
        ),
        operation(
            OperationKind::PutItem,
            url,
            format!("Replace a {}", title),
            Some(payload(
                format!("The new {} to replace this one", title),
                single(),
            )),
            200,
            payload(format!("The replaced {}", title), single()),
        ),
    ];
    if !is_read_only(schema) {
        ops.push(operation(
            OperationKind::DeleteItem,
            url,
            format!("Delete a {}", title),
            None,
            204,
            payload("No content".to_string(), None),
        ));
    }
    ops
}

fn collection_operations(schema: &Value, title: &str, name: &str, url: &str) -> Vec<Operation> {
    let mut ops = vec![operation(
        OperationKind::GetItems,
        url,
        format!("Gets a list of {}", title),
        None,
        200,
        payload(
            format!("The list of {}", title),
            Some(TypeRef::ArrayOf(name.to_string())),
        ),
    )];
    if !is_read_only(schema) {
        ops.push(operation(
            OperationKind::PostItems,
            url,
            format!("Create a new {}", title),
            Some(payload(
                format!("The new {} to be created", title),
                Some(TypeRef::Schema(name.to_string())),
            )),
            201,
            payload(
                format!("The new {}", title),
                Some(TypeRef::Schema(name.to_string())),
            ),
        ));
    }
    ops
}
