//! Host-document integration.
//!
//! A [`Plugin`] checks that the host document is OpenAPI 3.x, compiles every
//! configured schema into one surface under a fresh dispatch entry name and
//! merges the result into the document. [`Plugin::pre_compile`] then
//! registers the entry point with the host's [`ControllerRegistry`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::dispatch::{HandlerSet, JsonSchemaController, ResourceHandler};
use crate::error::{BuildError, LoadError};
use crate::generator::SurfaceBuilder;
use crate::loader::{dereference, load_schema};
use crate::surface::ApiSurface;

/// Supported OpenAPI major version.
const OPENAPI_MAJOR: u64 = 3;

/// One schema root to compile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSource {
    /// Fully dereferenced schema document.
    pub schema: Value,
    /// Path prefix for every path compiled from this root.
    #[serde(default)]
    pub base_url: String,
}

/// Schemas a [`Plugin`] compiles, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginOptions {
    #[serde(default)]
    pub schemas: Vec<SchemaSource>,
}

impl PluginOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an already dereferenced schema.
    pub fn add_schema(&mut self, schema: Value, base_url: impl Into<String>) -> &mut Self {
        self.schemas.push(SchemaSource {
            schema,
            base_url: base_url.into(),
        });
        self
    }

    /// Load a schema file and inline its `$ref`s before adding it.
    ///
    /// # Errors
    ///
    /// Any [`LoadError`] from reading or dereferencing the file.
    pub fn add_schema_file(
        &mut self,
        path: &Path,
        base_url: impl Into<String>,
    ) -> Result<&mut Self, LoadError> {
        let schema = load_schema(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let schema = dereference(&schema, base_dir)?;
        Ok(self.add_schema(schema, base_url))
    }
}

/// Handlers and dispatch entry points known to the host.
#[derive(Default)]
pub struct ControllerRegistry {
    handlers: HandlerSet,
    dispatchers: HashMap<String, Arc<JsonSchemaController>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource handler under the name schemas bind to.
    ///
    /// Handlers must be registered before [`Plugin::pre_compile`]; the
    /// dispatcher takes a snapshot of the set at that point.
    pub fn add_handler(
        &mut self,
        name: impl Into<String>,
        handler: impl ResourceHandler + 'static,
    ) -> &mut Self {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn handler(&self, name: &str) -> Option<&Arc<dyn ResourceHandler>> {
        self.handlers.get(name)
    }

    /// The dispatch entry point registered under `name`.
    pub fn dispatcher(&self, name: &str) -> Option<Arc<JsonSchemaController>> {
        self.dispatchers.get(name).cloned()
    }

    pub fn contains_dispatcher(&self, name: &str) -> bool {
        self.dispatchers.contains_key(name)
    }
}

/// A compiled schema set bound to one host document.
#[derive(Debug)]
pub struct Plugin {
    controller: Arc<JsonSchemaController>,
    surface: ApiSurface,
}

impl Plugin {
    /// Compile `options` and merge the result into `doc`.
    ///
    /// # Errors
    ///
    /// `MissingOpenApiVersion` / `UnsupportedOpenApiVersion` for a host
    /// document that is not OpenAPI 3.x, and any compile or merge error.
    /// The document is left unchanged on error.
    pub fn new(doc: &mut Value, options: &PluginOptions) -> Result<Self, BuildError> {
        Self::with_controller(doc, options, JsonSchemaController::new())
    }

    /// Like [`Plugin::new`], with a fixed dispatch entry name.
    ///
    /// # Errors
    ///
    /// Same as [`Plugin::new`].
    pub fn with_name(
        doc: &mut Value,
        options: &PluginOptions,
        name: impl Into<String>,
    ) -> Result<Self, BuildError> {
        Self::with_controller(doc, options, JsonSchemaController::with_name(name))
    }

    fn with_controller(
        doc: &mut Value,
        options: &PluginOptions,
        controller: JsonSchemaController,
    ) -> Result<Self, BuildError> {
        check_openapi_version(doc)?;

        let mut builder = SurfaceBuilder::new(controller.name());
        for source in &options.schemas {
            builder = builder.add_schema(&source.schema, &source.base_url)?;
        }
        let surface = builder.build();
        surface.merge_into(doc)?;

        info!(
            controller = controller.name(),
            paths = surface.paths().len(),
            schemas = surface.schemas().len(),
            "merged compiled schemas into host document"
        );
        Ok(Self {
            controller: Arc::new(controller),
            surface,
        })
    }

    /// Name of the dispatch entry point, `jsonschema-rest-<n>`.
    pub fn name(&self) -> &str {
        self.controller.name()
    }

    pub fn controller(&self) -> Arc<JsonSchemaController> {
        Arc::clone(&self.controller)
    }

    pub fn surface(&self) -> &ApiSurface {
        &self.surface
    }

    /// Register the dispatch entry point and bind the registry's handlers.
    ///
    /// # Errors
    ///
    /// `DuplicateController` if the name is taken (the registry is left
    /// untouched), `HandlersAlreadyBound` if this plugin was already
    /// registered elsewhere.
    pub fn pre_compile(&self, registry: &mut ControllerRegistry) -> Result<(), BuildError> {
        let name = self.name();
        if registry.contains_dispatcher(name) {
            return Err(BuildError::DuplicateController {
                name: name.to_string(),
            });
        }
        self.controller.bind_handlers(registry.handlers.clone())?;
        registry
            .dispatchers
            .insert(name.to_string(), Arc::clone(&self.controller));
        Ok(())
    }
}

/// Accept `openapi` versions in `>=3.0.0 <4.0.0`.
fn check_openapi_version(doc: &Value) -> Result<(), BuildError> {
    let version = doc
        .get("openapi")
        .filter(|v| !v.is_null())
        .ok_or(BuildError::MissingOpenApiVersion)?;
    let supported = version
        .as_str()
        .and_then(parse_version)
        .is_some_and(|(major, _, _)| major == OPENAPI_MAJOR);
    if supported {
        Ok(())
    } else {
        Err(BuildError::UnsupportedOpenApiVersion {
            version: version
                .as_str()
                .map_or_else(|| version.to_string(), str::to_string),
        })
    }
}

/// Parse a strict `major.minor.patch` version.
fn parse_version(version: &str) -> Option<(u64, u64, u64)> {
    let mut parts = version.split('.').map(str::parse::<u64>);
    let major = parts.next()?.ok()?;
    let minor = parts.next()?.ok()?;
    let patch = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}
