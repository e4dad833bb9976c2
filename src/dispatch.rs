//! Runtime dispatch of compiled paths to resource handlers.
//!
//! A [`JsonSchemaController`] is the single entry point every compiled path
//! names in `x-rest-dispatcher`. For each request it looks up the handler
//! bound to the path's `x-rest-controller`, resolves the object path from the
//! path template, seeds create/replace bodies from the blank instance and
//! calls the handler. It holds no per-request state, so one controller serves
//! any number of concurrent requests.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{BuildError, DispatchError, HandlerError};
use crate::surface::ResourcePath;
use crate::types::{BLANK_OBJECT_KEY, CONTROLLER_KEY, PATH_TEMPLATE_KEY};

/// Prefix of generated dispatch entry names.
pub const CONTROLLER_BASE_NAME: &str = "jsonschema-rest-";

static CONTROLLER_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Handlers keyed by the name schemas bind to with `x-rest-controller`.
pub type HandlerSet = HashMap<String, Arc<dyn ResourceHandler>>;

/// Methods a [`ResourceHandler`] can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerMethod {
    Get,
    Update,
    Remove,
    Create,
    Find,
    CallOperation,
    FormatResponse,
}

impl HandlerMethod {
    pub fn name(&self) -> &'static str {
        match self {
            HandlerMethod::Get => "get",
            HandlerMethod::Update => "update",
            HandlerMethod::Remove => "remove",
            HandlerMethod::Create => "create",
            HandlerMethod::Find => "find",
            HandlerMethod::CallOperation => "callOperation",
            HandlerMethod::FormatResponse => "formatResponse",
        }
    }
}

impl fmt::Display for HandlerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage and business logic behind one kind of resource.
///
/// Only the methods listed by [`methods`](Self::methods) are ever called.
/// Returning `Ok(None)` or `Ok(Some(Value::Null))` from a lookup means the
/// resource does not exist and is reported as 404.
pub trait ResourceHandler: Send + Sync {
    /// Methods this handler implements.
    fn methods(&self) -> &[HandlerMethod];

    fn get(&self, ctx: &RequestContext) -> Result<Option<Value>, HandlerError> {
        let _ = ctx;
        Err(HandlerError::not_implemented("get"))
    }

    fn update(&self, ctx: &RequestContext) -> Result<Option<Value>, HandlerError> {
        let _ = ctx;
        Err(HandlerError::not_implemented("update"))
    }

    fn remove(&self, ctx: &RequestContext) -> Result<Option<Value>, HandlerError> {
        let _ = ctx;
        Err(HandlerError::not_implemented("remove"))
    }

    fn create(&self, ctx: &RequestContext) -> Result<Option<Value>, HandlerError> {
        let _ = ctx;
        Err(HandlerError::not_implemented("create"))
    }

    /// List a collection. Anything but an array is a contract violation.
    fn find(&self, ctx: &RequestContext) -> Result<Option<Value>, HandlerError> {
        let _ = ctx;
        Err(HandlerError::not_implemented("find"))
    }

    fn call_operation(&self, ctx: &RequestContext) -> Result<Option<Value>, HandlerError> {
        let _ = ctx;
        Err(HandlerError::not_implemented("callOperation"))
    }

    /// Turn a stored item into its response representation.
    fn format_response(&self, ctx: &RequestContext, item: Value) -> Result<Value, HandlerError> {
        let _ = (ctx, item);
        Err(HandlerError::not_implemented("formatResponse"))
    }
}

/// One resolved step of an [`ObjectPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectPathSegment {
    /// A literal template segment.
    Property(String),
    /// The value of an integer path parameter.
    Identifier(i64),
}

/// Path template segments with parameters replaced by request values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPath(Vec<ObjectPathSegment>);

impl ObjectPath {
    /// Resolve `template` against the request's path parameters.
    ///
    /// # Errors
    ///
    /// `MissingParameter` or `InvalidParameter` when a placeholder has no
    /// integer value.
    pub fn resolve(
        template: &str,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatchError> {
        template
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let Some(name) = segment
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                else {
                    return Ok(ObjectPathSegment::Property(segment.to_string()));
                };
                let raw = params
                    .get(name)
                    .ok_or_else(|| DispatchError::MissingParameter {
                        name: name.to_string(),
                    })?;
                raw.parse::<i64>()
                    .map(ObjectPathSegment::Identifier)
                    .map_err(|_| DispatchError::InvalidParameter {
                        name: name.to_string(),
                        value: raw.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ObjectPath)
    }

    pub fn segments(&self) -> &[ObjectPathSegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The innermost identifier, i.e. the id of the addressed resource.
    pub fn last_identifier(&self) -> Option<i64> {
        self.0.iter().rev().find_map(|segment| match segment {
            ObjectPathSegment::Identifier(id) => Some(*id),
            ObjectPathSegment::Property(_) => None,
        })
    }
}

/// Per-request input handed to handlers.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Raw path parameter values as matched by the router.
    pub path_params: HashMap<String, String>,
    /// Request body. For create, replace and custom operations this is the
    /// body merged onto the blank instance by the time a handler sees it.
    pub body: Option<Value>,
    /// Filled in by the controller before the handler is called.
    pub object_path: ObjectPath,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// What dispatch needs to know about the matched route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteBinding {
    pub controller: String,
    pub template: String,
    pub blank_object: Option<String>,
}

impl RouteBinding {
    /// Read the binding from a host document's path item and operation.
    ///
    /// The operation's `x-rest-controller` and `x-rest-blank-object` take
    /// precedence over the path item's.
    pub fn from_openapi(path_item: &Value, operation: &Value) -> Self {
        let lookup = |key: &str| {
            operation
                .get(key)
                .and_then(Value::as_str)
                .or_else(|| path_item.get(key).and_then(Value::as_str))
        };
        Self {
            controller: lookup(CONTROLLER_KEY).unwrap_or_default().to_string(),
            template: path_item
                .get(PATH_TEMPLATE_KEY)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            blank_object: lookup(BLANK_OBJECT_KEY).map(str::to_string),
        }
    }
}

impl From<&ResourcePath> for RouteBinding {
    fn from(path: &ResourcePath) -> Self {
        Self {
            controller: path.controller.clone(),
            template: path.template.clone(),
            blank_object: Some(path.blank_object.clone()),
        }
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl DispatchResponse {
    fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }
}

/// Dispatch entry point shared by every path of a compiled surface.
pub struct JsonSchemaController {
    name: String,
    handlers: OnceLock<HandlerSet>,
}

impl fmt::Debug for JsonSchemaController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaController")
            .field("name", &self.name)
            .field("initialized", &self.handlers.get().is_some())
            .finish()
    }
}

impl Default for JsonSchemaController {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonSchemaController {
    /// Create a controller with a process-unique name.
    pub fn new() -> Self {
        let n = CONTROLLER_COUNT.fetch_add(1, Ordering::Relaxed);
        Self::with_name(format!("{}{}", CONTROLLER_BASE_NAME, n))
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind the handler set. Can only happen once.
    ///
    /// # Errors
    ///
    /// `HandlersAlreadyBound` on a second call.
    pub fn bind_handlers(&self, handlers: HandlerSet) -> Result<(), BuildError> {
        self.handlers
            .set(handlers)
            .map_err(|_| BuildError::HandlersAlreadyBound {
                name: self.name.clone(),
            })
    }

    pub fn get_item(
        &self,
        route: &RouteBinding,
        ctx: RequestContext,
    ) -> Result<DispatchResponse, DispatchError> {
        self.logged("getItem", || {
            let (handler, ctx) = self.prepare(route, HandlerMethod::Get, ctx, false)?;
            let item = found(handler.get(&ctx)?)?;
            Ok(DispatchResponse::ok(handler.format_response(&ctx, item)?))
        })
    }

    pub fn patch_item(
        &self,
        route: &RouteBinding,
        ctx: RequestContext,
    ) -> Result<DispatchResponse, DispatchError> {
        self.logged("patchItem", || {
            let (handler, ctx) = self.prepare(route, HandlerMethod::Update, ctx, false)?;
            let item = found(handler.update(&ctx)?)?;
            Ok(DispatchResponse::ok(handler.format_response(&ctx, item)?))
        })
    }

    /// Replace: like patch, but the body is seeded with the blank instance.
    pub fn put_item(
        &self,
        route: &RouteBinding,
        ctx: RequestContext,
    ) -> Result<DispatchResponse, DispatchError> {
        self.logged("putItem", || {
            let (handler, ctx) = self.prepare(route, HandlerMethod::Update, ctx, true)?;
            let item = found(handler.update(&ctx)?)?;
            Ok(DispatchResponse::ok(handler.format_response(&ctx, item)?))
        })
    }

    pub fn delete_item(
        &self,
        route: &RouteBinding,
        ctx: RequestContext,
    ) -> Result<DispatchResponse, DispatchError> {
        self.logged("deleteItem", || {
            let (handler, ctx) = self.prepare(route, HandlerMethod::Remove, ctx, false)?;
            found(handler.remove(&ctx)?)?;
            Ok(DispatchResponse {
                status: 204,
                body: None,
            })
        })
    }

    pub fn get_items(
        &self,
        route: &RouteBinding,
        ctx: RequestContext,
    ) -> Result<DispatchResponse, DispatchError> {
        self.logged("getItems", || {
            let (handler, ctx) = self.prepare(route, HandlerMethod::Find, ctx, false)?;
            let Value::Array(items) = found(handler.find(&ctx)?)? else {
                return Err(DispatchError::FindNotSequence);
            };
            let formatted = items
                .into_iter()
                .map(|item| handler.format_response(&ctx, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DispatchResponse::ok(Value::Array(formatted)))
        })
    }

    pub fn post_items(
        &self,
        route: &RouteBinding,
        ctx: RequestContext,
    ) -> Result<DispatchResponse, DispatchError> {
        self.logged("postItems", || {
            let (handler, ctx) = self.prepare(route, HandlerMethod::Create, ctx, true)?;
            let item = found(handler.create(&ctx)?)?;
            Ok(DispatchResponse {
                status: 201,
                body: Some(handler.format_response(&ctx, item)?),
            })
        })
    }

    /// Custom operation declared on a host document path.
    pub fn call_operation(
        &self,
        route: &RouteBinding,
        ctx: RequestContext,
    ) -> Result<DispatchResponse, DispatchError> {
        self.logged("callOperation", || {
            let (handler, ctx) = self.prepare(route, HandlerMethod::CallOperation, ctx, true)?;
            let item = found(handler.call_operation(&ctx)?)?;
            Ok(DispatchResponse::ok(handler.format_response(&ctx, item)?))
        })
    }

    /// Look up the handler and build the context it will see.
    fn prepare(
        &self,
        route: &RouteBinding,
        method: HandlerMethod,
        mut ctx: RequestContext,
        seed: bool,
    ) -> Result<(Arc<dyn ResourceHandler>, RequestContext), DispatchError> {
        let handler = self.handler(&route.controller, method)?;
        ctx.object_path = ObjectPath::resolve(&route.template, &ctx.path_params)?;
        if seed {
            let blank = route.blank_object.as_deref().unwrap_or("{}");
            ctx.body = Some(seed_body(blank, ctx.body.take())?);
        }
        Ok((handler, ctx))
    }

    fn handler(
        &self,
        controller: &str,
        method: HandlerMethod,
    ) -> Result<Arc<dyn ResourceHandler>, DispatchError> {
        let handlers = self
            .handlers
            .get()
            .ok_or_else(|| DispatchError::Uninitialized {
                name: self.name.clone(),
            })?;
        let handler = handlers
            .get(controller)
            .ok_or_else(|| DispatchError::UnknownController {
                controller: controller.to_string(),
            })?;
        let methods = handler.methods();
        if !methods.contains(&method) {
            return Err(DispatchError::MethodNotImplemented {
                method: method.name().to_string(),
                controller: controller.to_string(),
            });
        }
        if !methods.contains(&HandlerMethod::FormatResponse) {
            return Err(DispatchError::FormatResponseMissing {
                controller: controller.to_string(),
            });
        }
        Ok(Arc::clone(handler))
    }

    fn logged(
        &self,
        operation: &str,
        run: impl FnOnce() -> Result<DispatchResponse, DispatchError>,
    ) -> Result<DispatchResponse, DispatchError> {
        let result = run();
        match &result {
            Ok(response) => {
                debug!(controller = %self.name, operation, status = response.status, "dispatched")
            }
            Err(e) => warn!(
                controller = %self.name,
                operation,
                status = e.status(),
                error = %e,
                "dispatch failed"
            ),
        }
        result
    }
}

/// A handler result that names an existing resource.
fn found(item: Option<Value>) -> Result<Value, DispatchError> {
    match item {
        None | Some(Value::Null) => Err(DispatchError::NotFound),
        Some(item) => Ok(item),
    }
}

/// Shallow-merge `body` onto the parsed blank instance. Body keys win.
fn seed_body(blank: &str, body: Option<Value>) -> Result<Value, DispatchError> {
    let seed: Value =
        serde_json::from_str(blank).map_err(|source| DispatchError::InvalidBlankObject { source })?;
    Ok(match (seed, body) {
        (Value::Object(mut seed), Some(Value::Object(body))) => {
            seed.extend(body);
            Value::Object(seed)
        }
        (_, Some(body)) => body,
        (seed, None) => seed,
    })
}
