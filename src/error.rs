//! Error types for schema compilation, loading and request dispatch.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while compiling a schema into an API surface.
///
/// All of these abort the build; nothing compiled before the failure is kept.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("root schema must have object type and have properties")]
    InvalidRootShape,

    #[error("missing title in schema: {schema}")]
    MissingTitle { schema: String },

    #[error("duplicate schema with title {title}")]
    DuplicateTitle { title: String },

    #[error("schema {title} is missing x-rest-controller")]
    MissingControllerBinding { title: String },

    #[error("duplicate path {path} found for schema {title}")]
    DuplicatePath { path: String, title: String },

    #[error("invalid x-rest-blank-object for schema {title}: {source}")]
    InvalidBlankObject {
        title: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("OpenAPI definition is missing 'openapi' field")]
    MissingOpenApiVersion,

    #[error("OpenAPI version {version} not supported")]
    UnsupportedOpenApiVersion { version: String },

    #[error("OpenAPI definition has a non-object value at {location}")]
    MalformedDocument { location: String },

    #[error("controller already added with name {name}")]
    DuplicateController { name: String },

    #[error("controller {name} was already initialized")]
    HandlersAlreadyBound { name: String },
}

impl BuildError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while loading or dereferencing schema documents.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("cannot dereference {reference}: {message}")]
    RefError { reference: String, message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Error reported by a resource handler implementation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HandlerError {
    /// HTTP status to report to the client.
    pub status: u16,
    pub message: String,
}

impl HandlerError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// A handler failure with status 500.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// The handler declared a method but left the default body in place.
    pub fn not_implemented(method: &str) -> Self {
        Self::internal(format!("{} declared but not implemented", method))
    }
}

/// Errors surfaced to clients while dispatching a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("controller {name} has not been initialized")]
    Uninitialized { name: String },

    #[error("{controller} controller not implemented")]
    UnknownController { controller: String },

    #[error("{method} not implemented in {controller} controller")]
    MethodNotImplemented { method: String, controller: String },

    #[error("formatResponse not implemented in {controller} controller")]
    FormatResponseMissing { controller: String },

    #[error("missing path parameter {name}")]
    MissingParameter { name: String },

    #[error("path parameter {name} must be an integer, got \"{value}\"")]
    InvalidParameter { name: String, value: String },

    #[error("Not found")]
    NotFound,

    #[error("find must return an array")]
    FindNotSequence,

    #[error("invalid blank object: {source}")]
    InvalidBlankObject {
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl DispatchError {
    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::UnknownController { .. }
            | DispatchError::MethodNotImplemented { .. }
            | DispatchError::FormatResponseMissing { .. }
            | DispatchError::MissingParameter { .. }
            | DispatchError::InvalidParameter { .. } => 400,
            DispatchError::NotFound => 404,
            DispatchError::Uninitialized { .. }
            | DispatchError::FindNotSequence
            | DispatchError::InvalidBlankObject { .. } => 500,
            DispatchError::Handler(e) => e.status,
        }
    }
}
