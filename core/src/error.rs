//! Error types for the warehouse API client.
//!
//! # Design
//! Callers only ever observe one error kind, `ApiError`. The taxonomy
//! (unsupported method, bad payload, HTTP failure, parse failure, registry
//! misconfiguration, logical failure, unexpected failure) is carried in the
//! message, the optional HTTP status and the optional machine-readable code.
//! `ValidationError` and `TransportError` are internal details that the
//! client converts into the generic `ApiError` before returning.

use thiserror::Error;

use crate::http::HttpMethod;

/// User-facing message of the catch-all error.
pub const GENERIC_ERROR_MESSAGE: &str =
    "Unexpected error: invalid response from server, try again later";

pub mod codes {
    pub const UNSUPPORTED_METHOD: &str = "UNSUPPORTED_METHOD";
    pub const INVALID_PAYLOAD: &str = "INVALID_PAYLOAD";
    pub const MISSING_BODY: &str = "MISSING_BODY";
    pub const HTTP_ERROR: &str = "HTTP_ERROR";
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const SCHEMA_NOT_DEFINED: &str = "SCHEMA_NOT_DEFINED";
    pub const INVALID_REGISTRY: &str = "INVALID_REGISTRY";
    pub const TIMEOUT: &str = "TIMEOUT";
}

/// The single error kind returned by `ApiClient`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    status: Option<u16>,
    code: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn is_generic(&self) -> bool {
        self.message == GENERIC_ERROR_MESSAGE && self.status.is_none()
    }

    pub(crate) fn unsupported_method(method: &str) -> Self {
        Self::new(format!("Unsupported HTTP method: {method}")).with_code(codes::UNSUPPORTED_METHOD)
    }

    pub(crate) fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(message).with_code(codes::INVALID_PAYLOAD)
    }

    pub(crate) fn missing_body(method: HttpMethod) -> Self {
        Self::new(format!("{method} requires body")).with_code(codes::MISSING_BODY)
    }

    pub(crate) fn http(message: impl Into<String>, status: u16) -> Self {
        Self::new(message).with_status(status).with_code(codes::HTTP_ERROR)
    }

    pub(crate) fn parse(detail: impl std::fmt::Display) -> Self {
        Self::new(format!("Failed to parse response JSON: {detail}"))
            .with_status(500)
            .with_code(codes::PARSE_ERROR)
    }

    pub(crate) fn schema_not_defined(method: HttpMethod) -> Self {
        Self::new(format!("No schema defined for HTTP method {method}"))
            .with_status(500)
            .with_code(codes::SCHEMA_NOT_DEFINED)
    }

    pub(crate) fn invalid_registry(message: impl Into<String>) -> Self {
        Self::new(message).with_code(codes::INVALID_REGISTRY)
    }

    /// The opaque catch-all error. Carries no status.
    pub fn generic() -> Self {
        Self::new(GENERIC_ERROR_MESSAGE)
    }

    pub(crate) fn timeout() -> Self {
        Self::generic().with_code(codes::TIMEOUT)
    }
}

/// A JSON value did not match a declared shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("value does not match `{shape}`: {reason}")]
pub struct ValidationError {
    pub shape: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(shape: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            shape: shape.into(),
            reason: reason.into(),
        }
    }
}

/// The transport could not complete the round-trip.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("failed to read request body stream: {0}")]
    Body(#[from] std::io::Error),

    #[error("transport task failed: {0}")]
    Task(String),

    #[error("response body exceeds the {limit} byte limit")]
    BodyTooLarge { limit: u64 },
}

/// Invalid environment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be an http(s) URL, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },
}
