//! Typed API client core for the warehouse backend.
//!
//! # Overview
//! Performs one HTTP round-trip per call and returns the `data` of the
//! server's `{"success": .., "data" | "message": ..}` envelope, validated
//! against the output shape a `SchemaRegistry` declares for the method.
//!
//! # Design
//! - `ApiClient::build_request` enforces the per-method payload rules and
//!   produces an `HttpRequest` without touching the network;
//!   `ApiClient::parse_response` consumes an `HttpResponse`. `request` runs
//!   both around a `Transport` call with a timeout.
//! - Callers only ever see `ApiError`, distinguished by message, status and
//!   code.
//! - Envelope validators are memoized per output shape in `SchemaCache`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod outcome;
pub mod registry;
pub mod schema;
pub mod transport;
pub mod types;

pub use client::{ApiClient, FormEncoder, Payload, RequestOptions};
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, TransportError, ValidationError};
pub use http::{
    BodyStream, Credentials, FormData, FormPart, FormValue, HttpMethod, HttpRequest, HttpResponse,
    RequestBody,
};
pub use outcome::{attempt, attempt_async};
pub use registry::{Descriptor, SchemaRegistry, SchemaRegistryBuilder};
pub use schema::{Envelope, EnvelopeShape, SchemaCache, Shape};
pub use transport::{Transport, UreqTransport};
pub use types::{
    CreateRack, CreateWarehouse, ImportRejection, ImportSummary, OccupancyStats, Rack, UpdateRack,
    Warehouse, WarehouseOccupancy,
};
