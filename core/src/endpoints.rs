//! Schema registries for the warehouse backend.
//!
//! Each registry is built once per process, so the schema cache holds one
//! envelope per declared output shape no matter how many calls are made.

use std::sync::OnceLock;

use serde_json::Value;
use uuid::Uuid;

use crate::registry::{Descriptor, SchemaRegistry};
use crate::schema::Shape;
use crate::types::{
    CreateRack, CreateWarehouse, ImportSummary, OccupancyStats, Rack, UpdateRack, Warehouse,
};

pub const WAREHOUSES: &str = "/warehouses";
pub const RACKS: &str = "/racks";
pub const RACK_IMPORT: &str = "/racks/import";
pub const DASHBOARD_STATS: &str = "/dashboard/stats";

pub fn warehouse_path(id: Uuid) -> String {
    format!("{WAREHOUSES}/{id}")
}

pub fn rack_path(id: Uuid) -> String {
    format!("{RACKS}/{id}")
}

/// `GET` list and `POST` create on `/warehouses`.
pub fn warehouses() -> &'static SchemaRegistry {
    static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        SchemaRegistry::builder()
            .get(Descriptor::output(Shape::of::<Vec<Warehouse>>()))
            .post(Descriptor::new(
                Shape::of::<CreateWarehouse>(),
                Shape::of::<Warehouse>(),
            ))
            .build()
    })
}

/// `GET`, `PUT` and `DELETE` on `/warehouses/{id}`.
pub fn warehouse() -> &'static SchemaRegistry {
    static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let warehouse = Shape::of::<Warehouse>();
        SchemaRegistry::builder()
            .get(Descriptor::output(warehouse.clone()))
            .put(Descriptor::new(Shape::of::<CreateWarehouse>(), warehouse))
            .delete(Descriptor::output(Shape::of::<Value>()))
            .build()
    })
}

/// `GET` list and `POST` create on `/racks`.
pub fn racks() -> &'static SchemaRegistry {
    static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        SchemaRegistry::builder()
            .get(Descriptor::output(Shape::of::<Vec<Rack>>()))
            .post(Descriptor::new(Shape::of::<CreateRack>(), Shape::of::<Rack>()))
            .build()
    })
}

/// `GET`, `PATCH` and `DELETE` on `/racks/{id}`.
pub fn rack() -> &'static SchemaRegistry {
    static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let rack = Shape::of::<Rack>();
        SchemaRegistry::builder()
            .get(Descriptor::output(rack.clone()))
            .patch(Descriptor::new(Shape::of::<UpdateRack>(), rack))
            .delete(Descriptor::output(Shape::of::<Value>()))
            .build()
    })
}

/// Multipart CSV upload on `/racks/import`.
pub fn rack_import() -> &'static SchemaRegistry {
    static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        SchemaRegistry::builder()
            .post(Descriptor::output(Shape::of::<ImportSummary>()))
            .build()
    })
}

pub fn dashboard_stats() -> &'static SchemaRegistry {
    static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        SchemaRegistry::builder()
            .get(Descriptor::output(Shape::of::<OccupancyStats>()))
            .build()
    })
}
