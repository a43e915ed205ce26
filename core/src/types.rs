//! Domain DTOs for the warehouse API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently.
//! Integration tests catch any schema drift between the two crates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWarehouse {
    pub name: String,
    pub location: String,
}

/// A storage rack. `occupied` never exceeds `capacity` on the server side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rack {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub name: String,
    pub capacity: u32,
    pub occupied: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRack {
    pub warehouse_id: Uuid,
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub occupied: u32,
}

/// Partial rack update. Only the fields present in the JSON are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRack {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupied: Option<u32>,
}

/// Result of a CSV rack import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub rejected: Vec<ImportRejection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportRejection {
    /// 1-based line number in the uploaded file.
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarehouseOccupancy {
    pub warehouse_id: Uuid,
    pub name: String,
    pub capacity: u64,
    pub occupied: u64,
    pub occupancy_rate: f64,
}

/// Dashboard occupancy statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OccupancyStats {
    pub total_capacity: u64,
    pub total_occupied: u64,
    pub occupancy_rate: f64,
    pub warehouses: Vec<WarehouseOccupancy>,
}
