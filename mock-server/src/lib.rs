use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    pub location: String,
}

#[derive(Deserialize)]
pub struct CreateWarehouse {
    pub name: String,
    pub location: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rack {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub name: String,
    pub capacity: u32,
    pub occupied: u32,
}

#[derive(Deserialize)]
pub struct CreateRack {
    pub warehouse_id: Uuid,
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub occupied: u32,
}

#[derive(Deserialize)]
pub struct UpdateRack {
    pub name: Option<String>,
    pub capacity: Option<u32>,
    pub occupied: Option<u32>,
}

#[derive(Deserialize)]
pub struct RackFilter {
    pub warehouse_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportRejection {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub rejected: Vec<ImportRejection>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WarehouseOccupancy {
    pub warehouse_id: Uuid,
    pub name: String,
    pub capacity: u64,
    pub occupied: u64,
    pub occupancy_rate: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OccupancyStats {
    pub total_capacity: u64,
    pub total_occupied: u64,
    pub occupancy_rate: f64,
    pub warehouses: Vec<WarehouseOccupancy>,
}

#[derive(Deserialize)]
pub struct SignIn {
    pub operator: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub operator: String,
}

pub const SESSION_COOKIE: &str = "wms_session";

/// Success arm of the response envelope.
#[derive(Serialize)]
struct Success<T> {
    success: bool,
    data: T,
}

#[derive(Default)]
pub struct Store {
    pub warehouses: HashMap<Uuid, Warehouse>,
    pub racks: HashMap<Uuid, Rack>,
    pub sessions: HashMap<Uuid, Session>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with_db(Db::default())
}

pub fn app_with_db(db: Db) -> Router {
    Router::new()
        .route("/warehouses", get(list_warehouses).post(create_warehouse))
        .route(
            "/warehouses/{id}",
            get(get_warehouse).put(update_warehouse).delete(delete_warehouse),
        )
        .route("/racks", get(list_racks).post(create_rack))
        .route("/racks/import", post(import_racks))
        .route("/racks/{id}", get(get_rack).patch(update_rack).delete(delete_rack))
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/session", get(current_session).post(sign_in))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn ok<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(Success { success: true, data })).into_response()
}

/// Logical failure: HTTP 200 with `success: false`.
fn failure(message: &str, code: &str) -> Response {
    Json(json!({ "success": false, "message": message, "code": code })).into_response()
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn not_found(what: &str) -> Response {
    error(StatusCode::NOT_FOUND, &format!("{what} not found"))
}

async fn list_warehouses(State(db): State<Db>) -> Response {
    let store = db.read().await;
    let mut warehouses: Vec<Warehouse> = store.warehouses.values().cloned().collect();
    warehouses.sort_by(|a, b| a.name.cmp(&b.name));
    ok(StatusCode::OK, warehouses)
}

async fn create_warehouse(State(db): State<Db>, Json(input): Json<CreateWarehouse>) -> Response {
    if input.name.trim().is_empty() {
        return failure("Warehouse name must not be empty", "INVALID_NAME");
    }
    let warehouse = Warehouse {
        id: Uuid::new_v4(),
        name: input.name,
        location: input.location,
    };
    tracing::info!(id = %warehouse.id, name = %warehouse.name, "warehouse created");
    db.write().await.warehouses.insert(warehouse.id, warehouse.clone());
    ok(StatusCode::CREATED, warehouse)
}

async fn get_warehouse(State(db): State<Db>, Path(id): Path<Uuid>) -> Response {
    match db.read().await.warehouses.get(&id) {
        Some(warehouse) => ok(StatusCode::OK, warehouse),
        None => not_found("Warehouse"),
    }
}

async fn update_warehouse(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateWarehouse>,
) -> Response {
    let mut store = db.write().await;
    let Some(warehouse) = store.warehouses.get_mut(&id) else {
        return not_found("Warehouse");
    };
    warehouse.name = input.name;
    warehouse.location = input.location;
    ok(StatusCode::OK, warehouse.clone())
}

/// Deleting a warehouse also deletes its racks.
async fn delete_warehouse(State(db): State<Db>, Path(id): Path<Uuid>) -> Response {
    let mut store = db.write().await;
    if store.warehouses.remove(&id).is_none() {
        return not_found("Warehouse");
    }
    store.racks.retain(|_, rack| rack.warehouse_id != id);
    tracing::info!(%id, "warehouse deleted");
    ok(StatusCode::OK, ())
}

async fn list_racks(State(db): State<Db>, Query(filter): Query<RackFilter>) -> Response {
    let store = db.read().await;
    let mut racks: Vec<Rack> = store
        .racks
        .values()
        .filter(|rack| filter.warehouse_id.map_or(true, |id| rack.warehouse_id == id))
        .cloned()
        .collect();
    racks.sort_by(|a, b| a.name.cmp(&b.name));
    ok(StatusCode::OK, racks)
}

/// Check a rack against the store; `Err` carries a logical failure.
fn validate_rack(store: &Store, warehouse_id: Uuid, capacity: u32, occupied: u32) -> Result<(), Response> {
    if !store.warehouses.contains_key(&warehouse_id) {
        return Err(failure("Unknown warehouse", "UNKNOWN_WAREHOUSE"));
    }
    if occupied > capacity {
        return Err(failure("Occupied slots exceed rack capacity", "OVER_CAPACITY"));
    }
    Ok(())
}

async fn create_rack(State(db): State<Db>, Json(input): Json<CreateRack>) -> Response {
    let mut store = db.write().await;
    if let Err(response) = validate_rack(&store, input.warehouse_id, input.capacity, input.occupied) {
        return response;
    }
    let rack = Rack {
        id: Uuid::new_v4(),
        warehouse_id: input.warehouse_id,
        name: input.name,
        capacity: input.capacity,
        occupied: input.occupied,
    };
    store.racks.insert(rack.id, rack.clone());
    ok(StatusCode::CREATED, rack)
}

async fn get_rack(State(db): State<Db>, Path(id): Path<Uuid>) -> Response {
    match db.read().await.racks.get(&id) {
        Some(rack) => ok(StatusCode::OK, rack),
        None => not_found("Rack"),
    }
}

async fn update_rack(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateRack>,
) -> Response {
    let mut store = db.write().await;
    let Some(rack) = store.racks.get_mut(&id) else {
        return not_found("Rack");
    };
    let capacity = input.capacity.unwrap_or(rack.capacity);
    let occupied = input.occupied.unwrap_or(rack.occupied);
    if occupied > capacity {
        return failure("Occupied slots exceed rack capacity", "OVER_CAPACITY");
    }
    if let Some(name) = input.name {
        rack.name = name;
    }
    rack.capacity = capacity;
    rack.occupied = occupied;
    ok(StatusCode::OK, rack.clone())
}

async fn delete_rack(State(db): State<Db>, Path(id): Path<Uuid>) -> Response {
    match db.write().await.racks.remove(&id) {
        Some(_) => ok(StatusCode::OK, ()),
        None => not_found("Rack"),
    }
}

/// Import racks from the `file` part of a multipart upload. Each CSV line is
/// `name,warehouse_id,capacity,occupied`; a header line is skipped.
async fn import_racks(State(db): State<Db>, mut multipart: Multipart) -> Response {
    let mut csv = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => match field.text().await {
                Ok(text) => csv = Some(text),
                Err(e) => return error(StatusCode::BAD_REQUEST, &e.body_text()),
            },
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => return error(StatusCode::BAD_REQUEST, &e.body_text()),
        }
    }
    let Some(csv) = csv else {
        return error(StatusCode::BAD_REQUEST, "Missing file field");
    };

    let mut store = db.write().await;
    let mut summary = ImportSummary {
        imported: 0,
        rejected: Vec::new(),
    };
    for (index, line) in csv.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();
        if line.is_empty() || (index == 0 && line.starts_with("name,")) {
            continue;
        }
        match parse_rack_line(&store, line) {
            Ok(rack) => {
                store.racks.insert(rack.id, rack);
                summary.imported += 1;
            }
            Err(reason) => summary.rejected.push(ImportRejection {
                line: line_no,
                reason,
            }),
        }
    }
    tracing::info!(imported = summary.imported, rejected = summary.rejected.len(), "rack import");
    ok(StatusCode::OK, summary)
}

fn parse_rack_line(store: &Store, line: &str) -> Result<Rack, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [name, warehouse_id, capacity, occupied] = fields.as_slice() else {
        return Err(format!("expected 4 columns, got {}", fields.len()));
    };
    if name.is_empty() {
        return Err("empty rack name".to_string());
    }
    let warehouse_id: Uuid = warehouse_id
        .parse()
        .map_err(|_| format!("invalid warehouse id {warehouse_id:?}"))?;
    let capacity: u32 = capacity
        .parse()
        .map_err(|_| format!("invalid capacity {capacity:?}"))?;
    let occupied: u32 = occupied
        .parse()
        .map_err(|_| format!("invalid occupied count {occupied:?}"))?;
    if !store.warehouses.contains_key(&warehouse_id) {
        return Err("unknown warehouse".to_string());
    }
    if occupied > capacity {
        return Err("occupied slots exceed rack capacity".to_string());
    }
    Ok(Rack {
        id: Uuid::new_v4(),
        warehouse_id,
        name: name.to_string(),
        capacity,
        occupied,
    })
}

fn rate(occupied: u64, capacity: u64) -> f64 {
    if capacity == 0 {
        0.0
    } else {
        occupied as f64 / capacity as f64
    }
}

async fn dashboard_stats(State(db): State<Db>) -> Response {
    let store = db.read().await;
    let mut warehouses: Vec<WarehouseOccupancy> = store
        .warehouses
        .values()
        .map(|warehouse| {
            let (capacity, occupied) = store
                .racks
                .values()
                .filter(|rack| rack.warehouse_id == warehouse.id)
                .fold((0u64, 0u64), |(c, o), rack| {
                    (c + u64::from(rack.capacity), o + u64::from(rack.occupied))
                });
            WarehouseOccupancy {
                warehouse_id: warehouse.id,
                name: warehouse.name.clone(),
                capacity,
                occupied,
                occupancy_rate: rate(occupied, capacity),
            }
        })
        .collect();
    warehouses.sort_by(|a, b| a.name.cmp(&b.name));
    let total_capacity = warehouses.iter().map(|w| w.capacity).sum();
    let total_occupied = warehouses.iter().map(|w| w.occupied).sum();
    ok(
        StatusCode::OK,
        OccupancyStats {
            total_capacity,
            total_occupied,
            occupancy_rate: rate(total_occupied, total_capacity),
            warehouses,
        },
    )
}

/// Start a session and hand its id back as a cookie.
async fn sign_in(State(db): State<Db>, Json(input): Json<SignIn>) -> Response {
    let id = Uuid::new_v4();
    let session = Session {
        operator: input.operator,
    };
    db.write().await.sessions.insert(id, session.clone());
    tracing::info!(operator = %session.operator, "session started");
    let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly");
    ([(header::SET_COOKIE, cookie)], ok(StatusCode::OK, session)).into_response()
}

async fn current_session(State(db): State<Db>, headers: HeaderMap) -> Response {
    let store = db.read().await;
    match session_id(&headers).and_then(|id| store.sessions.get(&id)) {
        Some(session) => ok(StatusCode::OK, session),
        None => error(StatusCode::UNAUTHORIZED, "Not signed in"),
    }
}

fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| value.parse().ok())
}
