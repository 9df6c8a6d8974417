use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use engine::{DestinationOverride, Engine};
use error::SyncError;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use value::{Operation, Record};

/// Wraps a `SyncError` so handlers can use `?` and still produce the
/// `{ "error": "<kind>: <message>" }` body from §4.12.
pub(crate) struct ApiError(SyncError);

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SyncError::Config(_) | SyncError::Unsupported(_) => StatusCode::BAD_REQUEST,
            SyncError::AdmissionRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SyncError::TransientIo(_) | SyncError::PermanentIo(_) | SyncError::Wrapped(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Deserialize)]
pub struct SyncRequest {
    operation: Operation,
    record_id: String,
    #[serde(default)]
    data: Map<String, Value>,
    crm: String,
}

pub async fn sync(State(engine): State<Arc<Engine>>, Json(req): Json<SyncRequest>) -> Result<Json<Value>, ApiError> {
    let record_id = req.record_id.clone();
    let dest = req.crm.clone();
    let record = Record::new(req.record_id, req.operation, req.data, req.crm);
    engine.enqueue_sync(&dest, record)?;

    let status = engine.status.record_status(&record_id);
    let accepted = !matches!(status, value::RecordStatus::SkippedByRule);
    Ok(Json(json!({ "record_id": record_id, "accepted": accepted, "status": status })))
}

pub async fn retry(State(engine): State<Arc<Engine>>, Path(record_id): Path<String>) -> Result<Json<Value>, ApiError> {
    engine.retry_record(&record_id)?;
    Ok(Json(json!({ "record_id": record_id, "status": engine.status.record_status(&record_id) })))
}

pub async fn update_destination_config(
    State(engine): State<Arc<Engine>>,
    Path(name): Path<String>,
    Json(update): Json<DestinationOverride>,
) -> Result<Json<Value>, ApiError> {
    engine.destinations.update_config(&name, update)?;
    Ok(Json(json!({ "destination": name, "updated": true })))
}

pub async fn status(State(engine): State<Arc<Engine>>) -> Json<Value> {
    Json(serde_json::to_value(engine.status.aggregate()).unwrap_or(Value::Null))
}

pub async fn record_status(State(engine): State<Arc<Engine>>, Path(record_id): Path<String>) -> Json<Value> {
    Json(json!({ "record_id": &record_id, "status": engine.status.record_status(&record_id) }))
}

pub async fn update_rules(State(engine): State<Arc<Engine>>, Json(doc): Json<Value>) -> Result<Json<Value>, ApiError> {
    engine.rules.update_rules(doc)?;
    Ok(Json(json!({ "updated": true })))
}

pub async fn get_rules(State(engine): State<Arc<Engine>>) -> Json<Value> {
    Json(engine.rules.current())
}

pub async fn poll_once(State(engine): State<Arc<Engine>>, Path(name): Path<String>) -> Result<Json<Value>, ApiError> {
    engine.poll_once(&name).await?;
    Ok(Json(json!({ "polled": name })))
}

#[derive(Deserialize)]
pub struct SyncAllQuery {
    #[serde(default)]
    allow_duplicates: bool,
}

pub async fn sync_all(State(engine): State<Arc<Engine>>, Query(query): Query<SyncAllQuery>) -> Result<Json<Value>, ApiError> {
    let written = engine.sync_all(query.allow_duplicates).await?;
    Ok(Json(json!({ "written": written })))
}

pub async fn destinations(State(engine): State<Arc<Engine>>) -> Json<Vec<String>> {
    Json(engine.destination_names())
}

pub async fn destination_schema(State(engine): State<Arc<Engine>>, Path(name): Path<String>) -> Result<Json<Value>, ApiError> {
    let schema = engine
        .destinations
        .schema(&name)
        .ok_or_else(|| SyncError::config(format!("unknown destination '{name}'")))?;
    let schema: Map<String, Value> = schema.into_iter().map(|(key, desc)| (key.to_string(), json!(desc))).collect();
    Ok(Json(Value::Object(schema)))
}
