use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

pub const SERVICE_NAME: &str = "verity-backend";

/// GET /health
/// Liveness probe with the current UTC time.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "time": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
    }))
}

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Verity Backend is running."
    }))
}
