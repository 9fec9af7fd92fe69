pub mod resources;

use axum::response::Json;
use serde_json::{json, Value};

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "name": "volunteer-api",
        "version": version,
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "ok",
    }))
}
