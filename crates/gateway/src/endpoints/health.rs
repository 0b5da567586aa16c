//! # GET /health

use axum::Json;

/// GET /health — 生存確認。
pub async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
