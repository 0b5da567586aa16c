//! # POST /presets

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use media_types::{CreatePresetRequest, PresetDescriptor};

use crate::config::GatewayState;
use crate::error::GatewayError;

/// POST /presets — 直接アップロード用プリセットを登録する。
pub async fn handle_create_preset(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<CreatePresetRequest>,
) -> Result<Json<PresetDescriptor>, GatewayError> {
    let preset = state
        .lifecycle
        .create_preset(&body.name, &body.options)
        .await?;
    Ok(Json(preset))
}
