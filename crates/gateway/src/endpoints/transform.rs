//! # POST /transform
//!
//! 変換済み配信URLを返す。リモートサービスには問い合わせない。

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use media_types::{TransformRequest, TransformResponse};

use crate::config::GatewayState;
use crate::error::GatewayError;

/// POST /transform — 配信URL構築。
pub async fn handle_transform(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<TransformRequest>,
) -> Result<Json<TransformResponse>, GatewayError> {
    let url = state.url_builder.build(
        &body.identifier,
        body.resource_kind,
        body.variant,
        &body.options,
    )?;
    Ok(Json(TransformResponse { url }))
}
