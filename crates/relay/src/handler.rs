//! # GET /relay
//!
//! 許可されたターゲットを1回だけ取得し、ボディをそのまま返す。
//! 状態遷移: 受信 → 検証 → 取得（タイムアウトと競争）→ 成功 / 上流エラー / タイムアウト / 通信失敗。
//! リトライは行わない。
//!
//! ボディはストリーミングせず、上限（`RELAY_MAX_BODY_MB`）まで読み切ってから返す。
//! タイムアウトはボディの受信完了までを含み、部分的な200は返さない。

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use url::Url;

use crate::config::RelayState;
use crate::error::{RelayError, OUTCOME_HEADER};

/// 成功応答のキャッシュ指定
const CACHE_CONTROL_VALUE: &str = "public, max-age=60";
/// 上流エラー本文のうち診断として返す最大長
const MAX_DIAGNOSTIC_LEN: usize = 1024;

#[derive(Debug, Deserialize)]
pub struct RelayQuery {
    #[serde(default)]
    pub target: Option<String>,
}

/// 取得に成功した上流応答
struct Fetched {
    content_type: Option<HeaderValue>,
    body: Vec<u8>,
}

/// GET /relay?target=<url>
pub async fn handle_relay(
    State(state): State<Arc<RelayState>>,
    Query(query): Query<RelayQuery>,
) -> Result<Response, RelayError> {
    let raw = query.target.unwrap_or_default();
    let url = state.policy.check(&raw).inspect_err(|e| {
        tracing::warn!(target_url = %raw, error = %e, "中継ターゲットを拒否");
    })?;

    tracing::info!(target_url = %url, "中継を開始");

    let fetched = tokio::time::timeout(state.timeout, fetch(&state, url.clone()))
        .await
        .map_err(|_| {
            tracing::warn!(target_url = %url, timeout = ?state.timeout, "上流の応答がタイムアウト");
            RelayError::Timeout
        })??;

    tracing::info!(target_url = %url, bytes = fetched.body.len(), "中継完了");

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        fetched
            .content_type
            .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL_VALUE),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(fetched.body.len()));
    headers.insert(OUTCOME_HEADER, HeaderValue::from_static("relayed"));

    Ok((StatusCode::OK, headers, fetched.body).into_response())
}

/// 上流を取得し、ボディを上限まで読み切る。
async fn fetch(state: &RelayState, url: Url) -> Result<Fetched, RelayError> {
    let mut response = state.http_client.get(url).send().await.map_err(|e| {
        tracing::error!(error = %e, "上流への接続に失敗");
        RelayError::Transport(e.to_string())
    })?;

    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_DIAGNOSTIC_LEN {
            let mut end = MAX_DIAGNOSTIC_LEN;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        tracing::warn!(status = %status, "上流がエラーを返却");
        return Err(RelayError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    let limit = state.max_body_bytes;
    if response.content_length().is_some_and(|len| len > limit) {
        return Err(RelayError::TooLarge { limit });
    }

    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| RelayError::Transport(e.to_string()))?
    {
        if (body.len() + chunk.len()) as u64 > limit {
            return Err(RelayError::TooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(Fetched { content_type, body })
}
