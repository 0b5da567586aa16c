//! # アセット管理エンドポイント
//!
//! 削除・検索・メタデータ取得。処理は [`crate::lifecycle::LifecycleManager`] に委譲する。

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use media_types::{Asset, AssetInfoRequest, DeleteOutcome, DeleteRequest, SearchRequest, SearchResponse};

use crate::config::GatewayState;
use crate::error::GatewayError;

/// POST /assets/delete — 1件なら単一削除、複数なら一括削除。
pub async fn handle_delete_assets(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<DeleteRequest>,
) -> Result<Json<DeleteOutcome>, GatewayError> {
    let outcome = state
        .lifecycle
        .delete_assets(&body.identifiers, body.resource_kind)
        .await?;
    Ok(Json(outcome))
}

/// POST /assets/search — 新しい順の検索結果。
pub async fn handle_search_assets(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, GatewayError> {
    let assets = state
        .lifecycle
        .search_assets(&body.expression, body.limit)
        .await?;
    Ok(Json(SearchResponse { assets }))
}

/// POST /assets/info — 現在のメタデータ。
pub async fn handle_asset_info(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<AssetInfoRequest>,
) -> Result<Json<Asset>, GatewayError> {
    let asset = state
        .lifecycle
        .fetch_asset_info(&body.identifier, body.resource_kind)
        .await?;
    Ok(Json(asset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{asset, start_gateway, test_state, MockMediaStore};
    use media_types::ResourceKind;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_delete_assets() {
        let store = Arc::new(MockMediaStore::default());
        let state = test_state(store.clone());

        let outcome = handle_delete_assets(
            State(state),
            Json(DeleteRequest {
                identifiers: vec!["posts/a".to_string(), "posts/b".to_string()],
                resource_kind: ResourceKind::Image,
            }),
        )
        .await
        .unwrap()
        .0;

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(store.destroy_many_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*store.destroyed.lock().unwrap(), vec!["posts/a", "posts/b"]);
    }

    #[tokio::test]
    async fn test_search_assets() {
        let store = Arc::new(MockMediaStore {
            search_results: vec![
                asset("posts/a", Some("2026-01-01T00:00:00Z")),
                asset("posts/b", Some("2026-02-01T00:00:00Z")),
            ],
            ..Default::default()
        });
        let state = test_state(store);

        let response = handle_search_assets(
            State(state),
            Json(SearchRequest {
                expression: "folder:posts".to_string(),
                limit: None,
            }),
        )
        .await
        .unwrap()
        .0;

        assert_eq!(response.assets[0].identifier, "posts/b");
        assert_eq!(response.assets[1].identifier, "posts/a");
    }

    /// プロバイダの404はそのまま404として返る
    #[tokio::test]
    async fn test_asset_info_not_found() {
        let store = Arc::new(MockMediaStore::default());
        let base = start_gateway(test_state(store.clone())).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/assets/info"))
            .json(&serde_json::json!({"identifier": "posts/a", "resource_kind": "image"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let found: Asset = resp.json().await.unwrap();
        assert_eq!(found.identifier, "posts/a");

        let resp = client
            .post(format!("{base}/assets/info"))
            .json(&serde_json::json!({"identifier": "posts/missing", "resource_kind": "image"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
        assert!(resp.text().await.unwrap().contains("posts/missing"));
        assert_eq!(store.info_calls.load(Ordering::SeqCst), 2);
    }
}
