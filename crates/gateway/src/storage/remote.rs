//! # リモートメディアサービス実装
//!
//! REST APIを持つリモートメディアサービス（Cloudinary互換）への [`MediaStore`] 実装。
//!
//! - アップロード・単一削除: パラメータ署名（SHA-256）
//! - 一括削除・検索・メタデータ取得・プリセット登録: 管理APIのBasic認証

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use media_core::UploadPayload;
use media_types::{
    Asset, DeleteOutcome, DeleteResult, Dimensions, PresetDescriptor, PresetOptions, ResourceKind,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{MediaStore, UploadTarget};
use crate::config::{GatewayConfig, RemoteCredentials};
use crate::error::GatewayError;

/// プロバイダが動画クラスに格納する音声フォーマット
const AUDIO_FORMATS: &[&str] = &["mp3", "wav", "ogg", "aac", "m4a", "flac", "weba", "opus"];

/// 署名アルゴリズム名
const SIGNATURE_ALGORITHM: &str = "sha256";

/// リモートメディアサービスのクライアント。
pub struct RemoteMediaStore {
    http_client: reqwest::Client,
    /// APIのベースURL（末尾スラッシュなし）
    api_base: String,
    credentials: RemoteCredentials,
}

impl RemoteMediaStore {
    pub fn new(
        http_client: reqwest::Client,
        api_base: impl Into<String>,
        credentials: RemoteCredentials,
    ) -> Self {
        Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// 設定からHTTPクライアントを含めて構築する。
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Configuration(format!("HTTPクライアントの構築に失敗: {e}")))?;
        Ok(Self::new(
            http_client,
            config.api_base.clone(),
            config.credentials.clone(),
        ))
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/v1_1/{}/{path}",
            self.api_base, self.credentials.cloud_name
        )
    }

    /// タイムスタンプを加えて署名し、送信用パラメータ一式を返す。
    fn signed_params(
        &self,
        mut params: BTreeMap<&'static str, String>,
    ) -> BTreeMap<&'static str, String> {
        params.insert("timestamp", unix_timestamp().to_string());
        let signature = sign_params(&params, &self.credentials.api_secret);
        params.insert("api_key", self.credentials.api_key.clone());
        params.insert("signature", signature);
        params.insert("signature_algorithm", SIGNATURE_ALGORITHM.to_string());
        params
    }

    fn admin(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.basic_auth(
            &self.credentials.api_key,
            Some(&self.credentials.api_secret),
        )
    }
}

/// パラメータ署名を計算する。
///
/// キーの辞書順に `k=v` を `&` で連結し、末尾にシークレットを付けたSHA-256の16進表現。
/// 空値のパラメータは署名対象に含めない。
pub(crate) fn sign_params(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let joined = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    hex::encode(Sha256::digest(format!("{joined}{api_secret}").as_bytes()))
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// リソース種別に対応するプロバイダのリソースクラス。
/// 音声は動画クラスに格納される。
pub(crate) fn delivery_class(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Image => "image",
        ResourceKind::Video | ResourceKind::Audio => "video",
        ResourceKind::Raw => "raw",
    }
}

fn transport_error(operation: &str, e: reqwest::Error) -> GatewayError {
    tracing::error!(operation, error = %e, "リモートストレージへの通信に失敗");
    GatewayError::remote(None, format!("{operation}: {e}"))
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

/// エラー応答本文からプロバイダの診断メッセージを取り出す。
fn provider_message(body: &str) -> String {
    match serde_json::from_str::<ProviderErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => "応答本文なし".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// 応答のステータスを確認し、成功ならJSONとしてデコードする。
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    operation: &str,
) -> Result<T, GatewayError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(operation, e))?;

    if !status.is_success() {
        let message = provider_message(&body);
        tracing::error!(operation, status = %status, message = %message, "リモートストレージが操作を拒否");
        return Err(GatewayError::remote(
            Some(status.as_u16()),
            format!("{operation}: {message}"),
        ));
    }

    serde_json::from_str(&body).map_err(|e| {
        GatewayError::remote(
            Some(status.as_u16()),
            format!("{operation}: 応答の解析に失敗: {e}"),
        )
    })
}

// ---------------------------------------------------------------------------
// 応答ボディ
// ---------------------------------------------------------------------------

/// プロバイダが返すリソース記述。
#[derive(Debug, Deserialize)]
struct RemoteResource {
    public_id: String,
    secure_url: String,
    resource_type: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    bytes: u64,
    #[serde(default)]
    folder: Option<String>,
    #[serde(default)]
    asset_folder: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    is_audio: Option<bool>,
}

impl RemoteResource {
    fn resource_kind(&self) -> ResourceKind {
        match self.resource_type.as_str() {
            "image" => ResourceKind::Image,
            "video" => {
                let audio_format = self
                    .format
                    .as_deref()
                    .is_some_and(|f| AUDIO_FORMATS.contains(&f.to_ascii_lowercase().as_str()));
                if self.is_audio.unwrap_or(false) || (audio_format && self.width.is_none()) {
                    ResourceKind::Audio
                } else {
                    ResourceKind::Video
                }
            }
            _ => ResourceKind::Raw,
        }
    }

    fn into_asset(self) -> Asset {
        let resource_kind = self.resource_kind();
        let namespace = self
            .folder
            .or(self.asset_folder)
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| match self.public_id.rsplit_once('/') {
                Some((parent, _)) => parent.to_string(),
                None => String::new(),
            });
        let dimensions = match (self.width, self.height) {
            (Some(width), Some(height)) => Some(Dimensions { width, height }),
            _ => None,
        };
        Asset {
            identifier: self.public_id,
            secure_url: self.secure_url,
            resource_kind,
            format: self.format.unwrap_or_default(),
            dimensions,
            duration: self.duration,
            byte_size: self.bytes,
            namespace,
            created_at: self.created_at,
        }
    }
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Deserialize)]
struct BulkDeleteResponse {
    #[serde(default)]
    deleted: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    resources: Vec<RemoteResource>,
}

#[derive(Deserialize)]
struct PresetResponse {
    message: String,
    name: String,
}

// ---------------------------------------------------------------------------
// MediaStore実装
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl MediaStore for RemoteMediaStore {
    async fn upload(
        &self,
        payload: UploadPayload,
        target: &UploadTarget,
    ) -> Result<Asset, GatewayError> {
        let mut params = BTreeMap::new();
        params.insert("folder", target.namespace.clone());
        params.insert("public_id", target.identifier.clone());
        let params = self.signed_params(params);

        let file_part = match payload {
            UploadPayload::Bytes(bytes) => reqwest::multipart::Part::bytes(bytes)
                .file_name(target.identifier.clone())
                .mime_str(&target.content_type)
                .map_err(|e| GatewayError::Internal(format!("MIMEタイプの設定に失敗: {e}")))?,
            UploadPayload::RemoteUrl(url) => reqwest::multipart::Part::text(url),
            UploadPayload::DataUri(uri) => reqwest::multipart::Part::text(uri),
        };

        let mut form = reqwest::multipart::Form::new().part("file", file_part);
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self
            .http_client
            .post(self.endpoint("auto/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error("アップロード", e))?;

        let asset = read_json::<RemoteResource>(response, "アップロード")
            .await?
            .into_asset();

        tracing::info!(
            identifier = %asset.identifier,
            kind = %asset.resource_kind,
            byte_size = asset.byte_size,
            "リモートストレージへのアップロード完了"
        );
        Ok(asset)
    }

    async fn destroy(
        &self,
        identifier: &str,
        kind: ResourceKind,
    ) -> Result<DeleteOutcome, GatewayError> {
        let mut params = BTreeMap::new();
        params.insert("public_id", identifier.to_string());
        params.insert("invalidate", "true".to_string());
        let params = self.signed_params(params);

        let response = self
            .http_client
            .post(self.endpoint(&format!("{}/destroy", delivery_class(kind))))
            .form(&params)
            .send()
            .await
            .map_err(|e| transport_error("削除", e))?;

        let destroyed: DestroyResponse = read_json(response, "削除").await?;
        tracing::info!(identifier, result = %destroyed.result, "アセットを削除");

        Ok(DeleteOutcome {
            results: vec![DeleteResult {
                identifier: identifier.to_string(),
                result: destroyed.result,
            }],
        })
    }

    async fn destroy_many(
        &self,
        identifiers: &[String],
        kind: ResourceKind,
    ) -> Result<DeleteOutcome, GatewayError> {
        let query: Vec<(&str, &str)> = identifiers
            .iter()
            .map(|id| ("public_ids[]", id.as_str()))
            .collect();

        let response = self
            .admin(self.http_client.delete(self.endpoint(&format!(
                "resources/{}/upload",
                delivery_class(kind)
            ))))
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error("一括削除", e))?;

        let mut deleted = read_json::<BulkDeleteResponse>(response, "一括削除")
            .await?
            .deleted;

        // 要求順に並べ、プロバイダが追加で報告したものは末尾に残す
        let mut results = Vec::with_capacity(deleted.len());
        for identifier in identifiers {
            if let Some(result) = deleted.remove(identifier) {
                results.push(DeleteResult {
                    identifier: identifier.clone(),
                    result,
                });
            }
        }
        results.extend(
            deleted
                .into_iter()
                .map(|(identifier, result)| DeleteResult { identifier, result }),
        );

        tracing::info!(requested = identifiers.len(), reported = results.len(), "アセットを一括削除");
        Ok(DeleteOutcome { results })
    }

    async fn search(&self, expression: &str, max_results: u32) -> Result<Vec<Asset>, GatewayError> {
        let body = serde_json::json!({
            "expression": expression,
            "sort_by": [{ "created_at": "desc" }],
            "max_results": max_results,
        });

        let response = self
            .admin(self.http_client.post(self.endpoint("resources/search")))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("検索", e))?;

        let found: SearchResponse = read_json(response, "検索").await?;
        Ok(found
            .resources
            .into_iter()
            .map(RemoteResource::into_asset)
            .collect())
    }

    async fn create_preset(
        &self,
        name: &str,
        options: &PresetOptions,
    ) -> Result<PresetDescriptor, GatewayError> {
        let mut form = vec![
            ("name", name.to_string()),
            ("unsigned", "true".to_string()),
        ];
        if let Some(folder) = &options.folder {
            form.push(("folder", folder.clone()));
        }
        if let Some(kind) = options.resource_kind {
            form.push(("resource_type", delivery_class(kind).to_string()));
        }
        if !options.allowed_formats.is_empty() {
            form.push(("allowed_formats", options.allowed_formats.join(",")));
        }

        let response = self
            .admin(self.http_client.post(self.endpoint("upload_presets")))
            .form(&form)
            .send()
            .await
            .map_err(|e| transport_error("プリセット登録", e))?;

        let created: PresetResponse = read_json(response, "プリセット登録").await?;
        tracing::info!(name = %created.name, "アップロードプリセットを登録");

        Ok(PresetDescriptor {
            name: created.name,
            options: options.clone(),
            message: created.message,
        })
    }

    async fn asset_info(&self, identifier: &str, kind: ResourceKind) -> Result<Asset, GatewayError> {
        let response = self
            .admin(self.http_client.get(self.endpoint(&format!(
                "resources/{}/upload/{identifier}",
                delivery_class(kind)
            ))))
            .send()
            .await
            .map_err(|e| transport_error("メタデータ取得", e))?;

        Ok(read_json::<RemoteResource>(response, "メタデータ取得")
            .await?
            .into_asset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Multipart, Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{delete, get, post};
    use axum::{Form, Json, Router};

    const CLOUD: &str = "demo";
    const KEY: &str = "key-123";
    const SECRET: &str = "secret-xyz";

    async fn start_remote(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        format!("http://127.0.0.1:{port}")
    }

    fn store(base: &str) -> RemoteMediaStore {
        RemoteMediaStore::new(
            reqwest::Client::new(),
            base,
            RemoteCredentials {
                cloud_name: CLOUD.to_string(),
                api_key: KEY.to_string(),
                api_secret: SECRET.to_string(),
            },
        )
    }

    /// Basic認証ヘッダーが `KEY:SECRET` であること
    fn has_admin_auth(headers: &HeaderMap) -> bool {
        use base64::Engine;
        let expected = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(format!("{KEY}:{SECRET}"))
        );
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    }

    /// 受信したパラメータの署名を検証する
    fn verify_signature(fields: &BTreeMap<String, String>) -> bool {
        let signed: BTreeMap<&str, String> = fields
            .iter()
            .filter(|(k, _)| {
                !matches!(
                    k.as_str(),
                    "file" | "api_key" | "signature" | "signature_algorithm"
                )
            })
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        fields.get("api_key").map(String::as_str) == Some(KEY)
            && fields.get("signature_algorithm").map(String::as_str) == Some("sha256")
            && fields.get("signature") == Some(&sign_params(&signed, SECRET))
    }

    fn target(content_type: &str) -> UploadTarget {
        UploadTarget {
            namespace: "posts".to_string(),
            identifier: "post_1700000000000_k3j9x0abc".to_string(),
            content_type: content_type.to_string(),
        }
    }

    #[test]
    fn test_sign_params() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("public_id", "sample".to_string());
        params.insert("folder", String::new());
        let expected = hex::encode(Sha256::digest(
            b"public_id=sample&timestamp=1315060510abcd",
        ));
        assert_eq!(sign_params(&params, "abcd"), expected);
    }

    #[test]
    fn test_provider_message() {
        assert_eq!(
            provider_message(r#"{"error":{"message":"Resource not found - x"}}"#),
            "Resource not found - x"
        );
        assert_eq!(provider_message("  bad gateway "), "bad gateway");
        assert_eq!(provider_message(""), "応答本文なし");
    }

    /// 音声はvideoクラスで返ってきてもAudioとして扱う
    #[test]
    fn test_audio_mapping() {
        let resource: RemoteResource = serde_json::from_value(serde_json::json!({
            "public_id": "voice/clip_1_abc",
            "secure_url": "https://res.example.com/demo/video/upload/voice/clip_1_abc.mp3",
            "resource_type": "video",
            "format": "mp3",
            "duration": 12.5,
            "bytes": 2048,
        }))
        .unwrap();
        let asset = resource.into_asset();
        assert_eq!(asset.resource_kind, ResourceKind::Audio);
        assert_eq!(asset.namespace, "voice");
        assert_eq!(asset.duration, Some(12.5));
        assert!(asset.dimensions.is_none());

        let resource: RemoteResource = serde_json::from_value(serde_json::json!({
            "public_id": "clips/stream_1_abc",
            "secure_url": "https://res.example.com/demo/video/upload/clips/stream_1_abc.mp4",
            "resource_type": "video",
            "format": "mp4",
            "width": 1280,
            "height": 720,
            "bytes": 4096,
        }))
        .unwrap();
        let asset = resource.into_asset();
        assert_eq!(asset.resource_kind, ResourceKind::Video);
        assert_eq!(
            asset.dimensions,
            Some(Dimensions {
                width: 1280,
                height: 720
            })
        );
    }

    /// 署名付きmultipartでアップロードし、Assetに変換されることを確認
    #[tokio::test]
    async fn test_upload_bytes_signed() {
        let remote = Router::new().route(
            "/v1_1/demo/auto/upload",
            post(|mut multipart: Multipart| async move {
                let mut fields = BTreeMap::new();
                let mut file_len = 0usize;
                while let Some(field) = multipart.next_field().await.unwrap() {
                    let name = field.name().unwrap().to_string();
                    if name == "file" {
                        assert_eq!(field.content_type(), Some("image/png"));
                        file_len = field.bytes().await.unwrap().len();
                    } else {
                        fields.insert(name, field.text().await.unwrap());
                    }
                }
                if !verify_signature(&fields) {
                    return (
                        StatusCode::UNAUTHORIZED,
                        Json(serde_json::json!({"error": {"message": "Invalid Signature"}})),
                    );
                }
                let public_id = format!("{}/{}", fields["folder"], fields["public_id"]);
                (
                    StatusCode::OK,
                    Json(serde_json::json!({
                        "public_id": public_id,
                        "secure_url": format!("https://res.example.com/demo/image/upload/{public_id}.png"),
                        "resource_type": "image",
                        "format": "png",
                        "width": 640,
                        "height": 480,
                        "bytes": file_len,
                        "folder": fields["folder"],
                        "created_at": "2026-01-01T00:00:00Z",
                    })),
                )
            }),
        );
        let base = start_remote(remote).await;

        let asset = store(&base)
            .upload(UploadPayload::Bytes(vec![7u8; 1024]), &target("image/png"))
            .await
            .unwrap();

        assert_eq!(asset.identifier, "posts/post_1700000000000_k3j9x0abc");
        assert_eq!(asset.resource_kind, ResourceKind::Image);
        assert_eq!(asset.format, "png");
        assert_eq!(asset.byte_size, 1024);
        assert_eq!(asset.namespace, "posts");
        assert!(asset.secure_url.starts_with("https://"));
    }

    /// プロバイダのエラー診断がそのまま伝わることを確認
    #[tokio::test]
    async fn test_upload_error_passthrough() {
        let remote = Router::new().route(
            "/v1_1/demo/auto/upload",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": {"message": "Invalid image file"}})),
                )
            }),
        );
        let base = start_remote(remote).await;

        let err = store(&base)
            .upload(
                UploadPayload::RemoteUrl("https://example.com/a.png".to_string()),
                &target("image/png"),
            )
            .await
            .unwrap_err();

        match err {
            GatewayError::RemoteStorage { status, message } => {
                assert_eq!(status, Some(400));
                assert!(message.contains("Invalid image file"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// 接続できない場合はステータスなしのRemoteStorageになる
    #[tokio::test]
    async fn test_upload_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = store(&format!("http://127.0.0.1:{port}"))
            .upload(
                UploadPayload::DataUri("data:image/png;base64,AAAA".to_string()),
                &target("image/png"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::RemoteStorage { status: None, .. }));
    }

    /// 音声の単一削除は動画クラスに送られる
    #[tokio::test]
    async fn test_destroy_audio_uses_video_class() {
        let remote = Router::new().route(
            "/v1_1/demo/video/destroy",
            post(|Form(fields): Form<BTreeMap<String, String>>| async move {
                assert!(verify_signature(&fields));
                assert_eq!(fields["invalidate"], "true");
                let result = if fields["public_id"] == "voice/missing" {
                    "not found"
                } else {
                    "ok"
                };
                Json(serde_json::json!({ "result": result }))
            }),
        );
        let base = start_remote(remote).await;
        let store = store(&base);

        let outcome = store
            .destroy("voice/clip_1_abc", ResourceKind::Audio)
            .await
            .unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].result, "ok");

        let outcome = store
            .destroy("voice/missing", ResourceKind::Audio)
            .await
            .unwrap();
        assert_eq!(outcome.results[0].result, "not found");
    }

    /// 一括削除は要求順に結果を返し、プロバイダの報告をそのまま伝える
    #[tokio::test]
    async fn test_destroy_many() {
        let remote = Router::new().route(
            "/v1_1/demo/resources/image/upload",
            delete(
                |headers: HeaderMap, Query(query): Query<Vec<(String, String)>>| async move {
                    if !has_admin_auth(&headers) {
                        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({})));
                    }
                    let mut deleted = serde_json::Map::new();
                    for (key, id) in query {
                        assert_eq!(key, "public_ids[]");
                        let result = if id.ends_with("gone") { "not_found" } else { "deleted" };
                        deleted.insert(id, serde_json::json!(result));
                    }
                    (StatusCode::OK, Json(serde_json::json!({ "deleted": deleted })))
                },
            ),
        );
        let base = start_remote(remote).await;

        let ids = vec!["posts/b".to_string(), "posts/gone".to_string(), "posts/a".to_string()];
        let outcome = store(&base)
            .destroy_many(&ids, ResourceKind::Image)
            .await
            .unwrap();

        let pairs: Vec<(&str, &str)> = outcome
            .results
            .iter()
            .map(|r| (r.identifier.as_str(), r.result.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("posts/b", "deleted"),
                ("posts/gone", "not_found"),
                ("posts/a", "deleted")
            ]
        );
    }

    /// 検索は新しい順の指定と件数上限を送る
    #[tokio::test]
    async fn test_search() {
        let remote = Router::new().route(
            "/v1_1/demo/resources/search",
            post(
                |headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                    assert!(has_admin_auth(&headers));
                    assert_eq!(body["expression"], "folder:posts");
                    assert_eq!(body["max_results"], 2);
                    assert_eq!(body["sort_by"][0]["created_at"], "desc");
                    Json(serde_json::json!({
                        "total_count": 2,
                        "resources": [
                            {
                                "public_id": "posts/new",
                                "secure_url": "https://res.example.com/demo/image/upload/posts/new.jpg",
                                "resource_type": "image",
                                "format": "jpg",
                                "bytes": 10,
                                "created_at": "2026-02-01T00:00:00Z"
                            },
                            {
                                "public_id": "posts/old",
                                "secure_url": "https://res.example.com/demo/image/upload/posts/old.jpg",
                                "resource_type": "image",
                                "format": "jpg",
                                "bytes": 20,
                                "created_at": "2026-01-01T00:00:00Z"
                            }
                        ]
                    }))
                },
            ),
        );
        let base = start_remote(remote).await;

        let assets = store(&base).search("folder:posts", 2).await.unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].identifier, "posts/new");
        assert_eq!(assets[1].namespace, "posts");
    }

    /// 存在しないアセットのメタデータ取得は404を保ったまま返る
    #[tokio::test]
    async fn test_asset_info_not_found() {
        let remote = Router::new().route(
            "/v1_1/demo/resources/image/upload/{*public_id}",
            get(|Path(public_id): Path<String>| async move {
                if public_id == "posts/exists" {
                    (
                        StatusCode::OK,
                        Json(serde_json::json!({
                            "public_id": "posts/exists",
                            "secure_url": "https://res.example.com/demo/image/upload/posts/exists.webp",
                            "resource_type": "image",
                            "format": "webp",
                            "width": 10,
                            "height": 20,
                            "bytes": 99
                        })),
                    )
                } else {
                    (
                        StatusCode::NOT_FOUND,
                        Json(serde_json::json!({
                            "error": {"message": format!("Resource not found - {public_id}")}
                        })),
                    )
                }
            }),
        );
        let base = start_remote(remote).await;
        let store = store(&base);

        let asset = store
            .asset_info("posts/exists", ResourceKind::Image)
            .await
            .unwrap();
        assert_eq!(asset.format, "webp");
        assert_eq!(asset.byte_size, 99);

        let err = store
            .asset_info("posts/missing", ResourceKind::Image)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::RemoteStorage {
                status: Some(404),
                ..
            }
        ));
        assert!(err.to_string().contains("posts/missing"));
    }

    /// プリセット登録
    #[tokio::test]
    async fn test_create_preset() {
        let remote = Router::new().route(
            "/v1_1/demo/upload_presets",
            post(
                |headers: HeaderMap, Form(fields): Form<BTreeMap<String, String>>| async move {
                    assert!(has_admin_auth(&headers));
                    assert_eq!(fields["unsigned"], "true");
                    assert_eq!(fields["folder"], "avatars");
                    assert_eq!(fields["resource_type"], "image");
                    assert_eq!(fields["allowed_formats"], "jpg,png");
                    Json(serde_json::json!({ "message": "created", "name": fields["name"] }))
                },
            ),
        );
        let base = start_remote(remote).await;

        let options = PresetOptions {
            folder: Some("avatars".to_string()),
            resource_kind: Some(ResourceKind::Image),
            allowed_formats: vec!["jpg".to_string(), "png".to_string()],
        };
        let preset = store(&base)
            .create_preset("avatar_unsigned", &options)
            .await
            .unwrap();
        assert_eq!(preset.name, "avatar_unsigned");
        assert_eq!(preset.message, "created");
        assert_eq!(preset.options, options);
    }
}
