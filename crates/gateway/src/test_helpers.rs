//! テスト用のモックストレージと状態。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use media_core::UploadPayload;
use media_types::{
    Asset, DeleteOutcome, DeleteResult, Dimensions, PresetDescriptor, PresetOptions, ResourceKind,
};

use crate::config::{GatewayConfig, GatewayState};
use crate::error::GatewayError;
use crate::storage::{MediaStore, UploadTarget};

/// 呼び出し回数を数えるインメモリのMediaStore。
#[derive(Default)]
pub struct MockMediaStore {
    pub upload_calls: AtomicUsize,
    pub destroy_calls: AtomicUsize,
    pub destroy_many_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub preset_calls: AtomicUsize,
    pub info_calls: AtomicUsize,
    /// URLモードでプロバイダが取得したことにするサイズ
    pub remote_fetch_size: Option<u64>,
    pub search_results: Vec<Asset>,
    pub last_search_limit: Mutex<Option<u32>>,
    /// アップロードされたターゲット
    pub uploaded: Mutex<Vec<UploadTarget>>,
    /// 削除された識別子
    pub destroyed: Mutex<Vec<String>>,
}

impl MockMediaStore {
    pub fn total_calls(&self) -> usize {
        [
            &self.upload_calls,
            &self.destroy_calls,
            &self.destroy_many_calls,
            &self.search_calls,
            &self.preset_calls,
            &self.info_calls,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

/// テスト用のアセット
pub fn asset(identifier: &str, created_at: Option<&str>) -> Asset {
    Asset {
        identifier: identifier.to_string(),
        secure_url: format!("https://res.example.com/demo/image/upload/{identifier}.jpg"),
        resource_kind: ResourceKind::Image,
        format: "jpg".to_string(),
        dimensions: Some(Dimensions {
            width: 100,
            height: 100,
        }),
        duration: None,
        byte_size: 1024,
        namespace: identifier
            .rsplit_once('/')
            .map(|(ns, _)| ns.to_string())
            .unwrap_or_default(),
        created_at: created_at.map(str::to_string),
    }
}

#[async_trait::async_trait]
impl MediaStore for MockMediaStore {
    async fn upload(
        &self,
        payload: UploadPayload,
        target: &UploadTarget,
    ) -> Result<Asset, GatewayError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.uploaded.lock().unwrap().push(target.clone());

        let byte_size = match &payload {
            UploadPayload::Bytes(bytes) => bytes.len() as u64,
            UploadPayload::RemoteUrl(_) => self.remote_fetch_size.unwrap_or(1024),
            UploadPayload::DataUri(uri) => uri.len() as u64,
        };
        let (kind, format) = target
            .content_type
            .split_once('/')
            .unwrap_or(("application", "octet-stream"));
        let resource_kind = match kind {
            "image" => ResourceKind::Image,
            "video" => ResourceKind::Video,
            "audio" => ResourceKind::Audio,
            _ => ResourceKind::Raw,
        };
        let identifier = format!("{}/{}", target.namespace, target.identifier);
        Ok(Asset {
            secure_url: format!(
                "https://res.example.com/demo/{}/upload/{identifier}.{format}",
                resource_kind.as_str()
            ),
            identifier,
            resource_kind,
            format: format.to_string(),
            dimensions: None,
            duration: None,
            byte_size,
            namespace: target.namespace.clone(),
            created_at: None,
        })
    }

    async fn destroy(
        &self,
        identifier: &str,
        _kind: ResourceKind,
    ) -> Result<DeleteOutcome, GatewayError> {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        self.destroyed.lock().unwrap().push(identifier.to_string());
        Ok(DeleteOutcome {
            results: vec![DeleteResult {
                identifier: identifier.to_string(),
                result: "ok".to_string(),
            }],
        })
    }

    async fn destroy_many(
        &self,
        identifiers: &[String],
        _kind: ResourceKind,
    ) -> Result<DeleteOutcome, GatewayError> {
        self.destroy_many_calls.fetch_add(1, Ordering::SeqCst);
        self.destroyed
            .lock()
            .unwrap()
            .extend(identifiers.iter().cloned());
        Ok(DeleteOutcome {
            results: identifiers
                .iter()
                .map(|id| DeleteResult {
                    identifier: id.clone(),
                    result: "deleted".to_string(),
                })
                .collect(),
        })
    }

    async fn search(&self, _expression: &str, max_results: u32) -> Result<Vec<Asset>, GatewayError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_search_limit.lock().unwrap() = Some(max_results);
        Ok(self.search_results.clone())
    }

    async fn create_preset(
        &self,
        name: &str,
        options: &PresetOptions,
    ) -> Result<PresetDescriptor, GatewayError> {
        self.preset_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PresetDescriptor {
            name: name.to_string(),
            options: options.clone(),
            message: "created".to_string(),
        })
    }

    async fn asset_info(&self, identifier: &str, _kind: ResourceKind) -> Result<Asset, GatewayError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        if identifier.ends_with("missing") {
            return Err(GatewayError::remote(
                Some(404),
                format!("Resource not found - {identifier}"),
            ));
        }
        Ok(asset(identifier, Some("2026-01-01T00:00:00Z")))
    }
}

/// テスト用の設定
pub fn test_config() -> GatewayConfig {
    let env: HashMap<&str, &str> = [
        ("MEDIA_CLOUD_NAME", "demo"),
        ("MEDIA_API_KEY", "key"),
        ("MEDIA_API_SECRET", "secret"),
        ("MEDIA_DELIVERY_HOST", "res.example.com"),
    ]
    .into_iter()
    .collect();
    GatewayConfig::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap()
}

pub fn test_state(store: Arc<MockMediaStore>) -> Arc<GatewayState> {
    Arc::new(GatewayState::new(&test_config(), store))
}

/// ルーター全体を127.0.0.1の空きポートで起動し、ベースURLを返す。
pub async fn start_gateway(state: Arc<GatewayState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let app = crate::endpoints::router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{port}")
}
