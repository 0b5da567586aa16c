//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 設定は起動時に一度だけ読み込み、以後変更しない。

use std::sync::Arc;

use media_core::upload::MB;
use media_core::{UploadGateway, UploadRules, UrlBuilder};

use crate::error::GatewayError;
use crate::lifecycle::LifecycleManager;
use crate::storage::MediaStore;

/// リモートAPIのデフォルトベースURL
pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";
/// 配信ホストのデフォルト
pub const DEFAULT_DELIVERY_HOST: &str = "res.cloudinary.com";
/// 待ち受けアドレスのデフォルト
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
/// リモート呼び出しのタイムアウト（秒）のデフォルト
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// リモートメディアサービスの認証情報。
#[derive(Clone)]
pub struct RemoteCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Gateway設定。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub credentials: RemoteCredentials,
    /// リモートAPIのベースURL
    pub api_base: String,
    /// 配信URLのホスト
    pub delivery_host: String,
    /// 全名前空間の先頭に付けるフォルダ
    pub root_folder: Option<String>,
    /// 一般プロファイルのファイル上限（MB）
    pub max_file_size_mb: u64,
    /// テキストフィールド上限（MB）。未指定なら max(200, ファイル上限)
    pub max_field_size_mb: Option<u64>,
    /// 一般プロファイルの許可MIMEタイプ（未指定ならデフォルト）
    pub allowed_mime_types: Option<Vec<String>>,
    /// プロフィール画像の許可MIMEタイプ（未指定ならデフォルト）
    pub profile_picture_mime_types: Option<Vec<String>>,
    pub bind_addr: String,
    pub http_timeout_secs: u64,
}

impl GatewayConfig {
    /// プロセス環境変数から読み込む。
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー参照関数から読み込む。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| {
            get(key).ok_or_else(|| {
                GatewayError::Configuration(format!("環境変数 {key} が設定されていません"))
            })
        };
        let number = |key: &str| -> Result<Option<u64>, GatewayError> {
            get(key)
                .map(|v| {
                    v.parse::<u64>().map_err(|e| {
                        GatewayError::Configuration(format!("{key} の値が不正です ({v}): {e}"))
                    })
                })
                .transpose()
        };
        let list = |key: &str| {
            get(key).map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
        };

        let credentials = RemoteCredentials {
            cloud_name: require("MEDIA_CLOUD_NAME")?,
            api_key: require("MEDIA_API_KEY")?,
            api_secret: require("MEDIA_API_SECRET")?,
        };

        let max_file_size_mb =
            number("UPLOAD_MAX_FILE_SIZE_MB")?.unwrap_or(media_core::upload::DEFAULT_MAX_FILE_SIZE_MB);
        if max_file_size_mb == 0 {
            return Err(GatewayError::Configuration(
                "UPLOAD_MAX_FILE_SIZE_MB は1以上である必要があります".to_string(),
            ));
        }

        let max_field_size_mb = number("UPLOAD_MAX_FIELD_SIZE_MB")?;
        check_megabytes("UPLOAD_MAX_FILE_SIZE_MB", max_file_size_mb)?;
        if let Some(mb) = max_field_size_mb {
            check_megabytes("UPLOAD_MAX_FIELD_SIZE_MB", mb)?;
        }

        Ok(Self {
            credentials,
            api_base: get("MEDIA_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            delivery_host: get("MEDIA_DELIVERY_HOST")
                .unwrap_or_else(|| DEFAULT_DELIVERY_HOST.to_string()),
            root_folder: get("MEDIA_ROOT_FOLDER"),
            max_file_size_mb,
            max_field_size_mb,
            allowed_mime_types: list("UPLOAD_ALLOWED_MIME_TYPES"),
            profile_picture_mime_types: list("PROFILE_PICTURE_ALLOWED_MIME_TYPES"),
            bind_addr: get("GATEWAY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            http_timeout_secs: number("MEDIA_HTTP_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        })
    }

    /// 設定からプロファイル別の受け入れ判定を構築する。
    pub fn upload_gateway(&self) -> UploadGateway {
        let mut general = UploadRules::general(self.max_file_size_mb, self.max_field_size_mb);
        if let Some(types) = &self.allowed_mime_types {
            general = general.with_allowed_mime_types(types);
        }
        let mut profile_picture = UploadRules::profile_picture();
        if let Some(types) = &self.profile_picture_mime_types {
            profile_picture = profile_picture.with_allowed_mime_types(types);
        }
        UploadGateway::new(general, profile_picture)
    }

    pub fn url_builder(&self) -> UrlBuilder {
        UrlBuilder::new(&self.delivery_host, &self.credentials.cloud_name)
    }
}

/// MB指定がバイト数に換算できる範囲か確認する。
fn check_megabytes(key: &str, mb: u64) -> Result<(), GatewayError> {
    mb.checked_mul(MB).map(|_| ()).ok_or_else(|| {
        GatewayError::Configuration(format!("{key} の値が大きすぎます: {mb}"))
    })
}

/// Gatewayの共有状態。全フィールドは起動後に不変。
pub struct GatewayState {
    /// アップロード受け入れ判定
    pub upload_gateway: UploadGateway,
    /// 配信URLビルダー
    pub url_builder: UrlBuilder,
    /// リモートメディアストレージ（トレイトで抽象化）
    pub store: Arc<dyn MediaStore>,
    /// 削除・検索・プリセット管理
    pub lifecycle: LifecycleManager,
    /// 全名前空間の先頭に付けるフォルダ
    pub root_folder: Option<String>,
}

impl GatewayState {
    pub fn new(config: &GatewayConfig, store: Arc<dyn MediaStore>) -> Self {
        Self {
            upload_gateway: config.upload_gateway(),
            url_builder: config.url_builder(),
            lifecycle: LifecycleManager::new(store.clone()),
            store,
            root_folder: config.root_folder.clone(),
        }
    }
}
