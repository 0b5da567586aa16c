//! # Media Pipeline Gateway
//!
//! アップロードの受け入れ判定・リモートメディアストレージへの書き込み・
//! 変換済み配信URLの構築・アセットのライフサイクル管理を提供するHTTPサービス。
//!
//! ## 役割
//! - プロファイル別（一般 / プロフィール画像）のアップロード受け入れ判定
//! - 3つの取り込みモード（multipart / リモートURL / Base64）
//! - 配信URLの構築（リモートには問い合わせない）
//! - 削除・検索・メタデータ取得・プリセット登録
//!
//! ルート一覧は [`endpoints`] を参照。

mod config;
mod endpoints;
mod error;
mod ingest;
mod lifecycle;
mod storage;
#[cfg(test)]
mod test_helpers;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{GatewayConfig, GatewayState};
use crate::storage::RemoteMediaStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .envは任意
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env()?;
    let store = RemoteMediaStore::from_config(&config)?;
    tracing::info!(
        cloud_name = %config.credentials.cloud_name,
        api_base = %config.api_base,
        delivery_host = %config.delivery_host,
        max_file_size_mb = config.max_file_size_mb,
        "リモートメディアストレージを設定"
    );

    let state = Arc::new(GatewayState::new(&config, Arc::new(store)));
    let app = endpoints::router(state);

    tracing::info!("Gatewayを {} で起動します", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
