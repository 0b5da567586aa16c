//! # Media Pipeline Local Relay
//!
//! 内部ネットワーク上のメディアを取得して返す読み取り専用の中継。
//! ターゲットは許可リスト（CIDR・ホスト名）で制限し、取得は固定タイムアウト（10秒）で打ち切る。
//!
//! ## API エンドポイント
//! - `GET /relay?target=<url>` — ターゲットを取得してボディを返す

mod config;
mod error;
mod handler;
mod policy;

use std::sync::Arc;

use axum::routing::get;
use tracing_subscriber::EnvFilter;

use crate::config::{RelayConfig, RelayState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env()?;
    tracing::info!(
        allowed_networks = ?config.allowed_networks,
        allowed_hosts = ?config.allowed_hosts,
        max_body_bytes = config.max_body_bytes,
        "中継ポリシーを設定"
    );

    let state = Arc::new(RelayState::new(&config)?);
    let app = axum::Router::new()
        .route("/relay", get(handler::handle_relay))
        .with_state(state);

    tracing::info!("Relayを {} で起動します", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
