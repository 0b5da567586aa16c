//! # Relay設定・共有状態

use std::time::Duration;

use anyhow::Context;
use ipnetwork::IpNetwork;

use crate::policy::{TargetPolicy, DEFAULT_ALLOWED_CIDRS, DEFAULT_ALLOWED_HOSTS};

/// 待ち受けアドレスのデフォルト
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
/// 上流ボディの上限（MB）のデフォルト
pub const DEFAULT_MAX_BODY_MB: u64 = 50;
/// 上流取得のタイムアウト（固定）
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind_addr: String,
    pub allowed_networks: Vec<IpNetwork>,
    pub allowed_hosts: Vec<String>,
    pub max_body_bytes: u64,
}

impl RelayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let list = |key: &str, default: &[&str]| -> Vec<String> {
            match get(key) {
                Some(v) => v
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                None => default.iter().map(|s| s.to_string()).collect(),
            }
        };

        let allowed_networks = list("RELAY_ALLOWED_CIDRS", DEFAULT_ALLOWED_CIDRS)
            .iter()
            .map(|cidr| {
                cidr.parse::<IpNetwork>()
                    .with_context(|| format!("RELAY_ALLOWED_CIDRS の値が不正です: {cidr}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let max_body_mb = match get("RELAY_MAX_BODY_MB") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("RELAY_MAX_BODY_MB の値が不正です: {v}"))?,
            None => DEFAULT_MAX_BODY_MB,
        };

        let max_body_bytes = max_body_mb
            .checked_mul(1024 * 1024)
            .with_context(|| format!("RELAY_MAX_BODY_MB の値が大きすぎます: {max_body_mb}"))?;

        Ok(Self {
            bind_addr: get("RELAY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            allowed_networks,
            allowed_hosts: list("RELAY_ALLOWED_HOSTS", DEFAULT_ALLOWED_HOSTS),
            max_body_bytes,
        })
    }

    pub fn policy(&self) -> TargetPolicy {
        TargetPolicy::new(self.allowed_networks.clone(), self.allowed_hosts.clone())
    }
}

/// Relayの共有状態。
pub struct RelayState {
    pub http_client: reqwest::Client,
    pub policy: TargetPolicy,
    /// 上流取得（ヘッダー受信からボディ読み切りまで）のタイムアウト
    pub timeout: Duration,
    pub max_body_bytes: u64,
}

impl RelayState {
    pub fn new(config: &RelayConfig) -> anyhow::Result<Self> {
        // リダイレクトで許可リスト外へ誘導されないよう追従しない
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("HTTPクライアントの構築に失敗")?;
        Ok(Self {
            http_client,
            policy: config.policy(),
            timeout: RELAY_TIMEOUT,
            max_body_bytes: config.max_body_bytes,
        })
    }
}
