//! # ターゲット許可ポリシー
//!
//! ターゲットURLを構造的に解析してから判定する。IPアドレスの表記揺れ
//! （10進整数・16進・IPv4射影IPv6など）はURLパーサが正規化した結果で判定する。
//!
//! - スキームは http / https のみ
//! - ユーザー情報付きURLは拒否
//! - IPアドレスは許可CIDRのいずれかに含まれること
//! - ホスト名は許可ホスト名リストに完全一致すること

use std::net::IpAddr;

use ipnetwork::IpNetwork;
use url::{Host, Url};

use crate::error::RelayError;

/// 許可CIDRのデフォルト。ループバックとプライベートアドレス（RFC 1918）。
/// リンクローカル（169.254.0.0/16, fe80::/10）は含めない。
pub const DEFAULT_ALLOWED_CIDRS: &[&str] = &[
    "127.0.0.0/8",
    "::1/128",
    "10.0.0.0/8",
    "172.16.0.0/12",
    "192.168.0.0/16",
];

/// 許可ホスト名のデフォルト
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &["localhost"];

#[derive(Debug, Clone)]
pub struct TargetPolicy {
    allowed_networks: Vec<IpNetwork>,
    allowed_hosts: Vec<String>,
}

impl TargetPolicy {
    pub fn new(allowed_networks: Vec<IpNetwork>, allowed_hosts: Vec<String>) -> Self {
        Self {
            allowed_networks,
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| normalize_host(&h))
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// ターゲットを解析し、許可されていればURLを返す。
    pub fn check(&self, raw: &str) -> Result<Url, RelayError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RelayError::MissingTarget);
        }
        let url = Url::parse(raw).map_err(|e| RelayError::MalformedTarget(format!("{raw}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(RelayError::ForbiddenTarget(format!(
                "未対応のスキーム: {}",
                url.scheme()
            )));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(RelayError::ForbiddenTarget(
                "ユーザー情報付きのURLは使用できません".to_string(),
            ));
        }

        let allowed = match url.host() {
            Some(Host::Ipv4(ip)) => self.allows_ip(IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => match ip.to_ipv4_mapped() {
                Some(v4) => self.allows_ip(IpAddr::V4(v4)),
                None => self.allows_ip(IpAddr::V6(ip)),
            },
            Some(Host::Domain(domain)) => {
                let domain = normalize_host(domain);
                self.allowed_hosts.iter().any(|h| *h == domain)
            }
            None => {
                return Err(RelayError::MalformedTarget(format!(
                    "ホストがありません: {raw}"
                )))
            }
        };

        if allowed {
            Ok(url)
        } else {
            Err(RelayError::ForbiddenTarget(
                url.host_str().unwrap_or_default().to_string(),
            ))
        }
    }

    fn allows_ip(&self, ip: IpAddr) -> bool {
        self.allowed_networks.iter().any(|network| network.contains(ip))
    }
}

impl Default for TargetPolicy {
    fn default() -> Self {
        let networks = DEFAULT_ALLOWED_CIDRS
            .iter()
            .filter_map(|cidr| cidr.parse().ok())
            .collect();
        let hosts = DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect();
        Self::new(networks, hosts)
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}
