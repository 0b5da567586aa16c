//! # アセット識別子
//!
//! 識別子は `<フィールド名>_<タイムスタンプ(ms)>_<ランダムトークン>` 形式で、
//! 調整役なしに衝突を避けるため受け入れ時に生成する。

use std::time::{SystemTime, UNIX_EPOCH};

use crate::upload::ValidationError;

/// ランダムトークンの長さ
const TOKEN_LEN: usize = 9;

/// フィールド名が空・不正な場合に使う接頭辞
const DEFAULT_FIELD: &str = "file";

/// 新しい識別子を生成する。
pub fn generate_identifier(field: &str) -> String {
    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let token = uuid::Uuid::new_v4().simple().to_string();
    compose_identifier(field, timestamp_ms, &token[..TOKEN_LEN])
}

/// 各要素から識別子を組み立てる。
///
/// フィールド名は英数字・`-`・`_` 以外を `-` に置き換える。
pub fn compose_identifier(field: &str, timestamp_ms: u128, token: &str) -> String {
    format!("{}_{timestamp_ms}_{token}", sanitize_field(field))
}

fn sanitize_field(field: &str) -> String {
    let sanitized: String = field
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches('-');
    if sanitized.is_empty() {
        DEFAULT_FIELD.to_string()
    } else {
        sanitized.to_string()
    }
}

/// 識別子として使える文字列か判定する。
///
/// `/` 区切りの各セグメントが空でなく、英数字・`-`・`_`・`.` のみからなり、
/// `.` や `..` ではないこと。
pub fn is_valid_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier.split('/').all(|segment| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        })
}

/// ルートフォルダとフィーチャー別フォルダから名前空間を組み立てる。
///
/// 各セグメントは英数字・`-`・`_` のみ許可する。
pub fn namespace_for(root: Option<&str>, folder: &str) -> Result<String, ValidationError> {
    let segments: Vec<&str> = root
        .into_iter()
        .chain(std::iter::once(folder))
        .flat_map(|part| part.split('/'))
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        return Err(ValidationError::InvalidNamespace(folder.to_string()));
    }
    for segment in &segments {
        let valid = segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ValidationError::InvalidNamespace(folder.to_string()));
        }
    }
    Ok(segments.join("/"))
}
