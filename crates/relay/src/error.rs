//! # Relay エラー型
//!
//! 「禁止されたターゲット」「タイムアウト」「上流のエラー」は別のステータスで返す。
//! 上流の403・408はRelay自身の拒否・タイムアウトと重なるため502に置き換える。
//! 種別は常に `x-relay-outcome` ヘッダーにも載せる。

use axum::http::{header, HeaderName, HeaderValue, StatusCode};

/// 応答の種別を示すヘッダー
pub const OUTCOME_HEADER: HeaderName = HeaderName::from_static("x-relay-outcome");

/// Relayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// `target` パラメータが無い
    #[error("target パラメータが指定されていません")]
    MissingTarget,
    /// URLとして解釈できない
    #[error("不正なターゲット: {0}")]
    MalformedTarget(String),
    /// 許可リスト外のターゲット
    #[error("許可されていないターゲットです: {0}")]
    ForbiddenTarget(String),
    /// 上流の応答が時間内に完了しなかった
    #[error("上流の応答がタイムアウトしました")]
    Timeout,
    /// 上流が成功以外のステータスを返した
    #[error("上流がエラーを返しました ({status}): {body}")]
    Upstream { status: u16, body: String },
    /// 上流への接続・受信に失敗
    #[error("上流との通信に失敗: {0}")]
    Transport(String),
    /// 上流のボディが上限を超えた
    #[error("上流のボディが上限を超えています (上限: {limit} bytes)")]
    TooLarge { limit: u64 },
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingTarget | RelayError::MalformedTarget(_) => StatusCode::BAD_REQUEST,
            RelayError::ForbiddenTarget(_) => StatusCode::FORBIDDEN,
            RelayError::Timeout => StatusCode::REQUEST_TIMEOUT,
            RelayError::Upstream { status, .. } => match StatusCode::from_u16(*status) {
                Ok(StatusCode::FORBIDDEN | StatusCode::REQUEST_TIMEOUT) | Err(_) => {
                    StatusCode::BAD_GATEWAY
                }
                Ok(status) => status,
            },
            RelayError::Transport(_) | RelayError::TooLarge { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// `x-relay-outcome` ヘッダーの値。
    pub fn outcome(&self) -> &'static str {
        match self {
            RelayError::MissingTarget | RelayError::MalformedTarget(_) => "invalid",
            RelayError::ForbiddenTarget(_) => "forbidden",
            RelayError::Timeout => "timeout",
            RelayError::Upstream { .. } => "upstream",
            RelayError::Transport(_) => "transport",
            RelayError::TooLarge { .. } => "too-large",
        }
    }
}

impl axum::response::IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.status_code(), self.to_string()).into_response();
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        response
            .headers_mut()
            .insert(OUTCOME_HEADER, HeaderValue::from_static(self.outcome()));
        response
    }
}
