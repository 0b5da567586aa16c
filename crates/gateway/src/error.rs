//! # Gateway エラー型
//!
//! 全エンドポイント・ストレージアダプタで共通のエラー型。

use axum::http::StatusCode;
use media_core::{TransformError, ValidationError};

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 受け入れ判定で拒否（リモートには到達していない）
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// 変換URLの入力不正
    #[error("不正な変換パラメータ: {0}")]
    Transform(#[from] TransformError),
    /// リモートメディアサービスが操作を拒否・失敗した
    #[error("リモートストレージ操作に失敗: {message}")]
    RemoteStorage {
        /// プロバイダが返したHTTPステータス（通信失敗時はNone）
        status: Option<u16>,
        /// プロバイダの診断メッセージ
        message: String,
    },
    /// 起動時の設定不備
    #[error("設定エラー: {0}")]
    Configuration(String),
    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),
    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl GatewayError {
    /// リモートストレージエラーを作る。
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        GatewayError::RemoteStorage {
            status,
            message: message.into(),
        }
    }

    /// HTTPステータスへの対応。
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation(e) => match e {
                ValidationError::UnsupportedMimeType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                ValidationError::PayloadTooLarge { .. }
                | ValidationError::ProfilePictureTooLarge { .. }
                | ValidationError::FieldTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                ValidationError::TooManyFiles
                | ValidationError::MissingFile
                | ValidationError::InvalidSource(_)
                | ValidationError::InvalidNamespace(_) => StatusCode::BAD_REQUEST,
            },
            GatewayError::Transform(_) | GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::RemoteStorage {
                status: Some(404), ..
            } => StatusCode::NOT_FOUND,
            GatewayError::RemoteStorage { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Configuration(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_core::Megabytes;

    #[test]
    fn test_status_mapping() {
        let unsupported = GatewayError::from(ValidationError::UnsupportedMimeType {
            mime_type: "text/html".to_string(),
        });
        assert_eq!(unsupported.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let too_large = GatewayError::from(ValidationError::ProfilePictureTooLarge {
            size: Megabytes(20 * 1024 * 1024),
        });
        assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(too_large.to_string().contains("20.00MB"));

        assert_eq!(
            GatewayError::from(ValidationError::MissingFile).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::remote(Some(404), "Resource not found").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::remote(Some(500), "boom").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::remote(None, "connection refused").status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
