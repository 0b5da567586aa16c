//! # Gatewayエンドポイント
//!
//! - `POST /uploads` / `POST /uploads/profile-picture` — multipartアップロード
//! - `POST /uploads/remote` — リモートURLからの取り込み
//! - `POST /uploads/base64` — Base64ペイロードの取り込み
//! - `POST /transform` — 変換済み配信URLの構築
//! - `POST /assets/delete` / `POST /assets/search` / `POST /assets/info`
//! - `POST /presets` — アップロードプリセット登録
//! - `GET /health`

pub mod assets;
pub mod health;
pub mod presets;
pub mod transform;
pub mod upload;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use media_types::UploadProfile;

use crate::config::GatewayState;

pub use assets::{handle_asset_info, handle_delete_assets, handle_search_assets};
pub use health::handle_health;
pub use presets::handle_create_preset;
pub use transform::handle_transform;
pub use upload::{
    handle_upload, handle_upload_base64, handle_upload_profile_picture, handle_upload_remote,
};

/// 全ルートを組み立てる。
///
/// アップロード系ルートのボディ上限は、一般プロファイルのファイル上限とフィールド上限の和。
/// 個々のファイル・フィールドの上限判定はハンドラ側で行う。
pub fn router(state: Arc<GatewayState>) -> Router {
    let general = state.upload_gateway.rules(UploadProfile::General);
    let body_limit = usize::try_from(general.max_file_bytes.saturating_add(general.max_field_bytes))
        .unwrap_or(usize::MAX);

    let uploads = Router::new()
        .route("/uploads", post(handle_upload))
        .route("/uploads/profile-picture", post(handle_upload_profile_picture))
        .route("/uploads/remote", post(handle_upload_remote))
        .route("/uploads/base64", post(handle_upload_base64))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .merge(uploads)
        .route("/transform", post(handle_transform))
        .route("/assets/delete", post(handle_delete_assets))
        .route("/assets/search", post(handle_search_assets))
        .route("/assets/info", post(handle_asset_info))
        .route("/presets", post(handle_create_preset))
        .route("/health", get(handle_health))
        .with_state(state)
}
