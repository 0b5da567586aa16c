//! # アップロードエンドポイント
//!
//! multipartはストリームとして読み、MIMEタイプはバイトを読む前に判定する。
//! ファイル名またはContent-Typeを持つパートをファイルとして扱う。
//! ファイル上限を超えたぶんはバッファせずに数えるだけにして、計測サイズをエラーで返す。

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::Json;
use media_core::{AdmissionRequest, UploadGateway, UploadSource, ValidationError};
use media_types::{Asset, Base64UploadRequest, RemoteUploadRequest, UploadProfile};
use serde::Deserialize;

use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::ingest::admit_upload;

/// フォルダ指定のクエリ
#[derive(Debug, Default, Deserialize)]
pub struct FolderQuery {
    #[serde(default)]
    pub folder: Option<String>,
}

/// multipartボディから読み取った内容
struct MultipartUpload {
    request: AdmissionRequest,
    /// `folder` テキストフィールド
    folder: Option<String>,
}

/// POST /uploads — 一般プロファイルのmultipartアップロード。
pub async fn handle_upload(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<FolderQuery>,
    multipart: Multipart,
) -> Result<Json<Asset>, GatewayError> {
    upload_multipart(&state, UploadProfile::General, query, multipart).await
}

/// POST /uploads/profile-picture — プロフィール画像のmultipartアップロード。
pub async fn handle_upload_profile_picture(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<FolderQuery>,
    multipart: Multipart,
) -> Result<Json<Asset>, GatewayError> {
    upload_multipart(&state, UploadProfile::ProfilePicture, query, multipart).await
}

/// POST /uploads/remote — リモートURLをリモートサービスに取得させる。
pub async fn handle_upload_remote(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<RemoteUploadRequest>,
) -> Result<Json<Asset>, GatewayError> {
    let request = AdmissionRequest {
        field: body.field,
        content_type: Some(body.content_type),
        source: UploadSource::RemoteUrl(body.url),
    };
    let asset = admit_upload(&state, body.profile, body.folder.as_deref(), request).await?;
    Ok(Json(asset))
}

/// POST /uploads/base64 — Base64またはdata URIのペイロードを取り込む。
pub async fn handle_upload_base64(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<Base64UploadRequest>,
) -> Result<Json<Asset>, GatewayError> {
    let request = AdmissionRequest {
        field: body.field,
        content_type: body.content_type,
        source: UploadSource::Base64(body.data),
    };
    let asset = admit_upload(&state, body.profile, body.folder.as_deref(), request).await?;
    Ok(Json(asset))
}

async fn upload_multipart(
    state: &GatewayState,
    profile: UploadProfile,
    query: FolderQuery,
    multipart: Multipart,
) -> Result<Json<Asset>, GatewayError> {
    let upload = read_multipart(&state.upload_gateway, profile, multipart)
        .await
        .inspect_err(|e| tracing::warn!(profile = ?profile, error = %e, "multipartアップロードを拒否"))?;
    let folder = query.folder.or(upload.folder);
    let asset = admit_upload(state, profile, folder.as_deref(), upload.request).await?;
    Ok(Json(asset))
}

/// multipartボディを読む。ファイルパートは1つまで。
async fn read_multipart(
    gateway: &UploadGateway,
    profile: UploadProfile,
    mut multipart: Multipart,
) -> Result<MultipartUpload, GatewayError> {
    let rules = gateway.rules(profile);
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut folder = None;

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        // ファイル名もContent-Typeも無いパートはテキストフィールド
        if field.file_name().is_none() && field.content_type().is_none() {
            let mut size = 0u64;
            let mut value = Vec::new();
            while let Some(chunk) = field.chunk().await.map_err(malformed)? {
                size += chunk.len() as u64;
                if size <= rules.max_field_bytes {
                    value.extend_from_slice(&chunk);
                }
            }
            gateway.check_field_size(profile, &name, size)?;
            if name == "folder" {
                folder = Some(String::from_utf8_lossy(&value).into_owned());
            }
            continue;
        }

        if file.is_some() {
            return Err(ValidationError::TooManyFiles.into());
        }

        // MIMEタイプはバイトを読む前に判定する
        let mime_type = gateway.check_mime_type(profile, field.content_type())?;

        let mut size = 0u64;
        let mut data = Vec::new();
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                    return Err(gateway.size_exceeded(profile, size).into());
                }
                Err(e) => return Err(malformed(e)),
            };
            size += chunk.len() as u64;
            if size <= rules.max_file_bytes {
                data.extend_from_slice(&chunk);
            } else if !data.is_empty() {
                // 上限超過が確定したら以降は数えるだけ
                data = Vec::new();
            }
        }
        gateway.check_file_size(profile, size)?;
        file = Some((name, mime_type, data));
    }

    let request = match file {
        Some((field, content_type, data)) => AdmissionRequest {
            field,
            content_type: Some(content_type),
            source: UploadSource::Bytes(data),
        },
        None => AdmissionRequest {
            field: String::new(),
            content_type: None,
            source: UploadSource::Empty,
        },
    };
    Ok(MultipartUpload { request, folder })
}

fn malformed(e: MultipartError) -> GatewayError {
    GatewayError::BadRequest(format!("multipartの解析に失敗: {}", e.body_text()))
}
