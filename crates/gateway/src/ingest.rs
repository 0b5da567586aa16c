//! # アップロードの取り込み
//!
//! 受け入れ判定 → 識別子生成 → ストレージアダプタへの書き込み、の一連の流れ。
//! 3つの取り込みモード（バイト列 / リモートURL / Base64）で共通に使う。

use media_core::{generate_identifier, namespace_for, AdmissionRequest};
use media_types::{Asset, UploadProfile};

use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::storage::UploadTarget;

/// 一般プロファイルのデフォルトフォルダ
pub const DEFAULT_GENERAL_FOLDER: &str = "uploads";
/// プロフィール画像のデフォルトフォルダ
pub const DEFAULT_PROFILE_PICTURE_FOLDER: &str = "profile-pictures";

fn default_folder(profile: UploadProfile) -> &'static str {
    match profile {
        UploadProfile::General => DEFAULT_GENERAL_FOLDER,
        UploadProfile::ProfilePicture => DEFAULT_PROFILE_PICTURE_FOLDER,
    }
}

/// 1件のアップロードを受け入れ、リモートストレージに書き込む。
///
/// 受け入れ判定で拒否された場合はストレージに一切触れない。
/// URLモードでは取り込み後の実サイズを再検証し、超過していればアセットを削除してから拒否する。
pub async fn admit_upload(
    state: &GatewayState,
    profile: UploadProfile,
    folder: Option<&str>,
    request: AdmissionRequest,
) -> Result<Asset, GatewayError> {
    let folder = folder
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(default_folder(profile));
    let namespace = namespace_for(state.root_folder.as_deref(), folder)?;

    let field = request.field.clone();
    let admitted = state
        .upload_gateway
        .admit(profile, request)
        .inspect_err(|e| {
            tracing::warn!(field = %field, profile = ?profile, error = %e, "アップロードを拒否");
        })?;

    tracing::info!(
        field = %admitted.field,
        mime_type = %admitted.content_type,
        size = ?admitted.realized_size,
        namespace = %namespace,
        "アップロードを受け入れ"
    );

    let target = UploadTarget {
        namespace,
        identifier: generate_identifier(&admitted.field),
        content_type: admitted.content_type.clone(),
    };
    let size_known = admitted.realized_size.is_some();
    let asset = state.store.upload(admitted.payload, &target).await?;

    if !size_known {
        if let Err(e) = state
            .upload_gateway
            .verify_realized_size(profile, asset.byte_size)
        {
            tracing::warn!(
                identifier = %asset.identifier,
                byte_size = asset.byte_size,
                error = %e,
                "取り込み後のサイズが上限を超過したため削除"
            );
            if let Err(destroy_err) = state
                .store
                .destroy(&asset.identifier, asset.resource_kind)
                .await
            {
                tracing::error!(
                    identifier = %asset.identifier,
                    error = %destroy_err,
                    "サイズ超過アセットの削除に失敗"
                );
            }
            return Err(e.into());
        }
    }

    Ok(asset)
}
