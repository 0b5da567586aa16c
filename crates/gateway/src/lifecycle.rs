//! # ライフサイクル管理
//!
//! 保存済みアセットの削除・検索・メタデータ取得と、
//! 直接アップロード用プリセットの登録。リモートへ送る前に入力を検証する。

use std::sync::Arc;

use media_core::is_valid_identifier;
use media_types::{Asset, DeleteOutcome, PresetDescriptor, PresetOptions, ResourceKind};

use crate::error::GatewayError;
use crate::storage::MediaStore;

/// 検索件数のデフォルト
pub const DEFAULT_SEARCH_LIMIT: u32 = 30;
/// 検索件数の上限（プロバイダの最大値）
pub const MAX_SEARCH_LIMIT: u32 = 500;
/// 一括削除1回あたりの識別子数の上限
pub const MAX_BULK_DELETE: usize = 100;

#[derive(Clone)]
pub struct LifecycleManager {
    store: Arc<dyn MediaStore>,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn MediaStore>) -> Self {
        Self { store }
    }

    /// 単一アセットを削除する。存在しない識別子はプロバイダの報告どおりに返す。
    pub async fn delete_asset(
        &self,
        identifier: &str,
        kind: ResourceKind,
    ) -> Result<DeleteOutcome, GatewayError> {
        check_identifier(identifier)?;
        self.store.destroy(identifier, kind).await
    }

    /// 複数アセットを一括削除する。1件だけなら単一削除を使う。
    pub async fn delete_assets(
        &self,
        identifiers: &[String],
        kind: ResourceKind,
    ) -> Result<DeleteOutcome, GatewayError> {
        match identifiers {
            [] => Err(GatewayError::BadRequest(
                "削除する識別子が指定されていません".to_string(),
            )),
            [single] => self.delete_asset(single, kind).await,
            many if many.len() > MAX_BULK_DELETE => Err(GatewayError::BadRequest(format!(
                "一括削除は{MAX_BULK_DELETE}件までです（指定: {}件）",
                many.len()
            ))),
            many => {
                for identifier in many {
                    check_identifier(identifier)?;
                }
                self.store.destroy_many(many, kind).await
            }
        }
    }

    /// 検索式に一致するアセットを新しい順に返す。
    pub async fn search_assets(
        &self,
        expression: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Asset>, GatewayError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(GatewayError::BadRequest("検索式が空です".to_string()));
        }
        let limit = match limit {
            None => DEFAULT_SEARCH_LIMIT,
            Some(0) => {
                return Err(GatewayError::BadRequest(
                    "検索件数は1以上である必要があります".to_string(),
                ))
            }
            Some(n) => n.min(MAX_SEARCH_LIMIT),
        };

        let mut assets = self.store.search(expression, limit).await?;
        // 作成日時の降順。日時が無いものは末尾
        assets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        assets.truncate(limit as usize);
        Ok(assets)
    }

    /// アップロードプリセットを登録する。
    pub async fn create_preset(
        &self,
        name: &str,
        options: &PresetOptions,
    ) -> Result<PresetDescriptor, GatewayError> {
        let valid_name = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_name {
            return Err(GatewayError::BadRequest(format!(
                "不正なプリセット名: {name:?}"
            )));
        }
        if let Some(folder) = &options.folder {
            media_core::namespace_for(None, folder)?;
        }
        if let Some(format) = options
            .allowed_formats
            .iter()
            .find(|f| f.is_empty() || !f.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Err(GatewayError::BadRequest(format!(
                "不正なフォーマット指定: {format:?}"
            )));
        }
        self.store.create_preset(name, options).await
    }

    /// 現在のアセットメタデータを取得する。
    pub async fn fetch_asset_info(
        &self,
        identifier: &str,
        kind: ResourceKind,
    ) -> Result<Asset, GatewayError> {
        check_identifier(identifier)?;
        self.store.asset_info(identifier, kind).await
    }
}

fn check_identifier(identifier: &str) -> Result<(), GatewayError> {
    if is_valid_identifier(identifier) {
        Ok(())
    } else {
        Err(GatewayError::BadRequest(format!(
            "不正な識別子: {identifier:?}"
        )))
    }
}
