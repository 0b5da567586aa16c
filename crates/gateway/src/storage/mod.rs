//! # リモートメディアストレージ
//!
//! バイトの永続化と変換レンダリングは外部のリモートメディアサービスに委譲する。
//! ゲートウェイはこのトレイトを通してのみリモートサービスに触れる。
//!
//! 全操作はリモートの応答を待つ間だけ中断する。暗黙のリトライは行わない。

pub mod remote;

use media_core::UploadPayload;
use media_types::{Asset, DeleteOutcome, PresetDescriptor, PresetOptions, ResourceKind};

use crate::error::GatewayError;

pub use remote::RemoteMediaStore;

/// アップロード先の指定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// 格納先フォルダ
    pub namespace: String,
    /// 受け入れ時に生成した識別子（フォルダを含まない）
    pub identifier: String,
    /// 正規化済みMIMEタイプ
    pub content_type: String,
}

/// リモートメディアサービスの抽象インターフェース。
///
/// 失敗は全て [`GatewayError::RemoteStorage`] としてプロバイダの診断付きで返す。
#[async_trait::async_trait]
pub trait MediaStore: Send + Sync {
    /// ペイロードを書き込み、完全に埋まった [`Asset`] を返す。
    ///
    /// ペイロードは所有権ごと受け取り、送信後はローカルにコピーを残さない。
    ///
    /// リソース種別はリモート側でコンテンツから自動判定する。
    async fn upload(
        &self,
        payload: UploadPayload,
        target: &UploadTarget,
    ) -> Result<Asset, GatewayError>;

    /// 単一アセットを削除する。
    async fn destroy(
        &self,
        identifier: &str,
        kind: ResourceKind,
    ) -> Result<DeleteOutcome, GatewayError>;

    /// 複数アセットを一括削除する。
    async fn destroy_many(
        &self,
        identifiers: &[String],
        kind: ResourceKind,
    ) -> Result<DeleteOutcome, GatewayError>;

    /// 検索式に一致するアセットを新しい順に返す。
    async fn search(&self, expression: &str, max_results: u32) -> Result<Vec<Asset>, GatewayError>;

    /// アップロードプリセットを登録する。
    async fn create_preset(
        &self,
        name: &str,
        options: &PresetOptions,
    ) -> Result<PresetDescriptor, GatewayError>;

    /// 現在のアセットメタデータを取得する。
    async fn asset_info(&self, identifier: &str, kind: ResourceKind) -> Result<Asset, GatewayError>;
}
