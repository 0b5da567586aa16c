//! # メディアパイプライン Core
//!
//! ネットワークI/Oを持たない純粋なロジック群。
//!
//! ## モジュール
//! - [`upload`]: アップロードの受け入れ判定（一般 / プロフィール画像プロファイル）
//! - [`identifier`]: アセット識別子と名前空間の生成
//! - [`transform`]: 変換済み配信URLの構築
//!
//! ゲートウェイは受け入れ判定を通過したアップロードのみをストレージに渡し、
//! 配信URLは保存せずに [`transform::UrlBuilder`] で都度導出する。

pub mod identifier;
pub mod transform;
pub mod upload;

pub use identifier::{compose_identifier, generate_identifier, is_valid_identifier, namespace_for};
pub use transform::{TransformError, UrlBuilder};
pub use upload::{
    AdmissionRequest, AdmittedUpload, Megabytes, UploadGateway, UploadPayload, UploadRules,
    UploadSource, ValidationError,
};
