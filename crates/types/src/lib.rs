//! # メディアパイプライン 共有型定義
//!
//! アップロードゲートウェイ・リレー・CLIで共有するデータ構造。
//!
//! ## シリアライズ規則
//! - フィールド名は snake_case
//! - 列挙値は小文字 (`"image"`, `"video"` 等)
//! - 省略可能なフィールドは `None` の場合に出力しない

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// リソース種別
// ---------------------------------------------------------------------------

/// メディアのカテゴリ。適用可能な変換バリアントを決定する。
///
/// アップロード時にはリモートサービスがコンテンツから自動判定するため、
/// 呼び出し側が指定するのは削除・検索・変換時のみ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// 静止画
    Image,
    /// 動画
    Video,
    /// 音声
    Audio,
    /// その他のバイナリ
    Raw,
}

impl ResourceKind {
    /// 小文字の識別子を返す。
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Video => "video",
            ResourceKind::Audio => "audio",
            ResourceKind::Raw => "raw",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(ResourceKind::Image),
            "video" => Ok(ResourceKind::Video),
            "audio" => Ok(ResourceKind::Audio),
            "raw" => Ok(ResourceKind::Raw),
            other => Err(format!("不明なリソース種別: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// 画像・動画の幅と高さ（ピクセル）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// 保存済みメディアオブジェクトの正規レコード。
///
/// リモート書き込みが成功した後にのみ生成される。
/// 配信URLはここに保存せず、`identifier` から都度導出する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// 名前空間内で一意な識別子（変換・削除・参照の唯一のキー）
    pub identifier: String,
    /// リモートサービスが返した基本取得URL
    pub secure_url: String,
    /// コンテンツから自動判定されたリソース種別
    pub resource_kind: ResourceKind,
    /// 具体的なエンコーディング (例: "jpg", "mp4")
    pub format: String,
    /// 幅・高さ（画像・動画のみ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    /// 再生時間（秒、動画・音声のみ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// アップロード後に報告されたバイトサイズ
    pub byte_size: u64,
    /// 格納先の論理フォルダパス
    pub namespace: String,
    /// リモートサービス上の作成日時（RFC 3339）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

// ---------------------------------------------------------------------------
// ライフサイクル操作
// ---------------------------------------------------------------------------

/// 削除操作の結果。リモートサービスの報告をそのまま保持する。
///
/// 既に存在しない識別子の削除も特別扱いせず、
/// プロバイダの結果文字列（例: `"not found"`）を通過させる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// 識別子ごとの結果 (例: `"deleted"`, `"not_found"`)
    pub results: Vec<DeleteResult>,
}

/// 単一識別子の削除結果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub identifier: String,
    pub result: String,
}

/// アップロードプリセットの作成オプション。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetOptions {
    /// アップロード先フォルダ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// リソース種別（未指定ならリモートの自動判定）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_kind: Option<ResourceKind>,
    /// 許可するフォーマット (例: `["jpg", "png"]`)
    #[serde(default)]
    pub allowed_formats: Vec<String>,
}

/// 登録済みアップロードプリセットの記述子。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub options: PresetOptions,
    /// リモートサービスの応答メッセージ (例: `"created"`)
    pub message: String,
}

// ---------------------------------------------------------------------------
// 変換オプション
// ---------------------------------------------------------------------------

/// 変換バリアント。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformVariant {
    /// 最適化画像
    OptimizedImage,
    /// 動画サムネイル（常に静止画フォーマット）
    VideoThumbnail,
    /// 最適化動画配信
    OptimizedVideo,
    /// プレビュークリップ
    PreviewClip,
}

/// 変換オプション。未指定の値はバリアントごとのデフォルトで補完される。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// 品質 (`"auto"`, `"auto:good"`, `"80"` 等)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// 出力フォーマット
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// クロップモード (`"fill"`, `"fit"`, `"limit"` 等)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<String>,
    /// クリップ長（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// クリップ開始オフセット（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<f64>,
}

// ---------------------------------------------------------------------------
// ゲートウェイ HTTP API
// ---------------------------------------------------------------------------

/// アップロードのバリデーションプロファイル。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadProfile {
    /// 一般（投稿・出品・チャット添付等）
    #[default]
    General,
    /// プロフィール画像
    ProfilePicture,
}

/// POST /uploads/remote リクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteUploadRequest {
    /// フィールド名（識別子の接頭辞になる）
    pub field: String,
    /// 宣言されたMIMEタイプ
    pub content_type: String,
    /// リモートサービスに取得させるURL
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default)]
    pub profile: UploadProfile,
}

/// POST /uploads/base64 リクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Base64UploadRequest {
    pub field: String,
    /// 宣言されたMIMEタイプ（data URIの場合はURI側が優先）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Base64文字列、または `data:<mime>;base64,<payload>` 形式
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default)]
    pub profile: UploadProfile,
}

/// POST /transform リクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRequest {
    pub identifier: String,
    pub resource_kind: ResourceKind,
    pub variant: TransformVariant,
    #[serde(default)]
    pub options: TransformOptions,
}

/// POST /transform レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformResponse {
    pub url: String,
}

/// POST /assets/delete リクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub identifiers: Vec<String>,
    pub resource_kind: ResourceKind,
}

/// POST /assets/search リクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// 検索式 (例: `"folder:posts AND resource_type:image"`)
    pub expression: String,
    /// 最大件数（未指定時は30）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// POST /assets/search レスポンス（新しい順）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub assets: Vec<Asset>,
}

/// POST /assets/info リクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetInfoRequest {
    pub identifier: String,
    pub resource_kind: ResourceKind,
}

/// POST /presets リクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePresetRequest {
    pub name: String,
    #[serde(flatten)]
    pub options: PresetOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!("Video".parse::<ResourceKind>().unwrap(), ResourceKind::Video);
        assert_eq!(" raw ".parse::<ResourceKind>().unwrap(), ResourceKind::Raw);
        assert!("document".parse::<ResourceKind>().is_err());
    }

    /// 省略可能フィールドが出力されないことを確認
    #[test]
    fn test_asset_skips_absent_fields() {
        let asset = Asset {
            identifier: "posts/file_1_abc".to_string(),
            secure_url: "https://res.example.com/x.mp3".to_string(),
            resource_kind: ResourceKind::Audio,
            format: "mp3".to_string(),
            dimensions: None,
            duration: Some(12.5),
            byte_size: 2048,
            namespace: "posts".to_string(),
            created_at: None,
        };
        let value = serde_json::to_value(&asset).unwrap();
        assert_eq!(value["resource_kind"], "audio");
        assert!(value.get("dimensions").is_none());
        assert!(value.get("created_at").is_none());
        assert_eq!(value["duration"], 12.5);
    }

    #[test]
    fn test_transform_request_defaults() {
        let req: TransformRequest = serde_json::from_value(serde_json::json!({
            "identifier": "clips/a",
            "resource_kind": "video",
            "variant": "video_thumbnail"
        }))
        .unwrap();
        assert_eq!(req.variant, TransformVariant::VideoThumbnail);
        assert_eq!(req.options, TransformOptions::default());
    }

    #[test]
    fn test_preset_request_flattened() {
        let req: CreatePresetRequest = serde_json::from_value(serde_json::json!({
            "name": "avatars",
            "folder": "profile-pictures",
            "resource_kind": "image",
            "allowed_formats": ["jpg", "png"]
        }))
        .unwrap();
        assert_eq!(req.options.folder.as_deref(), Some("profile-pictures"));
        assert_eq!(req.options.resource_kind, Some(ResourceKind::Image));
        assert_eq!(req.options.allowed_formats.len(), 2);
    }
}
