//! # 変換済み配信URLの構築
//!
//! `(識別子, リソース種別, オプション)` から配信URLを導出する純粋関数群。
//! ネットワーク呼び出しは行わず、同じ入力からは常にバイト単位で同一のURLを返す。
//!
//! ## URL形式
//! ```text
//! https://{delivery_host}/{cloud_name}/{image|video|raw}/upload/{変換パラメータ}/{識別子}[.{拡張子}]
//! ```
//! 変換パラメータはキーの辞書順にカンマ区切りで並べる (例: `c_fill,f_jpg,h_300,q_auto,w_400`)。

use media_types::{ResourceKind, TransformOptions, TransformVariant};

use crate::identifier::is_valid_identifier;

// ---------------------------------------------------------------------------
// バリアントごとのデフォルト
// ---------------------------------------------------------------------------

/// 品質のデフォルト
pub const DEFAULT_QUALITY: &str = "auto";
/// 最適化画像のフォーマットのデフォルト
pub const DEFAULT_IMAGE_FORMAT: &str = "auto";
/// 最適化画像のクロップモードのデフォルト
pub const DEFAULT_CROP: &str = "fill";

/// 動画サムネイルの幅
pub const THUMBNAIL_WIDTH: u32 = 400;
/// 動画サムネイルの高さ
pub const THUMBNAIL_HEIGHT: u32 = 300;
/// 動画サムネイルの出力フォーマット（常に静止画）
pub const THUMBNAIL_FORMAT: &str = "jpg";

/// 最適化動画のフォーマットのデフォルト
pub const DEFAULT_VIDEO_FORMAT: &str = "mp4";
/// 最適化動画でサイズ指定がある場合のクロップモード
const VIDEO_RESIZE_CROP: &str = "limit";
/// プログレッシブ配信フラグ
const PROGRESSIVE_FLAG: &str = "progressive";

/// プレビュークリップの長さ（秒）
pub const CLIP_DURATION_SECS: f64 = 10.0;
/// プレビュークリップの開始オフセット（秒）
pub const CLIP_START_OFFSET_SECS: f64 = 0.0;
/// プレビュークリップの幅
pub const CLIP_WIDTH: u32 = 300;
/// プレビュークリップの高さ
pub const CLIP_HEIGHT: u32 = 400;
/// プレビュークリップのコンテナ
pub const CLIP_FORMAT: &str = "mp4";

/// 動画配信で許可するコンテナフォーマット
const VIDEO_CONTAINERS: &[&str] = &["mp4", "webm", "mov", "ogv", "mkv", "m3u8", "mpd"];

// ---------------------------------------------------------------------------
// エラー型
// ---------------------------------------------------------------------------

/// 不正な入力によるURL構築エラー。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// 識別子が空、または使用できない文字を含む
    #[error("不正な識別子: {0:?}")]
    InvalidIdentifier(String),
    /// リソース種別に適用できないバリアント
    #[error("{variant:?} は {kind} に適用できません")]
    UnsupportedVariant {
        variant: TransformVariant,
        kind: ResourceKind,
    },
    /// オプション値の形式不正
    #[error("不正なオプション {name}: {value}")]
    InvalidOption { name: &'static str, value: String },
}

// ---------------------------------------------------------------------------
// URLビルダー
// ---------------------------------------------------------------------------

/// 配信URLビルダー。配信ホストとクラウド名のみを保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    delivery_host: String,
    cloud_name: String,
}

impl UrlBuilder {
    /// 新しいビルダーを作成する。
    ///
    /// `delivery_host` にスキームが付いていても取り除き、常にhttpsで配信する。
    pub fn new(delivery_host: impl Into<String>, cloud_name: impl Into<String>) -> Self {
        let host = delivery_host.into();
        let host = host
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        Self {
            delivery_host: host,
            cloud_name: cloud_name.into().trim().trim_matches('/').to_string(),
        }
    }

    /// バリアントを指定してURLを構築する。
    pub fn build(
        &self,
        identifier: &str,
        kind: ResourceKind,
        variant: TransformVariant,
        options: &TransformOptions,
    ) -> Result<String, TransformError> {
        match (variant, kind) {
            (TransformVariant::OptimizedImage, ResourceKind::Image) => {
                self.optimized_image(identifier, options)
            }
            (TransformVariant::VideoThumbnail, ResourceKind::Video) => {
                self.video_thumbnail(identifier, options)
            }
            (TransformVariant::OptimizedVideo, ResourceKind::Video) => {
                self.optimized_video(identifier, options)
            }
            (TransformVariant::PreviewClip, ResourceKind::Video) => {
                self.preview_clip(identifier, options)
            }
            (variant, kind) => Err(TransformError::UnsupportedVariant { variant, kind }),
        }
    }

    /// 最適化画像。サイズ指定が無い場合はクロップ・リサイズを付けない。
    pub fn optimized_image(
        &self,
        identifier: &str,
        options: &TransformOptions,
    ) -> Result<String, TransformError> {
        let mut t = Transformation::default();
        if options.width.is_some() || options.height.is_some() {
            let crop = options.crop.as_deref().unwrap_or(DEFAULT_CROP);
            t.push("c", token("crop", crop)?);
            t.push_dimensions(options.width, options.height)?;
        }
        t.push("q", quality(options)?);
        let format = options.format.as_deref().unwrap_or(DEFAULT_IMAGE_FORMAT);
        t.push("f", token("format", format)?);
        self.render("image", &t, identifier, None)
    }

    /// 動画サムネイル。出力は常にjpg。
    pub fn video_thumbnail(
        &self,
        identifier: &str,
        options: &TransformOptions,
    ) -> Result<String, TransformError> {
        let mut t = Transformation::default();
        t.push("c", DEFAULT_CROP.to_string());
        t.push_dimensions(
            Some(options.width.unwrap_or(THUMBNAIL_WIDTH)),
            Some(options.height.unwrap_or(THUMBNAIL_HEIGHT)),
        )?;
        t.push("q", quality(options)?);
        t.push("f", THUMBNAIL_FORMAT.to_string());
        self.render("video", &t, identifier, Some(THUMBNAIL_FORMAT))
    }

    /// 最適化動画配信。幅・高さは明示された場合のみ付ける。
    pub fn optimized_video(
        &self,
        identifier: &str,
        options: &TransformOptions,
    ) -> Result<String, TransformError> {
        let format = options.format.as_deref().unwrap_or(DEFAULT_VIDEO_FORMAT);
        let format = token("format", format)?;
        if !VIDEO_CONTAINERS.contains(&format.as_str()) {
            return Err(TransformError::InvalidOption {
                name: "format",
                value: format,
            });
        }

        let mut t = Transformation::default();
        if options.width.is_some() || options.height.is_some() {
            t.push("c", VIDEO_RESIZE_CROP.to_string());
            t.push_dimensions(options.width, options.height)?;
        }
        t.push("q", quality(options)?);
        t.push("f", format.clone());
        t.push("fl", PROGRESSIVE_FLAG.to_string());
        self.render("video", &t, identifier, Some(&format))
    }

    /// プレビュークリップ。開始オフセットと長さを常に含める。
    pub fn preview_clip(
        &self,
        identifier: &str,
        options: &TransformOptions,
    ) -> Result<String, TransformError> {
        let start = options.start_offset.unwrap_or(CLIP_START_OFFSET_SECS);
        if !start.is_finite() || start < 0.0 {
            return Err(TransformError::InvalidOption {
                name: "start_offset",
                value: start.to_string(),
            });
        }
        let duration = options.duration.unwrap_or(CLIP_DURATION_SECS);
        if !duration.is_finite() || duration <= 0.0 {
            return Err(TransformError::InvalidOption {
                name: "duration",
                value: duration.to_string(),
            });
        }

        let mut t = Transformation::default();
        t.push("so", start.to_string());
        t.push("du", duration.to_string());
        t.push("c", DEFAULT_CROP.to_string());
        t.push_dimensions(
            Some(options.width.unwrap_or(CLIP_WIDTH)),
            Some(options.height.unwrap_or(CLIP_HEIGHT)),
        )?;
        t.push("q", quality(options)?);
        t.push("f", CLIP_FORMAT.to_string());
        self.render("video", &t, identifier, Some(CLIP_FORMAT))
    }

    fn render(
        &self,
        delivery_class: &str,
        transformation: &Transformation,
        identifier: &str,
        extension: Option<&str>,
    ) -> Result<String, TransformError> {
        validate_identifier(identifier)?;
        let extension = extension.map(|e| format!(".{e}")).unwrap_or_default();
        Ok(format!(
            "https://{}/{}/{delivery_class}/upload/{}/{identifier}{extension}",
            self.delivery_host,
            self.cloud_name,
            transformation.render()
        ))
    }
}

// ---------------------------------------------------------------------------
// 変換パラメータ
// ---------------------------------------------------------------------------

/// `key_value` 形式のパラメータ列。
#[derive(Default)]
struct Transformation(Vec<(&'static str, String)>);

impl Transformation {
    fn push(&mut self, key: &'static str, value: String) {
        self.0.push((key, value));
    }

    fn push_dimensions(
        &mut self,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<(), TransformError> {
        if let Some(w) = width {
            self.push("w", dimension("width", w)?);
        }
        if let Some(h) = height {
            self.push("h", dimension("height", h)?);
        }
        Ok(())
    }

    /// キーの辞書順で連結する。
    fn render(&self) -> String {
        let mut params: Vec<_> = self.0.iter().collect();
        params.sort_by(|a, b| a.0.cmp(b.0));
        params
            .iter()
            .map(|(k, v)| format!("{k}_{v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn quality(options: &TransformOptions) -> Result<String, TransformError> {
    let value = options.quality.as_deref().unwrap_or(DEFAULT_QUALITY);
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ':');
    if valid {
        Ok(value.to_string())
    } else {
        Err(TransformError::InvalidOption {
            name: "quality",
            value: value.to_string(),
        })
    }
}

fn dimension(name: &'static str, value: u32) -> Result<String, TransformError> {
    if value == 0 {
        return Err(TransformError::InvalidOption {
            name,
            value: value.to_string(),
        });
    }
    Ok(value.to_string())
}

/// 英小文字・数字・`_` のみからなるトークン。
fn token(name: &'static str, value: &str) -> Result<String, TransformError> {
    let value = value.trim().to_ascii_lowercase();
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(value)
    } else {
        Err(TransformError::InvalidOption { name, value })
    }
}

fn validate_identifier(identifier: &str) -> Result<(), TransformError> {
    if is_valid_identifier(identifier) {
        Ok(())
    } else {
        Err(TransformError::InvalidIdentifier(identifier.to_string()))
    }
}
