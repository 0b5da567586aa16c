//! # アップロード受け入れ判定
//!
//! フィーチャー（投稿・プロフィール画像・出品・チャット添付・配信サムネイル）から
//! 届いたアップロードを、ストレージへ渡す前に検証する。
//!
//! ## プロファイル
//! - 一般: 画像・動画・音声の明示的な許可リスト、設定可能なファイル/フィールド上限
//! - プロフィール画像: jpeg/jpg/png/gif/webp のみ、15MB固定上限を二重に検証
//!
//! 拒否は常にリモート呼び出しの前に行い、エラーには
//! 拒否したMIMEタイプまたは計測したサイズを含める。

use std::fmt;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use media_types::UploadProfile;

// ---------------------------------------------------------------------------
// 上限値・許可リスト
// ---------------------------------------------------------------------------

/// 1MB（バイト）
pub const MB: u64 = 1024 * 1024;

/// 一般プロファイルのファイルサイズ上限のデフォルト（MB）
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 200;

/// プロフィール画像の固定上限（バイト）: 15MB
pub const PROFILE_PICTURE_MAX_BYTES: u64 = 15 * MB;

/// Content-Typeが宣言されていない場合に仮定するMIMEタイプ
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// 一般プロファイルで許可するMIMEタイプ。
pub const DEFAULT_GENERAL_MIME_TYPES: &[&str] = &[
    // 画像
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/avif",
    "image/heic",
    // 動画
    "video/mp4",
    "video/webm",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-matroska",
    "video/mpeg",
    "video/ogg",
    // 音声
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/x-wav",
    "audio/ogg",
    "audio/webm",
    "audio/aac",
    "audio/mp4",
    "audio/x-m4a",
    "audio/flac",
];

/// プロフィール画像プロファイルで許可するMIMEタイプ。
pub const DEFAULT_PROFILE_PICTURE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

// ---------------------------------------------------------------------------
// エラー型
// ---------------------------------------------------------------------------

/// MB単位で表示するバイト数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Megabytes(pub u64);

impl Megabytes {
    /// 元のバイト数
    pub fn bytes(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Megabytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}MB", self.0 as f64 / MB as f64)
    }
}

/// 受け入れ判定のエラー型。呼び出し側が入力を修正すれば回復可能。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// 許可リストにないMIMEタイプ
    #[error("許可されていないファイル形式です: {mime_type}")]
    UnsupportedMimeType { mime_type: String },
    /// ファイルサイズ上限超過
    #[error("ファイルサイズが上限を超えています: {size} (上限: {limit})")]
    PayloadTooLarge { size: Megabytes, limit: Megabytes },
    /// プロフィール画像の固定上限超過
    #[error("プロフィール画像は15MB以下である必要があります（現在のサイズ: {size}）")]
    ProfilePictureTooLarge { size: Megabytes },
    /// テキストフィールドのサイズ上限超過
    #[error("フィールド {field} のサイズが上限を超えています: {size} (上限: {limit})")]
    FieldTooLarge {
        field: String,
        size: Megabytes,
        limit: Megabytes,
    },
    /// 2つ目以降のファイル
    #[error("1リクエストにつきアップロードできるファイルは1つです")]
    TooManyFiles,
    /// ストリームもリモート参照も無い
    #[error("有効なファイルが送信されていません")]
    MissingFile,
    /// URL・Base64の形式不正
    #[error("不正なアップロードソース: {0}")]
    InvalidSource(String),
    /// 名前空間（フォルダ）の形式不正
    #[error("不正な名前空間: {0}")]
    InvalidNamespace(String),
}

// ---------------------------------------------------------------------------
// プロファイルごとの規則
// ---------------------------------------------------------------------------

/// 1プロファイル分の受け入れ規則。起動時に構築され、以後変更されない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRules {
    /// 許可するMIMEタイプ（正規化済み、小文字）
    pub allowed_mime_types: Vec<String>,
    /// ファイル1つあたりの上限（バイト）
    pub max_file_bytes: u64,
    /// テキストフィールド1つあたりの上限（バイト）
    pub max_field_bytes: u64,
}

impl UploadRules {
    /// 一般プロファイルの規則。
    ///
    /// フィールド上限が未指定の場合は max(200MB, ファイル上限) を使う。
    pub fn general(max_file_mb: u64, max_field_mb: Option<u64>) -> Self {
        let max_field_mb =
            max_field_mb.unwrap_or_else(|| max_file_mb.max(DEFAULT_MAX_FILE_SIZE_MB));
        Self {
            allowed_mime_types: normalize_all(DEFAULT_GENERAL_MIME_TYPES.iter().copied()),
            max_file_bytes: max_file_mb.saturating_mul(MB),
            max_field_bytes: max_field_mb.saturating_mul(MB),
        }
    }

    /// プロフィール画像プロファイルの規則。ファイル上限は15MB固定。
    pub fn profile_picture() -> Self {
        Self {
            allowed_mime_types: normalize_all(
                DEFAULT_PROFILE_PICTURE_MIME_TYPES.iter().copied(),
            ),
            max_file_bytes: PROFILE_PICTURE_MAX_BYTES,
            max_field_bytes: DEFAULT_MAX_FILE_SIZE_MB * MB,
        }
    }

    /// 許可リストを差し替える。
    pub fn with_allowed_mime_types<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_mime_types = mime_types
            .into_iter()
            .map(|m| normalize_mime(m.as_ref()))
            .filter(|m| !m.is_empty())
            .collect();
        self
    }

    /// 正規化済みMIMEタイプが許可リストに含まれるか。
    pub fn allows(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.iter().any(|m| m == mime_type)
    }
}

/// MIMEタイプを正規化する（パラメータ除去・小文字化）。
///
/// `"Image/PNG; charset=binary"` → `"image/png"`
pub fn normalize_mime(raw: &str) -> String {
    raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

fn normalize_all<'a>(mime_types: impl Iterator<Item = &'a str>) -> Vec<String> {
    mime_types.map(normalize_mime).collect()
}

// ---------------------------------------------------------------------------
// 受け入れリクエスト
// ---------------------------------------------------------------------------

/// アップロードの取り込み元。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// 受信済みのバイト列
    Bytes(Vec<u8>),
    /// リモートサービスに取得させるURL
    RemoteUrl(String),
    /// Base64文字列、または `data:<mime>;base64,<payload>`
    Base64(String),
    /// 何も届かなかった
    Empty,
}

/// 1回の受け入れ判定の入力。
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    /// 宣言されたフィールド名（識別子の接頭辞）
    pub field: String,
    /// 宣言されたContent-Type
    pub content_type: Option<String>,
    pub source: UploadSource,
}

/// ストレージアダプタへ渡すペイロード。3つの取り込みモードは等価に扱われる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPayload {
    /// バイト列
    Bytes(Vec<u8>),
    /// リモートURL
    RemoteUrl(String),
    /// data URI (`data:<mime>;base64,<payload>`)
    DataUri(String),
}

/// 受け入れ判定を通過したアップロード。
#[derive(Debug, Clone)]
pub struct AdmittedUpload {
    pub profile: UploadProfile,
    pub field: String,
    /// 正規化済みMIMEタイプ
    pub content_type: String,
    pub payload: UploadPayload,
    /// 実バイトサイズ（URLモードでは取り込み後まで不明）
    pub realized_size: Option<u64>,
}

// ---------------------------------------------------------------------------
// アップロードゲートウェイ
// ---------------------------------------------------------------------------

/// プロファイル別の受け入れ判定。
///
/// 状態は起動時に確定した規則のみで、リクエスト間で共有される可変状態を持たない。
#[derive(Debug, Clone)]
pub struct UploadGateway {
    general: UploadRules,
    profile_picture: UploadRules,
}

impl Default for UploadGateway {
    fn default() -> Self {
        Self::new(
            UploadRules::general(DEFAULT_MAX_FILE_SIZE_MB, None),
            UploadRules::profile_picture(),
        )
    }
}

impl UploadGateway {
    pub fn new(general: UploadRules, profile_picture: UploadRules) -> Self {
        Self {
            general,
            profile_picture,
        }
    }

    /// プロファイルに対応する規則を返す。
    pub fn rules(&self, profile: UploadProfile) -> &UploadRules {
        match profile {
            UploadProfile::General => &self.general,
            UploadProfile::ProfilePicture => &self.profile_picture,
        }
    }

    /// 宣言されたMIMEタイプを検証する。バイトを読む前に呼ぶこと。
    pub fn check_mime_type(
        &self,
        profile: UploadProfile,
        content_type: Option<&str>,
    ) -> Result<String, ValidationError> {
        let mime_type = normalize_mime(content_type.unwrap_or(FALLBACK_MIME_TYPE));
        let mime_type = if mime_type.is_empty() {
            FALLBACK_MIME_TYPE.to_string()
        } else {
            mime_type
        };
        if self.rules(profile).allows(&mime_type) {
            Ok(mime_type)
        } else {
            Err(ValidationError::UnsupportedMimeType { mime_type })
        }
    }

    /// ファイルサイズの構造的な上限チェック。
    pub fn check_file_size(&self, profile: UploadProfile, size: u64) -> Result<(), ValidationError> {
        let limit = self.rules(profile).max_file_bytes;
        if size > limit {
            return Err(oversized(profile, size, limit));
        }
        Ok(())
    }

    /// 上限超過が確定したときのエラー。`size` は計測できた範囲のサイズ。
    pub fn size_exceeded(&self, profile: UploadProfile, size: u64) -> ValidationError {
        let limit = self.rules(profile).max_file_bytes;
        oversized(profile, size.max(limit.saturating_add(1)), limit)
    }

    /// テキストフィールドのサイズチェック。
    pub fn check_field_size(
        &self,
        profile: UploadProfile,
        field: &str,
        size: u64,
    ) -> Result<(), ValidationError> {
        let limit = self.rules(profile).max_field_bytes;
        if size > limit {
            return Err(ValidationError::FieldTooLarge {
                field: field.to_string(),
                size: Megabytes(size),
                limit: Megabytes(limit),
            });
        }
        Ok(())
    }

    /// 受け入れ後の実サイズを明示的に再検証する。
    ///
    /// プロフィール画像は規則の値に関わらず15MB固定上限で判定する。
    pub fn verify_realized_size(
        &self,
        profile: UploadProfile,
        size: u64,
    ) -> Result<(), ValidationError> {
        match profile {
            UploadProfile::ProfilePicture if size > PROFILE_PICTURE_MAX_BYTES => {
                Err(ValidationError::ProfilePictureTooLarge {
                    size: Megabytes(size),
                })
            }
            UploadProfile::ProfilePicture => Ok(()),
            UploadProfile::General => self.check_file_size(profile, size),
        }
    }

    /// 1件のアップロードを受け入れ判定する。
    ///
    /// 成功時は実サイズの再検証も済んだ [`AdmittedUpload`] を返す。
    pub fn admit(
        &self,
        profile: UploadProfile,
        request: AdmissionRequest,
    ) -> Result<AdmittedUpload, ValidationError> {
        let AdmissionRequest {
            field,
            content_type,
            source,
        } = request;

        let (content_type, payload, realized_size) = match source {
            UploadSource::Empty => return Err(ValidationError::MissingFile),
            UploadSource::Bytes(data) => {
                if data.is_empty() {
                    return Err(ValidationError::MissingFile);
                }
                let mime_type = self.check_mime_type(profile, content_type.as_deref())?;
                let size = data.len() as u64;
                self.check_file_size(profile, size)?;
                (mime_type, UploadPayload::Bytes(data), Some(size))
            }
            UploadSource::RemoteUrl(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Err(ValidationError::MissingFile);
                }
                self.check_field_size(profile, &field, raw.len() as u64)?;
                let parsed = url::Url::parse(raw)
                    .map_err(|e| ValidationError::InvalidSource(format!("URLの解析に失敗: {e}")))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ValidationError::InvalidSource(format!(
                        "未対応のURLスキーム: {}",
                        parsed.scheme()
                    )));
                }
                let mime_type = self.check_mime_type(profile, content_type.as_deref())?;
                (mime_type, UploadPayload::RemoteUrl(parsed.to_string()), None)
            }
            UploadSource::Base64(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Err(ValidationError::MissingFile);
                }
                self.check_field_size(profile, &field, raw.len() as u64)?;
                let (uri_mime, encoded) = split_data_uri(raw)?;
                let declared = uri_mime.or(content_type.as_deref());
                let mime_type = self.check_mime_type(profile, declared)?;
                let decoded = decode_base64(encoded)?;
                if decoded.is_empty() {
                    return Err(ValidationError::MissingFile);
                }
                let size = decoded.len() as u64;
                self.check_file_size(profile, size)?;
                let data_uri = format!("data:{mime_type};base64,{}", STANDARD.encode(&decoded));
                (mime_type, UploadPayload::DataUri(data_uri), Some(size))
            }
        };

        if let Some(size) = realized_size {
            self.verify_realized_size(profile, size)?;
        }

        Ok(AdmittedUpload {
            profile,
            field,
            content_type,
            payload,
            realized_size,
        })
    }
}

/// プロファイルに応じたサイズ超過エラーを作る。
fn oversized(profile: UploadProfile, size: u64, limit: u64) -> ValidationError {
    match profile {
        UploadProfile::ProfilePicture => ValidationError::ProfilePictureTooLarge {
            size: Megabytes(size),
        },
        UploadProfile::General => ValidationError::PayloadTooLarge {
            size: Megabytes(size),
            limit: Megabytes(limit),
        },
    }
}

/// Base64をデコードする。
///
/// 改行などのASCII空白は無視し、`-`・`_` を含む場合はURLセーフ表記として扱う。
fn decode_base64(encoded: &str) -> Result<Vec<u8>, ValidationError> {
    let cleaned: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let decoded = if cleaned.contains(['-', '_']) {
        URL_SAFE_NO_PAD.decode(cleaned.trim_end_matches('='))
    } else {
        STANDARD.decode(&cleaned)
    };
    decoded.map_err(|e| ValidationError::InvalidSource(format!("Base64デコードに失敗: {e}")))
}

/// `data:<mime>;base64,<payload>` を分解する。data URIでなければ全体をペイロードとみなす。
fn split_data_uri(raw: &str) -> Result<(Option<&str>, &str), ValidationError> {
    let Some(rest) = raw.strip_prefix("data:") else {
        return Ok((None, raw));
    };
    let (header, payload) = rest.split_once(',').ok_or_else(|| {
        ValidationError::InvalidSource("data URIにペイロードがありません".to_string())
    })?;
    let mime = header.strip_suffix(";base64").ok_or_else(|| {
        ValidationError::InvalidSource("data URIはbase64エンコードである必要があります".to_string())
    })?;
    let mime = if mime.is_empty() { None } else { Some(mime) };
    Ok((mime, payload))
}
