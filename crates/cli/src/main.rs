//! # Media Pipeline CLI
//!
//! 運用者向けのコマンドラインツール。
//!
//! ## サブコマンド
//! - `url` — 配信URLをオフラインで構築する（Gatewayに接続しない）
//! - `upload` — ファイルをGateway経由でアップロードする
//! - `delete` / `search` / `info` — アセット管理
//! - `preset` — 直接アップロード用プリセットを登録する

mod client;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use media_core::UrlBuilder;
use media_types::{PresetOptions, ResourceKind, TransformOptions, TransformVariant};

use crate::client::{print_json, GatewayClient};

#[derive(Parser, Debug)]
#[command(name = "media-cli", version, about = "Media pipeline operator CLI")]
struct Cli {
    /// GatewayのベースURL
    #[arg(long, global = true, env = "MEDIA_GATEWAY_URL", default_value = "http://localhost:3000")]
    gateway: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 配信URLを構築する
    Url(UrlArgs),
    /// ファイルをアップロードする
    Upload {
        path: PathBuf,
        /// フォームのフィールド名（識別子の接頭辞になる）
        #[arg(long, default_value = "file")]
        field: String,
        /// 格納先フォルダ
        #[arg(long)]
        folder: Option<String>,
        /// Content-Type（省略時は拡張子から推定）
        #[arg(long)]
        content_type: Option<String>,
        /// プロフィール画像プロファイルで送る
        #[arg(long)]
        profile_picture: bool,
    },
    /// アセットを削除する（複数指定で一括削除）
    Delete {
        #[arg(required = true)]
        identifiers: Vec<String>,
        #[arg(long, default_value = "image")]
        kind: ResourceKind,
    },
    /// アセットを検索する
    Search {
        expression: String,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// アセットのメタデータを取得する
    Info {
        identifier: String,
        #[arg(long, default_value = "image")]
        kind: ResourceKind,
    },
    /// アップロードプリセットを登録する
    Preset {
        name: String,
        #[arg(long)]
        folder: Option<String>,
        #[arg(long)]
        kind: Option<ResourceKind>,
        /// 許可フォーマット（カンマ区切り）
        #[arg(long, value_delimiter = ',')]
        allowed_formats: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Variant {
    Image,
    Thumbnail,
    Video,
    Clip,
}

impl From<Variant> for TransformVariant {
    fn from(v: Variant) -> Self {
        match v {
            Variant::Image => TransformVariant::OptimizedImage,
            Variant::Thumbnail => TransformVariant::VideoThumbnail,
            Variant::Video => TransformVariant::OptimizedVideo,
            Variant::Clip => TransformVariant::PreviewClip,
        }
    }
}

#[derive(clap::Args, Debug)]
struct UrlArgs {
    identifier: String,
    #[arg(long, value_enum, default_value_t = Variant::Image)]
    variant: Variant,
    #[arg(long, env = "MEDIA_CLOUD_NAME")]
    cloud_name: String,
    #[arg(long, env = "MEDIA_DELIVERY_HOST", default_value = "res.cloudinary.com")]
    delivery_host: String,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    quality: Option<String>,
    #[arg(long)]
    format: Option<String>,
    #[arg(long)]
    crop: Option<String>,
    /// クリップの長さ（秒）
    #[arg(long)]
    duration: Option<f64>,
    /// クリップの開始位置（秒）
    #[arg(long)]
    start_offset: Option<f64>,
}

impl UrlArgs {
    fn build(&self) -> anyhow::Result<String> {
        let variant = TransformVariant::from(self.variant);
        let kind = match variant {
            TransformVariant::OptimizedImage => ResourceKind::Image,
            _ => ResourceKind::Video,
        };
        let options = TransformOptions {
            width: self.width,
            height: self.height,
            quality: self.quality.clone(),
            format: self.format.clone(),
            crop: self.crop.clone(),
            duration: self.duration,
            start_offset: self.start_offset,
        };
        let builder = UrlBuilder::new(&self.delivery_host, &self.cloud_name);
        Ok(builder.build(&self.identifier, kind, variant, &options)?)
    }
}

/// 拡張子からContent-Typeを推定する。
fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "aac" => "audio/aac",
        "m4a" => "audio/x-m4a",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let client = GatewayClient::new(&cli.gateway);

    match cli.command {
        Command::Url(args) => println!("{}", args.build()?),
        Command::Upload {
            path,
            field,
            folder,
            content_type,
            profile_picture,
        } => {
            let content_type = content_type.unwrap_or_else(|| guess_content_type(&path).to_string());
            let asset = client
                .upload(&path, &field, &content_type, folder.as_deref(), profile_picture)
                .await?;
            print_json(&asset)?;
        }
        Command::Delete { identifiers, kind } => {
            print_json(&client.delete(identifiers, kind).await?)?;
        }
        Command::Search { expression, limit } => {
            print_json(&client.search(&expression, limit).await?)?;
        }
        Command::Info { identifier, kind } => {
            print_json(&client.info(&identifier, kind).await?)?;
        }
        Command::Preset {
            name,
            folder,
            kind,
            allowed_formats,
        } => {
            let options = PresetOptions {
                folder,
                resource_kind: kind,
                allowed_formats,
            };
            print_json(&client.create_preset(&name, options).await?)?;
        }
    }

    Ok(())
}
