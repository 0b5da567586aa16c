//! # Gatewayクライアント
//!
//! CLIの各サブコマンドが呼ぶGateway HTTP APIの薄いラッパー。

use std::path::Path;

use anyhow::{bail, Context};
use media_types::{
    Asset, AssetInfoRequest, CreatePresetRequest, DeleteOutcome, DeleteRequest, PresetDescriptor,
    PresetOptions, ResourceKind, SearchRequest, SearchResponse,
};
use serde_json::Value;

pub struct GatewayClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// ファイルをmultipartでアップロードする。
    pub async fn upload(
        &self,
        path: &Path,
        field: &str,
        content_type: &str,
        folder: Option<&str>,
        profile_picture: bool,
    ) -> anyhow::Result<Asset> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("ファイルの読み込みに失敗: {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name)
            .mime_str(content_type)
            .with_context(|| format!("不正なContent-Type: {content_type}"))?;
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);

        let route = if profile_picture {
            "/uploads/profile-picture"
        } else {
            "/uploads"
        };
        let mut request = self.http_client.post(self.url(route)).multipart(form);
        if let Some(folder) = folder {
            request = request.query(&[("folder", folder)]);
        }
        read_json(request.send().await?).await
    }

    pub async fn delete(
        &self,
        identifiers: Vec<String>,
        resource_kind: ResourceKind,
    ) -> anyhow::Result<DeleteOutcome> {
        let body = DeleteRequest {
            identifiers,
            resource_kind,
        };
        let response = self
            .http_client
            .post(self.url("/assets/delete"))
            .json(&body)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn search(&self, expression: &str, limit: Option<u32>) -> anyhow::Result<Vec<Asset>> {
        let body = SearchRequest {
            expression: expression.to_string(),
            limit,
        };
        let response = self
            .http_client
            .post(self.url("/assets/search"))
            .json(&body)
            .send()
            .await?;
        let found: SearchResponse = read_json(response).await?;
        Ok(found.assets)
    }

    pub async fn info(&self, identifier: &str, resource_kind: ResourceKind) -> anyhow::Result<Asset> {
        let body = AssetInfoRequest {
            identifier: identifier.to_string(),
            resource_kind,
        };
        let response = self
            .http_client
            .post(self.url("/assets/info"))
            .json(&body)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn create_preset(
        &self,
        name: &str,
        options: PresetOptions,
    ) -> anyhow::Result<PresetDescriptor> {
        let body = CreatePresetRequest {
            name: name.to_string(),
            options,
        };
        let response = self
            .http_client
            .post(self.url("/presets"))
            .json(&body)
            .send()
            .await?;
        read_json(response).await
    }
}

/// 成功応答をJSONとして読む。失敗時はGatewayのメッセージをそのまま返す。
async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> anyhow::Result<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        bail!("Gatewayがエラーを返しました ({status}): {body}");
    }
    serde_json::from_str(&body).with_context(|| format!("応答の解析に失敗: {body}"))
}

/// 結果を整形して表示する。
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let value: Value = serde_json::to_value(value)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
