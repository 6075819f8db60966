//! 同步资源 HTTP API 客户端
//!
//! 负责拉取示例 JSON 资源，绕过缓存，仅把 200 视为成功

use crate::sync::error::SyncError;
use crate::sync::models::FetchedPayload;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use reqwest::StatusCode;
use tracing::{debug, error, info};

/// 创建同步使用的 HTTP 客户端（默认带上禁止缓存的请求头）
pub fn build_http_client() -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    reqwest::ClientBuilder::new()
        .default_headers(headers)
        .build()
        .context("创建 HTTP 客户端失败")
}

/// 同步资源 HTTP API 客户端
pub struct SyncApi {
    client: reqwest::Client,
    resource_url: String,
}

impl SyncApi {
    /// 创建新的 API 客户端
    ///
    /// `client` 应该已经在外部配置好禁止缓存的请求头，见 [`build_http_client`]
    pub fn new(client: reqwest::Client, resource_url: String) -> Self {
        Self {
            client,
            resource_url,
        }
    }

    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    /// 拉取资源并返回响应文本
    pub async fn fetch_sample_text(&self, operation_id: &str) -> Result<String, SyncError> {
        info!("[SyncAPI] 📡 请求同步资源");
        debug!(
            "[SyncAPI]   请求URL: {}, 操作ID: {}",
            self.resource_url, operation_id
        );

        let response = self
            .client
            .get(&self.resource_url)
            .header("operationID", operation_id)
            .send()
            .await
            .map_err(|e| {
                error!("[SyncAPI] 请求失败: {}", e);
                SyncError::from(e)
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            // hyper 只在短语不同于标准短语时保留原文
            let reason = response
                .extensions()
                .get::<hyper::ext::ReasonPhrase>()
                .and_then(|r| std::str::from_utf8(r.as_bytes()).ok());
            error!(
                "[SyncAPI] 请求失败，HTTP状态: {}, 原因短语: {:?}",
                status, reason
            );
            return Err(SyncError::from_status(status, reason));
        }

        let text = response.text().await.map_err(|e| {
            error!("[SyncAPI] 读取响应 body 失败: {}", e);
            SyncError::from(e)
        })?;
        debug!("[SyncAPI] 响应 Body: {}", text);
        Ok(text)
    }
}

/// 把响应文本解析为 JSON 数据
pub fn parse_payload(text: &str) -> Result<FetchedPayload, SyncError> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(FetchedPayload)
        .map_err(|e| {
            error!("[SyncAPI] 反序列化失败: {}\n原始响应: {}", e, text);
            SyncError::from(e)
        })
}
