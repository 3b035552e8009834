//! HTTP 送受信の境界
//!
//! 接続管理・TLS等は外部の責務とし、リゾルバからは
//! 「リクエストを送って生のバイト列を受け取る」能力としてだけ扱う。

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::errors::YouTubeError;
use crate::config::{self, ResolverConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// 1回の送受信の内容
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: Some(body),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// 送受信の抽象
///
/// 複数の独立した呼び出しから同時に使われるため `Send + Sync` を要求する。
/// キャンセルが通知されたら送受信を中断し `YouTubeError::Cancelled` を返すこと。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(
        &self,
        request: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, YouTubeError>;
}

/// reqwest による標準実装
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// 新しいトランスポートを作成
    ///
    /// # Errors
    /// HTTPクライアントのビルドに失敗した場合にエラーを返す
    pub fn new(config: &ResolverConfig) -> Result<Self, YouTubeError> {
        let client = Client::builder()
            .user_agent(config::USER_AGENT)
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| YouTubeError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn send(&self, request: &RequestDescriptor) -> Result<Vec<u8>, YouTubeError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                log::warn!("InnerTube request timed out: {}", request.url);
            }
            YouTubeError::HttpError(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("InnerTube API error: {} - {}", status, body);
            return Err(YouTubeError::NetworkError(format!(
                "HTTP {} from {}",
                status, request.url
            )));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn exchange(
        &self,
        request: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, YouTubeError> {
        if cancel.is_cancelled() {
            return Err(YouTubeError::Cancelled);
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                log::debug!("Request cancelled: {}", request.url);
                Err(YouTubeError::Cancelled)
            }
            result = self.send(request) => result,
        }
    }
}
