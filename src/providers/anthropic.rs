//! Anthropic 后端客户端
//!
//! 原生协议透传，认证走 `x-api-key` 加 `anthropic-version` 头。

use crate::error::GatewayError;
use crate::models::anthropic::{MessagesRequest, MessagesResponse};
use bytes::Bytes;
use futures::Stream;
use tracing::debug;

/// Anthropic Messages API 版本
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic 后端客户端
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl AnthropicClient {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String, timeout_secs: u64) -> Self {
        Self {
            http,
            base_url,
            api_key,
            timeout_secs,
        }
    }

    fn request(&self, body: &MessagesRequest) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
    }

    /// 非流式调用
    pub async fn messages(&self, body: &MessagesRequest) -> Result<MessagesResponse, GatewayError> {
        debug!("[PROVIDER] anthropic messages model={}", body.model);
        let response = self
            .request(body)
            .send()
            .await
            .map_err(|err| GatewayError::from_reqwest("anthropic", self.timeout_secs, err))?;
        let response = super::check_status("anthropic", response).await?;
        response
            .json::<MessagesResponse>()
            .await
            .map_err(|err| GatewayError::ProviderUnavailable {
                provider: "anthropic".to_string(),
                message: format!("invalid response body: {}", err),
            })
    }

    /// 流式调用，返回原始字节流
    pub async fn messages_stream(
        &self,
        body: &MessagesRequest,
    ) -> Result<impl Stream<Item = Result<Bytes, reqwest::Error>>, GatewayError> {
        debug!("[PROVIDER] anthropic messages (stream) model={}", body.model);
        let response = self
            .request(body)
            .send()
            .await
            .map_err(|err| GatewayError::from_reqwest("anthropic", self.timeout_secs, err))?;
        let response = super::check_status("anthropic", response).await?;
        Ok(response.bytes_stream())
    }
}
