//! OpenAI 风格后端客户端
//!
//! chat completions 接口，Bearer 认证。

use crate::error::GatewayError;
use crate::models::openai::{ChatCompletionRequest, ChatCompletionResponse};
use bytes::Bytes;
use futures::Stream;
use tracing::debug;

/// OpenAI 后端客户端
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String, timeout_secs: u64) -> Self {
        Self {
            http,
            base_url,
            api_key,
            timeout_secs,
        }
    }

    fn request(&self, body: &ChatCompletionRequest) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
    }

    /// 非流式调用
    pub async fn chat(
        &self,
        body: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, GatewayError> {
        debug!("[PROVIDER] openai chat model={}", body.model);
        let response = self
            .request(body)
            .send()
            .await
            .map_err(|err| GatewayError::from_reqwest("openai", self.timeout_secs, err))?;
        let response = super::check_status("openai", response).await?;
        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|err| GatewayError::ProviderUnavailable {
                provider: "openai".to_string(),
                message: format!("invalid response body: {}", err),
            })
    }

    /// 流式调用，返回原始字节流
    pub async fn chat_stream(
        &self,
        body: &ChatCompletionRequest,
    ) -> Result<impl Stream<Item = Result<Bytes, reqwest::Error>>, GatewayError> {
        debug!("[PROVIDER] openai chat (stream) model={}", body.model);
        let response = self
            .request(body)
            .send()
            .await
            .map_err(|err| GatewayError::from_reqwest("openai", self.timeout_secs, err))?;
        let response = super::check_status("openai", response).await?;
        Ok(response.bytes_stream())
    }
}
