//! Gemini 风格后端客户端
//!
//! 模型在 URL 路径上，认证走 `key` 查询参数；
//! 流式接口是 `streamGenerateContent?alt=sse`。

use crate::error::GatewayError;
use crate::models::gemini::{GenerateContentRequest, GenerateContentResponse};
use bytes::Bytes;
use futures::Stream;
use tracing::debug;

/// Gemini 后端客户端
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String, timeout_secs: u64) -> Self {
        Self {
            http,
            base_url,
            api_key,
            timeout_secs,
        }
    }

    fn url(&self, model: &str, method: &str, sse: bool) -> String {
        let mut url = format!(
            "{}/v1beta/models/{}:{}?key={}",
            self.base_url, model, method, self.api_key
        );
        if sse {
            url.push_str("&alt=sse");
        }
        url
    }

    /// 非流式调用
    pub async fn generate_content(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        debug!("[PROVIDER] gemini generateContent model={}", model);
        let response = self
            .http
            .post(self.url(model, "generateContent", false))
            .json(body)
            .send()
            .await
            .map_err(|err| GatewayError::from_reqwest("gemini", self.timeout_secs, err))?;
        let response = super::check_status("gemini", response).await?;
        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|err| GatewayError::ProviderUnavailable {
                provider: "gemini".to_string(),
                message: format!("invalid response body: {}", err),
            })
    }

    /// 流式调用，返回原始字节流
    pub async fn stream_generate_content(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<impl Stream<Item = Result<Bytes, reqwest::Error>>, GatewayError> {
        debug!("[PROVIDER] gemini streamGenerateContent model={}", model);
        let response = self
            .http
            .post(self.url(model, "streamGenerateContent", true))
            .json(body)
            .send()
            .await
            .map_err(|err| GatewayError::from_reqwest("gemini", self.timeout_secs, err))?;
        let response = super::check_status("gemini", response).await?;
        Ok(response.bytes_stream())
    }
}
