//! 后端 Provider HTTP 客户端
//!
//! 每个后端一个客户端结构，持有共享的 `reqwest::Client`。
//! 超时是硬边界：连接 30 秒、整个请求 300 秒（可配置），
//! 超时映射为 `ProviderTimeout`，其他传输层故障映射为
//! `ProviderUnavailable`。

pub mod anthropic;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// 构建共享的 HTTP 客户端
///
/// 所有后端调用复用同一个连接池。
pub fn build_http_client(config: &GatewayConfig) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .build()
        .map_err(|err| GatewayError::ProviderUnavailable {
            provider: "gateway".to_string(),
            message: format!("failed to build HTTP client: {}", err),
        })
}

/// 非 2xx 的上游响应转为网关错误
///
/// 尽力从响应体提取后端的错误消息，提不出来就用原始文本。
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.pointer("/error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or(body);
    Err(GatewayError::ProviderUnavailable {
        provider: provider.to_string(),
        message: format!("upstream returned {}: {}", status.as_u16(), message),
    })
}
