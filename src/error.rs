//! 网关错误类型
//!
//! 所有面向客户端的错误统一使用 Anthropic 风格的错误信封：
//! `{"type":"error","error":{"type":"...","message":"..."}}`，
//! 无论底层是哪个后端产生的故障，客户端的错误处理都与 Provider 无关。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// 网关错误
#[derive(Debug, Error)]
pub enum GatewayError {
    /// 路由到的 Provider 未配置凭证
    #[error("provider {0} is not configured (missing API key)")]
    UnconfiguredProvider(String),

    /// 请求结构非法（工具链接断裂、schema 缺失等）
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// 后端调用超时
    #[error("provider {provider} timed out after {seconds}s")]
    ProviderTimeout { provider: String, seconds: u64 },

    /// 后端不可用或返回错误
    #[error("provider {provider} error: {message}")]
    ProviderUnavailable { provider: String, message: String },

    /// 流在内容块中途断开
    #[error("stream integrity error: {0}")]
    StreamIntegrity(String),

    /// 序列化/反序列化失败
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// 映射到 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnconfiguredProvider(_) => StatusCode::BAD_REQUEST,
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::ProviderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::ProviderUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Self::StreamIntegrity(_) => StatusCode::BAD_GATEWAY,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 错误信封中的 type 字段
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::UnconfiguredProvider(_) => "invalid_request_error",
            Self::MalformedRequest(_) => "invalid_request_error",
            Self::ProviderTimeout { .. } => "api_error",
            Self::ProviderUnavailable { .. } => "api_error",
            Self::StreamIntegrity(_) => "api_error",
            Self::Serialization(_) => "api_error",
        }
    }

    /// 从 reqwest 错误构造，区分超时和其他故障
    pub fn from_reqwest(provider: &str, timeout_secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::ProviderTimeout {
                provider: provider.to_string(),
                seconds: timeout_secs,
            }
        } else {
            Self::ProviderUnavailable {
                provider: provider.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// 生成错误信封 JSON
    pub fn to_envelope(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "error",
            "error": {
                "type": self.error_type(),
                "message": self.to_string()
            }
        })
    }

    /// 生成流中的 SSE 错误事件
    pub fn to_sse_event(&self) -> String {
        format!("event: error\ndata: {}\n\n", self.to_envelope())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        tracing::warn!("[ERROR] {} -> {}", self, self.status_code());
        (self.status_code(), Json(self.to_envelope())).into_response()
    }
}
