//! 请求处理器
//!
//! `/v1/messages` 的完整调度流程：
//! 解析路由 → 构建 correlator → 请求转换 → 后端调用 → 响应转换。
//! 流式分支把后端字节流接入统一管道，非流式分支走响应转换器。

use crate::correlator::ToolCallCorrelator;
use crate::error::GatewayError;
use crate::models::anthropic::{
    CountTokensRequest, CountTokensResponse, ContentBlock, MessageContent, MessagesRequest,
    MessagesResponse, ToolDefinition,
};
use crate::providers::{AnthropicClient, GeminiClient, OpenAiClient};
use crate::router::{ModelResolver, ModelRoute, ProviderType};
use crate::server::AppState;
use crate::stream::{create_sse_stream, StreamPipeline};
use crate::translator::anthropic::{restore_original_model, AnthropicRequestTranslator};
use crate::translator::gemini::{GeminiRequestTranslator, GeminiResponseTranslator};
use crate::translator::openai::{OpenAiRequestTranslator, OpenAiResponseTranslator};
use crate::translator::{RequestTranslator, ResponseTranslator};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use tracing::info;

/// 健康检查
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = &state.config;
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "providers": {
            "anthropic": config.has_credential(ProviderType::Anthropic),
            "openai": config.has_credential(ProviderType::OpenAi),
            "gemini": config.has_credential(ProviderType::Gemini),
        },
    }))
}

/// `POST /v1/messages`
pub async fn messages(
    State(state): State<AppState>,
    Json(request): Json<MessagesRequest>,
) -> Response {
    match dispatch(&state, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn dispatch(state: &AppState, request: MessagesRequest) -> Result<Response, GatewayError> {
    let config = &state.config;
    let route = ModelResolver::new(config).resolve(&request.model)?;
    info!(
        "[SERVER] {} -> {}/{} stream={}",
        request.model,
        route.provider,
        route.backend_model_id,
        request.stream
    );

    let mut correlator = ToolCallCorrelator::from_messages(&request.messages, route.provider);
    let timeout_secs = config.request_timeout.as_secs();
    let api_key = config
        .api_key(route.provider)
        .ok_or_else(|| GatewayError::UnconfiguredProvider(route.provider.as_str().to_string()))?
        .to_string();

    match route.provider {
        ProviderType::Anthropic => {
            let client = AnthropicClient::new(
                state.http.clone(),
                config.anthropic_base_url.clone(),
                api_key,
                timeout_secs,
            );
            let backend = AnthropicRequestTranslator::new(&route, &correlator)
                .translate_request(&request)?;
            if request.stream {
                let bytes = client.messages_stream(&backend).await?;
                Ok(sse_response(&route, bytes))
            } else {
                let response = client.messages(&backend).await?;
                Ok(Json(restore_original_model(response, &route)).into_response())
            }
        }

        ProviderType::OpenAi => {
            let client = OpenAiClient::new(
                state.http.clone(),
                config.openai_base_url.clone(),
                api_key,
                timeout_secs,
            );
            let backend =
                OpenAiRequestTranslator::new(&route, &correlator).translate_request(&request)?;
            if request.stream {
                let bytes = client.chat_stream(&backend).await?;
                Ok(sse_response(&route, bytes))
            } else {
                let response = client.chat(&backend).await?;
                let tool_names = declared_tool_names(&request);
                let (content, stop_reason, usage) =
                    OpenAiResponseTranslator::new(tool_names).translate_response(response)?;
                Ok(Json(MessagesResponse::new(
                    &route.original_model,
                    content,
                    &stop_reason,
                    usage,
                ))
                .into_response())
            }
        }

        ProviderType::Gemini => {
            let client = GeminiClient::new(
                state.http.clone(),
                config.gemini_base_url.clone(),
                api_key,
                timeout_secs,
            );
            let backend =
                GeminiRequestTranslator::new(&correlator).translate_request(&request)?;
            if request.stream {
                let bytes = client
                    .stream_generate_content(&route.backend_model_id, &backend)
                    .await?;
                Ok(sse_response(&route, bytes))
            } else {
                let response = client
                    .generate_content(&route.backend_model_id, &backend)
                    .await?;
                let (content, stop_reason, usage) =
                    GeminiResponseTranslator::new(&mut correlator).translate_response(response)?;
                Ok(Json(MessagesResponse::new(
                    &route.original_model,
                    content,
                    &stop_reason,
                    usage,
                ))
                .into_response())
            }
        }
    }
}

/// 把后端字节流接入统一管道，构建 SSE 响应
fn sse_response<S, E>(route: &ModelRoute, byte_stream: S) -> Response
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let pipeline = StreamPipeline::new(route.provider, route.original_model.clone());
    let body_stream = create_sse_stream(byte_stream, pipeline)
        .map(|sse| Ok::<_, Infallible>(Bytes::from(sse)));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(body_stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn declared_tool_names(request: &MessagesRequest) -> Vec<String> {
    request
        .tools
        .as_ref()
        .map(|tools| tools.iter().map(|t| t.name.clone()).collect())
        .unwrap_or_default()
}

/// `POST /v1/messages/count_tokens`
///
/// 本地估算，不调用后端：约 4 字符 = 1 token。
pub async fn count_tokens(
    Json(request): Json<CountTokensRequest>,
) -> Json<CountTokensResponse> {
    Json(CountTokensResponse {
        input_tokens: estimate_request_tokens(&request),
    })
}

fn estimate_request_tokens(request: &CountTokensRequest) -> u32 {
    let mut chars = 0usize;

    if let Some(system) = &request.system {
        chars += json_text_len(system);
    }
    for message in &request.messages {
        match &message.content {
            MessageContent::Text(text) => chars += text.len(),
            MessageContent::Blocks(blocks) => {
                for block in blocks {
                    chars += match block {
                        ContentBlock::Text { text } => text.len(),
                        other => serde_json::to_string(other).map(|s| s.len()).unwrap_or(0),
                    };
                }
            }
        }
    }
    if let Some(tools) = &request.tools {
        for tool in tools {
            chars += tool_definition_len(tool);
        }
    }

    (chars / 4) as u32
}

fn json_text_len(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::String(text) => text.len(),
        other => serde_json::to_string(other).map(|s| s.len()).unwrap_or(0),
    }
}

fn tool_definition_len(tool: &ToolDefinition) -> usize {
    tool.name.len()
        + tool.description.as_deref().map(str::len).unwrap_or(0)
        + serde_json::to_string(&tool.input_schema)
            .map(|s| s.len())
            .unwrap_or(0)
}
