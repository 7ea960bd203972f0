//! Anthropic Messages 请求 → chat completions 请求
//!
//! 转换规则：
//!
//! - system 提示与工具前导合并为首条 system 消息
//! - 每条历史消息的 block 序列按原始顺序展平为单条文本
//! - tool_use 渲染为 `Tool usage:` 标记行，tool_result 渲染为
//!   `Tool result for <id>:` 文本——文本后端无结构化通道，
//!   过期的 `tool_use_id` 只记警告不拒绝

use crate::correlator::ToolCallCorrelator;
use crate::error::GatewayError;
use crate::models::anthropic::{ContentBlock, Message, MessagesRequest};
use crate::models::openai::{ChatCompletionRequest, ChatMessage};
use crate::router::ModelRoute;
use crate::translator::downgrade::{render_tool_preamble, render_tool_result_text, render_tool_use_line};
use crate::translator::traits::RequestTranslator;
use crate::translator::flatten_tool_result;
use tracing::warn;

/// OpenAI 请求转换器
pub struct OpenAiRequestTranslator<'a> {
    route: &'a ModelRoute,
    correlator: &'a ToolCallCorrelator,
}

impl<'a> OpenAiRequestTranslator<'a> {
    pub fn new(route: &'a ModelRoute, correlator: &'a ToolCallCorrelator) -> Self {
        Self { route, correlator }
    }

    /// 提取 system 提示文本
    ///
    /// Anthropic 的 system 字段可以是字符串或 text block 序列。
    fn system_text(system: &serde_json::Value) -> String {
        match system {
            serde_json::Value::String(text) => text.clone(),
            serde_json::Value::Array(blocks) => blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        }
    }

    /// 把单条消息的内容展平为文本
    fn flatten_message(&self, message: &Message) -> String {
        let mut parts = Vec::new();
        for block in message.content.as_blocks() {
            match block {
                ContentBlock::Text { text } => parts.push(text),
                ContentBlock::ToolUse { name, input, .. } => {
                    parts.push(render_tool_use_line(&name, &input));
                }
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                } => {
                    if self.correlator.lookup(&tool_use_id).is_none() {
                        warn!(
                            "[TRANSLATE] tool_result 引用未知 ID，按文本透传: {}",
                            tool_use_id
                        );
                    }
                    parts.push(render_tool_result_text(
                        &tool_use_id,
                        &flatten_tool_result(&content),
                    ));
                }
            }
        }
        parts.join("\n\n")
    }
}

impl RequestTranslator for OpenAiRequestTranslator<'_> {
    type Output = ChatCompletionRequest;

    fn translate_request(&self, request: &MessagesRequest) -> Result<Self::Output, GatewayError> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        let mut system = request
            .system
            .as_ref()
            .map(Self::system_text)
            .unwrap_or_default();
        if let Some(tools) = &request.tools {
            if !tools.is_empty() {
                if !system.is_empty() {
                    system.push_str("\n\n");
                }
                system.push_str(&render_tool_preamble(tools));
            }
        }
        if !system.is_empty() {
            messages.push(ChatMessage::new("system", system));
        }

        for message in &request.messages {
            let role = match message.role.as_str() {
                "assistant" => "assistant",
                _ => "user",
            };
            messages.push(ChatMessage::new(role, self.flatten_message(message)));
        }

        if messages.is_empty() {
            return Err(GatewayError::MalformedRequest(
                "request has no messages".to_string(),
            ));
        }

        Ok(ChatCompletionRequest {
            model: self.route.backend_model_id.clone(),
            messages,
            max_tokens: Some(request.max_tokens),
            temperature: request.temperature,
            stream: request.stream,
        })
    }
}
