//! Anthropic Messages 请求 → generateContent 请求
//!
//! 转换规则：
//!
//! - role 映射：`user` → `user`，`assistant` → `model`
//! - tool_use → `functionCall` part（ID 丢弃，后端不认识）
//! - tool_result → `functionResponse` part，工具名由 correlator
//!   从 `tool_use_id` 还原——还原失败说明链接断裂，拒绝请求
//! - 工具定义映射为 `functionDeclarations`，input_schema 原样透传

use crate::correlator::ToolCallCorrelator;
use crate::error::GatewayError;
use crate::models::anthropic::{ContentBlock, MessagesRequest};
use crate::models::gemini::{
    Content, FunctionDeclaration, GeminiTool, GenerateContentRequest, GenerationConfig, Part,
};
use crate::translator::flatten_tool_result;
use crate::translator::traits::RequestTranslator;

/// Gemini 请求转换器
///
/// 后端模型 ID 不进请求体（generateContent 的模型在 URL 路径上），
/// 转换器不持有路由信息。
pub struct GeminiRequestTranslator<'a> {
    correlator: &'a ToolCallCorrelator,
}

impl<'a> GeminiRequestTranslator<'a> {
    pub fn new(correlator: &'a ToolCallCorrelator) -> Self {
        Self { correlator }
    }

    /// 把 tool_result 内容包装为 functionResponse 的 response 对象
    ///
    /// Gemini 要求 response 是 JSON 对象。展平文本本身是对象时直接
    /// 使用，否则包进 `{"result": ...}` 信封。
    fn wrap_result(flattened: String) -> serde_json::Value {
        match serde_json::from_str::<serde_json::Value>(&flattened) {
            Ok(value @ serde_json::Value::Object(_)) => value,
            _ => serde_json::json!({ "result": flattened }),
        }
    }
}

impl RequestTranslator for GeminiRequestTranslator<'_> {
    type Output = GenerateContentRequest;

    fn translate_request(&self, request: &MessagesRequest) -> Result<Self::Output, GatewayError> {
        let mut contents = Vec::with_capacity(request.messages.len());

        for message in &request.messages {
            let mut parts = Vec::new();
            for block in message.content.as_blocks() {
                match block {
                    ContentBlock::Text { text } => parts.push(Part::text(text)),
                    ContentBlock::ToolUse { name, input, .. } => {
                        parts.push(Part::function_call(name, input));
                    }
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                    } => {
                        let name = self.correlator.tool_name(&tool_use_id).ok_or_else(|| {
                            GatewayError::MalformedRequest(format!(
                                "tool_result references unknown tool_use_id: {}",
                                tool_use_id
                            ))
                        })?;
                        parts.push(Part::function_response(
                            name,
                            Self::wrap_result(flatten_tool_result(&content)),
                        ));
                    }
                }
            }
            if parts.is_empty() {
                continue;
            }
            contents.push(match message.role.as_str() {
                "assistant" => Content::model(parts),
                _ => Content::user(parts),
            });
        }

        if contents.is_empty() {
            return Err(GatewayError::MalformedRequest(
                "request has no messages".to_string(),
            ));
        }

        let system_instruction = request.system.as_ref().map(|system| {
            let text = match system {
                serde_json::Value::String(text) => text.clone(),
                serde_json::Value::Array(blocks) => blocks
                    .iter()
                    .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n"),
                _ => String::new(),
            };
            Content {
                role: None,
                parts: vec![Part::text(text)],
            }
        });

        let tools = request.tools.as_ref().filter(|t| !t.is_empty()).map(|tools| {
            vec![GeminiTool {
                function_declarations: tools
                    .iter()
                    .map(|tool| FunctionDeclaration {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: Some(tool.input_schema.clone()),
                    })
                    .collect(),
            }]
        });

        Ok(GenerateContentRequest {
            contents,
            tools,
            system_instruction,
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(request.max_tokens),
                temperature: request.temperature,
            }),
        })
    }
}
