//! generateContent 响应 → Anthropic content block 序列
//!
//! 后端不产生调用 ID，每个 `functionCall` 在这里合成新的 `toolu_` ID
//! 并登记到 correlator——下一轮请求的 tool_result 靠它还原工具名。
//! part 顺序原样保留：文本在前则 text block 在前。

use crate::correlator::ToolCallCorrelator;
use crate::error::GatewayError;
use crate::models::anthropic::{new_tool_use_id, ContentBlock, Usage};
use crate::models::gemini::GenerateContentResponse;
use crate::router::ProviderType;
use crate::translator::traits::ResponseTranslator;
use tracing::debug;

/// Gemini 响应转换器
pub struct GeminiResponseTranslator<'a> {
    correlator: &'a mut ToolCallCorrelator,
}

impl<'a> GeminiResponseTranslator<'a> {
    pub fn new(correlator: &'a mut ToolCallCorrelator) -> Self {
        Self { correlator }
    }
}

impl ResponseTranslator for GeminiResponseTranslator<'_> {
    type Input = GenerateContentResponse;

    fn translate_response(
        &mut self,
        response: Self::Input,
    ) -> Result<(Vec<ContentBlock>, String, Usage), GatewayError> {
        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| GatewayError::ProviderUnavailable {
                provider: "gemini".to_string(),
                message: "response has no candidates".to_string(),
            })?;

        let mut content = Vec::new();
        let mut saw_function_call = false;

        if let Some(turn) = &candidate.content {
            for part in &turn.parts {
                if let Some(text) = &part.text {
                    content.push(ContentBlock::Text { text: text.clone() });
                }
                if let Some(call) = &part.function_call {
                    let id = new_tool_use_id();
                    debug!("[TRANSLATE] 合成 tool_use ID {} ← {}", id, call.name);
                    self.correlator.record(&id, &call.name, ProviderType::Gemini);
                    content.push(ContentBlock::ToolUse {
                        id,
                        name: call.name.clone(),
                        input: call.args.clone(),
                    });
                    saw_function_call = true;
                }
            }
        }

        let stop_reason = if saw_function_call {
            "tool_use"
        } else {
            match candidate.finish_reason.as_deref() {
                Some("MAX_TOKENS") => "max_tokens",
                _ => "end_turn",
            }
        };

        let usage = response
            .usage_metadata
            .map(|m| Usage {
                input_tokens: m.prompt_token_count,
                output_tokens: m.candidates_token_count,
            })
            .unwrap_or_default();

        Ok((content, stop_reason.to_string(), usage))
    }
}
