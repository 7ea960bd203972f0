//! chat completions 响应 → Anthropic content block 序列
//!
//! 文本后端的响应永远只产生 text block。检测到未标记的工具调用
//! 意图时，在原文之后追加一个带 `Tool usage:` 标记的文本块；
//! 绝不合成 tool_use block，stop_reason 也绝不是 `tool_use`。

use crate::error::GatewayError;
use crate::models::anthropic::{ContentBlock, Usage};
use crate::models::openai::ChatCompletionResponse;
use crate::translator::downgrade::{detect_tool_intent, Detection, TOOL_USAGE_MARKER};
use crate::translator::traits::ResponseTranslator;
use tracing::debug;

/// OpenAI 响应转换器
pub struct OpenAiResponseTranslator {
    /// 本次请求声明的工具名（意图检测的词表）
    tool_names: Vec<String>,
}

impl OpenAiResponseTranslator {
    pub fn new(tool_names: Vec<String>) -> Self {
        Self { tool_names }
    }
}

impl ResponseTranslator for OpenAiResponseTranslator {
    type Input = ChatCompletionResponse;

    fn translate_response(
        &mut self,
        response: Self::Input,
    ) -> Result<(Vec<ContentBlock>, String, Usage), GatewayError> {
        let choice = response
            .choices
            .first()
            .ok_or_else(|| GatewayError::ProviderUnavailable {
                provider: "openai".to_string(),
                message: "response has no choices".to_string(),
            })?;

        let text = choice.message.content.clone();
        let mut content = vec![ContentBlock::Text { text: text.clone() }];

        let names: Vec<&str> = self.tool_names.iter().map(String::as_str).collect();
        match detect_tool_intent(&text, &names) {
            Detection::AlreadyMarked => {
                debug!("[TRANSLATE] 回复已含工具标记行");
            }
            Detection::Detected(intent) => {
                debug!("[TRANSLATE] 检测到未标记的工具意图: {}", intent.name);
                content.push(ContentBlock::Text {
                    text: format!("{} {} {}", TOOL_USAGE_MARKER, intent.name, intent.arguments),
                });
            }
            Detection::None => {}
        }

        // 文本后端没有结构化调用通道，finish_reason 只区分长度截断
        let stop_reason = match choice.finish_reason.as_deref() {
            Some("length") => "max_tokens",
            _ => "end_turn",
        };

        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok((content, stop_reason.to_string(), usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::openai::{ChatChoice, ChatMessage, ChatUsage};

    fn response(text: &str, finish_reason: &str) -> ChatCompletionResponse {
        ChatCompletionResponse {
            choices: vec![ChatChoice {
                message: ChatMessage::new("assistant", text),
                finish_reason: Some(finish_reason.to_string()),
            }],
            usage: Some(ChatUsage {
                prompt_tokens: 12,
                completion_tokens: 7,
            }),
        }
    }

    #[test]
    fn test_plain_text_response() {
        let mut translator = OpenAiResponseTranslator::new(vec![]);
        let (content, stop_reason, usage) =
            translator.translate_response(response("Hello there.", "stop")).unwrap();

        assert_eq!(content.len(), 1);
        assert!(matches!(content[0], ContentBlock::Text { ref text } if text == "Hello there."));
        assert_eq!(stop_reason, "end_turn");
        assert_eq!(usage.input_tokens, 12);
        assert_eq!(usage.output_tokens, 7);
    }

    #[test]
    fn test_marked_reply_passes_through() {
        let mut translator = OpenAiResponseTranslator::new(vec!["Write".to_string()]);
        let reply = "Tool usage: Write {\"file_path\": \"/tmp/a\"}";
        let (content, stop_reason, _) = translator.translate_response(response(reply, "stop")).unwrap();

        // 已标记的文本不重复追加
        assert_eq!(content.len(), 1);
        assert_eq!(stop_reason, "end_turn");
    }

    #[test]
    fn test_unmarked_intent_appends_marked_block() {
        let mut translator = OpenAiResponseTranslator::new(vec!["Write".to_string()]);
        let reply = r#"Let me call Write {"file_path": "/tmp/a"} for you."#;
        let (content, stop_reason, _) = translator.translate_response(response(reply, "stop")).unwrap();

        assert_eq!(content.len(), 2);
        match &content[1] {
            ContentBlock::Text { text } => {
                assert!(text.starts_with("Tool usage: Write"));
            }
            other => panic!("unexpected block: {:?}", other),
        }
        // 降级路径的 stop_reason 永远不是 tool_use
        assert_eq!(stop_reason, "end_turn");
    }

    #[test]
    fn test_length_maps_to_max_tokens() {
        let mut translator = OpenAiResponseTranslator::new(vec![]);
        let (_, stop_reason, _) = translator.translate_response(response("truncat", "length")).unwrap();
        assert_eq!(stop_reason, "max_tokens");
    }

    #[test]
    fn test_empty_choices_is_provider_error() {
        let mut translator = OpenAiResponseTranslator::new(vec![]);
        let empty = ChatCompletionResponse {
            choices: vec![],
            usage: None,
        };
        assert!(matches!(
            translator.translate_response(empty),
            Err(GatewayError::ProviderUnavailable { .. })
        ));
    }
}
