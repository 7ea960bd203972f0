//! Gemini SSE 解析器
//!
//! streamGenerateContent（`alt=sse`）的每帧是一个完整的
//! GenerateContentResponse 片段。functionCall 整体到达，这里拆成
//! 块开始 + 单个参数增量 + 块结束三个事件；后端不产生调用 ID，
//! ID 合成留给生成器。

use super::{SseFrameBuffer, StreamParser};
use crate::models::gemini::GenerateContentResponse;
use crate::stream::events::{BlockKind, StopReason, StreamEvent};
use tracing::warn;

/// Gemini SSE → StreamEvent
#[derive(Debug, Default)]
pub struct GeminiSseParser {
    buffer: SseFrameBuffer,
    started: bool,
    saw_function_call: bool,
}

impl GeminiSseParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_data(&mut self, data: &str) -> Vec<StreamEvent> {
        let response: GenerateContentResponse = match serde_json::from_str(data) {
            Ok(response) => response,
            Err(err) => {
                warn!("[STREAM] 丢弃无法解析的 Gemini 帧: {}", err);
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        if !self.started {
            self.started = true;
            events.push(StreamEvent::MessageStart { model: None });
        }

        if let Some(metadata) = &response.usage_metadata {
            events.push(StreamEvent::Usage {
                input_tokens: Some(metadata.prompt_token_count),
                output_tokens: Some(metadata.candidates_token_count),
            });
        }

        let Some(candidate) = response.candidates.first() else {
            return events;
        };

        if let Some(content) = &candidate.content {
            for part in &content.parts {
                if let Some(text) = &part.text {
                    if !text.is_empty() {
                        events.push(StreamEvent::TextDelta { text: text.clone() });
                    }
                }
                if let Some(call) = &part.function_call {
                    self.saw_function_call = true;
                    events.push(StreamEvent::ContentBlockStart {
                        kind: BlockKind::ToolUse {
                            id: None,
                            name: call.name.clone(),
                        },
                    });
                    events.push(StreamEvent::ToolUseInputDelta {
                        partial_json: serde_json::to_string(&call.args)
                            .unwrap_or_else(|_| "{}".to_string()),
                    });
                    events.push(StreamEvent::ContentBlockStop);
                }
            }
        }

        if let Some(reason) = &candidate.finish_reason {
            let stop_reason = if self.saw_function_call {
                StopReason::ToolUse
            } else {
                match reason.as_str() {
                    "MAX_TOKENS" => StopReason::MaxTokens,
                    _ => StopReason::EndTurn,
                }
            };
            events.push(StreamEvent::MessageStop { stop_reason });
        }
        events
    }
}

impl StreamParser for GeminiSseParser {
    fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let frames = self.buffer.push(chunk);
        let mut events = Vec::new();
        for frame in frames {
            if frame.data.is_empty() {
                continue;
            }
            events.extend(self.parse_data(&frame.data));
        }
        events
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        match self.buffer.finish() {
            Some(frame) if !frame.data.is_empty() => self.parse_data(&frame.data),
            _ => Vec::new(),
        }
    }
}
