//! OpenAI SSE 解析器
//!
//! chat completions 的流式 chunk 只携带文本增量——该后端按文本
//! 降级处理，请求里没有结构化工具字段，chunk 里也不会出现
//! tool_calls。finish_reason 到达即消息结束，`[DONE]` 哨兵忽略。

use super::{SseFrameBuffer, StreamParser};
use crate::models::openai::ChatCompletionChunk;
use crate::stream::events::{StopReason, StreamEvent};
use tracing::warn;

/// OpenAI SSE → StreamEvent
#[derive(Debug, Default)]
pub struct OpenAiSseParser {
    buffer: SseFrameBuffer,
    started: bool,
    stopped: bool,
}

impl OpenAiSseParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_data(&mut self, data: &str) -> Vec<StreamEvent> {
        if data == "[DONE]" {
            return Vec::new();
        }

        let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(err) => {
                warn!("[STREAM] 丢弃无法解析的 OpenAI chunk: {}", err);
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        if !self.started {
            self.started = true;
            events.push(StreamEvent::MessageStart { model: None });
        }

        if let Some(usage) = &chunk.usage {
            events.push(StreamEvent::Usage {
                input_tokens: Some(usage.prompt_tokens),
                output_tokens: Some(usage.completion_tokens),
            });
        }

        let Some(choice) = chunk.choices.first() else {
            return events;
        };
        if let Some(text) = &choice.delta.content {
            if !text.is_empty() {
                events.push(StreamEvent::TextDelta { text: text.clone() });
            }
        }
        if let Some(reason) = &choice.finish_reason {
            self.stopped = true;
            // 文本后端的停止原因永远不会是 tool_use
            let stop_reason = match StopReason::from_str(reason) {
                StopReason::MaxTokens => StopReason::MaxTokens,
                _ => StopReason::EndTurn,
            };
            events.push(StreamEvent::MessageStop { stop_reason });
        }
        events
    }
}

impl StreamParser for OpenAiSseParser {
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
        let mut events = match self.buffer.finish() {
            Some(frame) if !frame.data.is_empty() => self.parse_data(&frame.data),
            _ => Vec::new(),
        };
        // 上游没给 finish_reason 就断流，留给生成器判定完整性
        if self.started && !self.stopped && events.is_empty() {
            warn!("[STREAM] OpenAI 流在 finish_reason 之前结束");
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_chunks_to_deltas() {
        let mut parser = OpenAiSseParser::new();
        let mut events = parser.feed(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"},\"finish_reason\":null}]}\n\n",
        );
        events.extend(parser.feed(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":null}]}\n\n",
        ));
        events.extend(parser.feed(
            b"data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n",
        ));

        assert_eq!(events[0], StreamEvent::MessageStart { model: None });
        assert_eq!(
            events[1],
            StreamEvent::TextDelta {
                text: "Hel".to_string()
            }
        );
        assert_eq!(
            events[2],
            StreamEvent::TextDelta {
                text: "lo".to_string()
            }
        );
        assert_eq!(
            events[3],
            StreamEvent::MessageStop {
                stop_reason: StopReason::EndTurn
            }
        );
    }

    #[test]
    fn test_length_maps_to_max_tokens() {
        let mut parser = OpenAiSseParser::new();
        let events =
            parser.feed(b"data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"length\"}]}\n\n");
        assert_eq!(
            events.last(),
            Some(&StreamEvent::MessageStop {
                stop_reason: StopReason::MaxTokens
            })
        );
    }

    #[test]
    fn test_done_sentinel_ignored() {
        let mut parser = OpenAiSseParser::new();
        assert!(parser.feed(b"data: [DONE]\n\n").is_empty());
    }

    #[test]
    fn test_usage_chunk_reported() {
        let mut parser = OpenAiSseParser::new();
        let events = parser.feed(
            b"data: {\"choices\":[],\"usage\":{\"prompt_tokens\":9,\"completion_tokens\":3}}\n\n",
        );
        assert!(events.contains(&StreamEvent::Usage {
            input_tokens: Some(9),
            output_tokens: Some(3),
        }));
    }
}
