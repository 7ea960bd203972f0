//! Anthropic SSE 解析器
//!
//! 原生后端的流已是 Anthropic 协议，仍要走解析-重生成一遍：
//! message_start 的模型 ID 需要还原为客户端的原始模型名，
//! 且块配对保证由网关统一兜底，不信任上游。

use super::{SseFrameBuffer, StreamParser};
use crate::stream::events::{BlockKind, StopReason, StreamEvent};
use tracing::warn;

/// Anthropic SSE → StreamEvent
#[derive(Debug, Default)]
pub struct AnthropicSseParser {
    buffer: SseFrameBuffer,
    /// message_delta 带来的停止原因，message_stop 时取用
    pending_stop_reason: Option<StopReason>,
}

impl AnthropicSseParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_data(&mut self, data: &str) -> Vec<StreamEvent> {
        let value: serde_json::Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(err) => {
                warn!("[STREAM] 丢弃无法解析的 Anthropic SSE 帧: {}", err);
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        match value.get("type").and_then(|t| t.as_str()) {
            Some("message_start") => {
                let message = &value["message"];
                events.push(StreamEvent::MessageStart {
                    model: message
                        .get("model")
                        .and_then(|m| m.as_str())
                        .map(str::to_string),
                });
                if let Some(input) = message["usage"]["input_tokens"].as_u64() {
                    events.push(StreamEvent::Usage {
                        input_tokens: Some(input as u32),
                        output_tokens: None,
                    });
                }
            }
            Some("content_block_start") => {
                let block = &value["content_block"];
                let kind = match block.get("type").and_then(|t| t.as_str()) {
                    Some("tool_use") => BlockKind::ToolUse {
                        id: block.get("id").and_then(|i| i.as_str()).map(str::to_string),
                        name: block
                            .get("name")
                            .and_then(|n| n.as_str())
                            .unwrap_or_default()
                            .to_string(),
                    },
                    _ => BlockKind::Text,
                };
                events.push(StreamEvent::ContentBlockStart { kind });
            }
            Some("content_block_delta") => {
                let delta = &value["delta"];
                match delta.get("type").and_then(|t| t.as_str()) {
                    Some("text_delta") => {
                        if let Some(text) = delta.get("text").and_then(|t| t.as_str()) {
                            events.push(StreamEvent::TextDelta {
                                text: text.to_string(),
                            });
                        }
                    }
                    Some("input_json_delta") => {
                        if let Some(partial) = delta.get("partial_json").and_then(|p| p.as_str()) {
                            events.push(StreamEvent::ToolUseInputDelta {
                                partial_json: partial.to_string(),
                            });
                        }
                    }
                    other => {
                        warn!("[STREAM] 未知的 delta 类型: {:?}", other);
                    }
                }
            }
            Some("content_block_stop") => {
                events.push(StreamEvent::ContentBlockStop);
            }
            Some("message_delta") => {
                if let Some(reason) = value["delta"]["stop_reason"].as_str() {
                    self.pending_stop_reason = Some(StopReason::from_str(reason));
                }
                if let Some(output) = value["usage"]["output_tokens"].as_u64() {
                    events.push(StreamEvent::Usage {
                        input_tokens: None,
                        output_tokens: Some(output as u32),
                    });
                }
            }
            Some("message_stop") => {
                events.push(StreamEvent::MessageStop {
                    stop_reason: self.pending_stop_reason.take().unwrap_or_default(),
                });
            }
            Some("ping") => events.push(StreamEvent::Ping),
            Some("error") => {
                let error = &value["error"];
                events.push(StreamEvent::Error {
                    error_type: error
                        .get("type")
                        .and_then(|t| t.as_str())
                        .unwrap_or("api_error")
                        .to_string(),
                    message: error
                        .get("message")
                        .and_then(|m| m.as_str())
                        .unwrap_or_default()
                        .to_string(),
                });
            }
            other => {
                warn!("[STREAM] 未知的 Anthropic SSE 事件类型: {:?}", other);
            }
        }
        events
    }
}

impl StreamParser for AnthropicSseParser {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(parser: &mut AnthropicSseParser, frames: &[&str]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for frame in frames {
            events.extend(parser.feed(frame.as_bytes()));
        }
        events.extend(parser.finish());
        events
    }

    #[test]
    fn test_text_stream_parsed() {
        let mut parser = AnthropicSseParser::new();
        let events = feed_all(
            &mut parser,
            &[
                "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_up\",\"model\":\"claude-3-5-haiku-20241022\",\"usage\":{\"input_tokens\":10}}}\n\n",
                "event: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
                "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n",
                "event: content_block_stop\ndata: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
                "event: message_delta\ndata: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":4}}\n\n",
                "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
            ],
        );

        assert_eq!(
            events[0],
            StreamEvent::MessageStart {
                model: Some("claude-3-5-haiku-20241022".to_string())
            }
        );
        assert!(events.contains(&StreamEvent::TextDelta {
            text: "Hi".to_string()
        }));
        assert_eq!(
            events.last(),
            Some(&StreamEvent::MessageStop {
                stop_reason: StopReason::EndTurn
            })
        );
    }

    #[test]
    fn test_tool_use_stream_parsed() {
        let mut parser = AnthropicSseParser::new();
        let events = feed_all(
            &mut parser,
            &[
                "event: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"tool_use\",\"id\":\"toolu_up\",\"name\":\"Bash\",\"input\":{}}}\n\n",
                "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\\\"com\"}}\n\n",
                "event: content_block_stop\ndata: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
            ],
        );

        assert_eq!(
            events[0],
            StreamEvent::ContentBlockStart {
                kind: BlockKind::ToolUse {
                    id: Some("toolu_up".to_string()),
                    name: "Bash".to_string(),
                }
            }
        );
        assert_eq!(
            events[1],
            StreamEvent::ToolUseInputDelta {
                partial_json: "{\"com".to_string()
            }
        );
        assert_eq!(events[2], StreamEvent::ContentBlockStop);
    }

    #[test]
    fn test_stop_reason_carried_from_message_delta() {
        let mut parser = AnthropicSseParser::new();
        let events = feed_all(
            &mut parser,
            &[
                "event: message_delta\ndata: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"tool_use\"},\"usage\":{\"output_tokens\":12}}\n\n",
                "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
            ],
        );
        assert_eq!(
            events.last(),
            Some(&StreamEvent::MessageStop {
                stop_reason: StopReason::ToolUse
            })
        );
    }

    #[test]
    fn test_malformed_frame_dropped() {
        let mut parser = AnthropicSseParser::new();
        let events = parser.feed(b"data: {not json\n\n");
        assert!(events.is_empty());
    }
}
