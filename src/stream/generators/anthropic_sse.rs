//! Anthropic SSE 生成器
//!
//! 将 `StreamEvent` 渲染为 Anthropic Messages API SSE 格式。
//!
//! # 不变式
//!
//! - 每个块索引恰好一对 content_block_start / content_block_stop，
//!   索引从 0 单调递增
//! - message_start 在首个内容事件前发出，message_delta + message_stop
//!   收尾，无论上游流以何种方式结束
//! - 工具参数片段原样转发；块关闭时累积文本必须是完整 JSON，
//!   否则发出完整性错误事件
//!
//! # 格式说明
//!
//! ```text
//! event: message_start
//! data: {"type":"message_start","message":{...}}
//!
//! event: content_block_start
//! data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}
//!
//! event: content_block_delta
//! data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}
//!
//! event: content_block_stop
//! data: {"type":"content_block_stop","index":0}
//!
//! event: message_delta
//! data: {"type":"message_delta","delta":{"stop_reason":"end_turn","stop_sequence":null},"usage":{"output_tokens":4}}
//!
//! event: message_stop
//! data: {"type":"message_stop"}
//! ```

use crate::models::anthropic::{new_message_id, new_tool_use_id};
use crate::stream::events::{BlockKind, StopReason, StreamEvent};
use serde_json::json;
use tracing::warn;

/// 当前打开的内容块
#[derive(Debug)]
enum OpenBlock {
    Text {
        index: u32,
    },
    ToolUse {
        index: u32,
        /// 累积的参数 JSON 文本
        input: String,
    },
}

impl OpenBlock {
    fn index(&self) -> u32 {
        match self {
            Self::Text { index } => *index,
            Self::ToolUse { index, .. } => *index,
        }
    }
}

/// Anthropic SSE 生成器
#[derive(Debug)]
pub struct AnthropicSseGenerator {
    /// 消息 ID
    message_id: String,
    /// 客户端请求的原始模型名（不是后端模型 ID）
    model: String,
    message_started: bool,
    message_stopped: bool,
    /// 下一个待分配的块索引
    next_index: u32,
    current: Option<OpenBlock>,
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicSseGenerator {
    /// 创建生成器，`model` 填客户端请求的原始模型名
    pub fn new(model: String) -> Self {
        Self {
            message_id: new_message_id(),
            model,
            message_started: false,
            message_stopped: false,
            next_index: 0,
            current: None,
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    /// 将 StreamEvent 转换为 Anthropic SSE 字符串列表
    pub fn generate(&mut self, event: &StreamEvent) -> Vec<String> {
        let mut out = Vec::new();
        match event {
            StreamEvent::MessageStart { model } => {
                // 上游模型 ID 只记录，不外泄——对外始终报告原始模型名
                if let Some(upstream) = model {
                    tracing::debug!("[STREAM] 上游模型: {}", upstream);
                }
            }

            StreamEvent::ContentBlockStart { kind } => {
                self.ensure_message_started(&mut out);
                self.close_current_block(&mut out);
                match kind {
                    BlockKind::Text => self.open_text_block(&mut out),
                    BlockKind::ToolUse { id, name } => {
                        let id = id.clone().unwrap_or_else(new_tool_use_id);
                        self.open_tool_block(&mut out, &id, name);
                    }
                }
            }

            StreamEvent::TextDelta { text } => {
                self.ensure_message_started(&mut out);
                // 文本增量允许隐式开块；工具块打开时先关掉它
                if !matches!(self.current, Some(OpenBlock::Text { .. })) {
                    self.close_current_block(&mut out);
                    self.open_text_block(&mut out);
                }
                let index = self.current.as_ref().map(OpenBlock::index).unwrap_or(0);
                out.push(sse_event(
                    "content_block_delta",
                    json!({
                        "type": "content_block_delta",
                        "index": index,
                        "delta": {"type": "text_delta", "text": text},
                    }),
                ));
            }

            StreamEvent::ToolUseInputDelta { partial_json } => {
                self.ensure_message_started(&mut out);
                match &mut self.current {
                    Some(OpenBlock::ToolUse { index, input }) => {
                        input.push_str(partial_json);
                        let index = *index;
                        out.push(sse_event(
                            "content_block_delta",
                            json!({
                                "type": "content_block_delta",
                                "index": index,
                                "delta": {"type": "input_json_delta", "partial_json": partial_json},
                            }),
                        ));
                    }
                    _ => {
                        warn!("[STREAM] 工具参数增量没有对应的打开工具块，丢弃");
                        out.push(integrity_error_event(
                            "input_json_delta arrived outside a tool_use block",
                        ));
                    }
                }
            }

            StreamEvent::ContentBlockStop => {
                self.close_current_block(&mut out);
            }

            StreamEvent::Usage {
                input_tokens,
                output_tokens,
            } => {
                if let Some(input) = input_tokens {
                    self.input_tokens = *input;
                }
                if let Some(output) = output_tokens {
                    self.output_tokens = *output;
                }
            }

            StreamEvent::MessageStop { stop_reason } => {
                self.ensure_message_started(&mut out);
                self.close_current_block(&mut out);
                self.emit_message_tail(&mut out, stop_reason);
            }

            StreamEvent::Error {
                error_type,
                message,
            } => {
                out.push(sse_event(
                    "error",
                    json!({
                        "type": "error",
                        "error": {"type": error_type, "message": message},
                    }),
                ));
            }

            StreamEvent::Ping => {
                self.ensure_message_started(&mut out);
                out.push(sse_event("ping", json!({"type": "ping"})));
            }
        }
        out
    }

    /// 流结束时兜底
    ///
    /// 上游在 message_stop 之前断流：强制关闭打开的块并补齐消息
    /// 收尾事件，若确有块被截断则先发完整性错误事件。
    pub fn finalize(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        if self.message_stopped {
            return out;
        }
        if !self.message_started && self.current.is_none() {
            return out;
        }
        if self.current.is_some() {
            out.push(integrity_error_event("stream ended inside a content block"));
            self.close_current_block(&mut out);
        }
        self.emit_message_tail(&mut out, &StopReason::EndTurn);
        out
    }

    fn ensure_message_started(&mut self, out: &mut Vec<String>) {
        if self.message_started {
            return;
        }
        self.message_started = true;
        out.push(sse_event(
            "message_start",
            json!({
                "type": "message_start",
                "message": {
                    "id": self.message_id,
                    "type": "message",
                    "role": "assistant",
                    "model": self.model,
                    "content": [],
                    "stop_reason": null,
                    "stop_sequence": null,
                    "usage": {"input_tokens": self.input_tokens, "output_tokens": 0},
                },
            }),
        ));
    }

    fn open_text_block(&mut self, out: &mut Vec<String>) {
        let index = self.next_index;
        self.next_index += 1;
        self.current = Some(OpenBlock::Text { index });
        out.push(sse_event(
            "content_block_start",
            json!({
                "type": "content_block_start",
                "index": index,
                "content_block": {"type": "text", "text": ""},
            }),
        ));
    }

    fn open_tool_block(&mut self, out: &mut Vec<String>, id: &str, name: &str) {
        let index = self.next_index;
        self.next_index += 1;
        self.current = Some(OpenBlock::ToolUse {
            index,
            input: String::new(),
        });
        out.push(sse_event(
            "content_block_start",
            json!({
                "type": "content_block_start",
                "index": index,
                "content_block": {"type": "tool_use", "id": id, "name": name, "input": {}},
            }),
        ));
    }

    /// 关闭当前块，工具块关闭前校验累积 JSON
    fn close_current_block(&mut self, out: &mut Vec<String>) {
        let Some(block) = self.current.take() else {
            return;
        };
        if let OpenBlock::ToolUse { input, .. } = &block {
            if !input.is_empty()
                && serde_json::from_str::<serde_json::Value>(input).is_err()
            {
                warn!("[STREAM] 工具参数累积后不是完整 JSON: {}", input);
                out.push(integrity_error_event(
                    "accumulated tool input is not valid JSON",
                ));
            }
        }
        out.push(sse_event(
            "content_block_stop",
            json!({"type": "content_block_stop", "index": block.index()}),
        ));
    }

    fn emit_message_tail(&mut self, out: &mut Vec<String>, stop_reason: &StopReason) {
        if self.message_stopped {
            return;
        }
        self.message_stopped = true;
        out.push(sse_event(
            "message_delta",
            json!({
                "type": "message_delta",
                "delta": {"stop_reason": stop_reason.as_anthropic_str(), "stop_sequence": null},
                "usage": {"output_tokens": self.output_tokens},
            }),
        ));
        out.push(sse_event("message_stop", json!({"type": "message_stop"})));
    }
}

/// 组装单个 SSE 事件字符串
fn sse_event(event_type: &str, data: serde_json::Value) -> String {
    format!("event: {}\ndata: {}\n\n", event_type, data)
}

fn integrity_error_event(message: &str) -> String {
    sse_event(
        "error",
        json!({
            "type": "error",
            "error": {"type": "stream_integrity_error", "message": message},
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(events: &[StreamEvent]) -> Vec<String> {
        let mut generator = AnthropicSseGenerator::new("anthropic/claude-test".to_string());
        let mut out = Vec::new();
        for event in events {
            out.extend(generator.generate(event));
        }
        out.extend(generator.finalize());
        out
    }

    fn event_types(sse: &[String]) -> Vec<String> {
        sse.iter()
            .map(|s| {
                s.lines()
                    .next()
                    .unwrap()
                    .strip_prefix("event: ")
                    .unwrap()
                    .to_string()
            })
            .collect()
    }

    fn data_json(sse: &str) -> serde_json::Value {
        let data_line = sse.lines().nth(1).unwrap().strip_prefix("data: ").unwrap();
        serde_json::from_str(data_line).unwrap()
    }

    #[test]
    fn test_text_stream_shape() {
        let sse = drive(&[
            StreamEvent::MessageStart { model: None },
            StreamEvent::Usage {
                input_tokens: Some(10),
                output_tokens: None,
            },
            StreamEvent::TextDelta {
                text: "Hel".to_string(),
            },
            StreamEvent::TextDelta {
                text: "lo".to_string(),
            },
            StreamEvent::Usage {
                input_tokens: None,
                output_tokens: Some(4),
            },
            StreamEvent::MessageStop {
                stop_reason: StopReason::EndTurn,
            },
        ]);

        assert_eq!(
            event_types(&sse),
            vec![
                "message_start",
                "content_block_start",
                "content_block_delta",
                "content_block_delta",
                "content_block_stop",
                "message_delta",
                "message_stop",
            ]
        );
        // message_start 等到首个内容事件才发出，此时已知输入 token 数
        let start = data_json(&sse[0]);
        assert_eq!(start["message"]["model"], "anthropic/claude-test");
        assert_eq!(start["message"]["usage"]["input_tokens"], 10);
        let delta = data_json(&sse[5]);
        assert_eq!(delta["delta"]["stop_reason"], "end_turn");
        assert_eq!(delta["usage"]["output_tokens"], 4);
    }

    #[test]
    fn test_tool_block_fragments_forwarded_verbatim() {
        let fragments = ["{\"file_", "path\": \"/tmp", "/a.txt\"}"];
        let mut events = vec![StreamEvent::ContentBlockStart {
            kind: BlockKind::ToolUse {
                id: None,
                name: "Write".to_string(),
            },
        }];
        for fragment in fragments {
            events.push(StreamEvent::ToolUseInputDelta {
                partial_json: fragment.to_string(),
            });
        }
        events.push(StreamEvent::ContentBlockStop);
        events.push(StreamEvent::MessageStop {
            stop_reason: StopReason::ToolUse,
        });
        let sse = drive(&events);

        // 三个片段就是三个 delta 事件，逐字转发
        let deltas: Vec<_> = sse
            .iter()
            .filter(|s| s.starts_with("event: content_block_delta"))
            .collect();
        assert_eq!(deltas.len(), 3);
        for (sse_str, fragment) in deltas.iter().zip(fragments) {
            assert_eq!(data_json(sse_str)["delta"]["partial_json"], fragment);
        }
        // 合成的工具块带新 ID
        let start = sse
            .iter()
            .find(|s| s.starts_with("event: content_block_start"))
            .unwrap();
        let id = data_json(start)["content_block"]["id"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(id.starts_with("toolu_"));
        assert!(!sse.iter().any(|s| s.starts_with("event: error")));
    }

    #[test]
    fn test_block_pairing_per_index() {
        let sse = drive(&[
            StreamEvent::TextDelta {
                text: "a".to_string(),
            },
            StreamEvent::ContentBlockStart {
                kind: BlockKind::ToolUse {
                    id: Some("toolu_1".to_string()),
                    name: "Bash".to_string(),
                },
            },
            StreamEvent::ToolUseInputDelta {
                partial_json: "{}".to_string(),
            },
            StreamEvent::ContentBlockStop,
            StreamEvent::MessageStop {
                stop_reason: StopReason::ToolUse,
            },
        ]);
        assert_block_pairing(&sse);
    }

    #[test]
    fn test_truncated_stream_force_closed_with_error() {
        let sse = drive(&[
            StreamEvent::ContentBlockStart {
                kind: BlockKind::ToolUse {
                    id: Some("toolu_1".to_string()),
                    name: "Bash".to_string(),
                },
            },
            StreamEvent::ToolUseInputDelta {
                partial_json: "{\"com".to_string(),
            },
            // 流在这里断掉，没有 ContentBlockStop / MessageStop
        ]);

        let types = event_types(&sse);
        assert!(types.contains(&"error".to_string()));
        assert!(types.contains(&"content_block_stop".to_string()));
        assert_eq!(types.last().unwrap(), "message_stop");
        assert_block_pairing(&sse);
    }

    #[test]
    fn test_unparsable_tool_input_flagged_at_close() {
        let sse = drive(&[
            StreamEvent::ContentBlockStart {
                kind: BlockKind::ToolUse {
                    id: Some("toolu_1".to_string()),
                    name: "Bash".to_string(),
                },
            },
            StreamEvent::ToolUseInputDelta {
                partial_json: "{broken".to_string(),
            },
            StreamEvent::ContentBlockStop,
            StreamEvent::MessageStop {
                stop_reason: StopReason::EndTurn,
            },
        ]);

        let error = sse.iter().find(|s| s.starts_with("event: error")).unwrap();
        assert_eq!(
            data_json(error)["error"]["type"],
            "stream_integrity_error"
        );
        assert_block_pairing(&sse);
    }

    #[test]
    fn test_orphan_input_delta_is_integrity_error() {
        let sse = drive(&[StreamEvent::ToolUseInputDelta {
            partial_json: "{}".to_string(),
        }]);
        assert!(sse.iter().any(|s| s.starts_with("event: error")));
    }

    #[test]
    fn test_empty_stream_produces_nothing() {
        let sse = drive(&[]);
        assert!(sse.is_empty());
    }

    /// 校验每个块索引恰好一对 start/stop，且 start 在 stop 之前
    fn assert_block_pairing(sse: &[String]) {
        use std::collections::HashMap;
        let mut starts: HashMap<u64, usize> = HashMap::new();
        let mut stops: HashMap<u64, usize> = HashMap::new();
        for (position, event) in sse.iter().enumerate() {
            let first_line = event.lines().next().unwrap();
            if first_line == "event: content_block_start" {
                let index = data_json(event)["index"].as_u64().unwrap();
                assert!(starts.insert(index, position).is_none(), "duplicate start");
            } else if first_line == "event: content_block_stop" {
                let index = data_json(event)["index"].as_u64().unwrap();
                assert!(stops.insert(index, position).is_none(), "duplicate stop");
            }
        }
        assert_eq!(starts.len(), stops.len());
        for (index, start_position) in &starts {
            let stop_position = stops.get(index).expect("missing stop");
            assert!(start_position < stop_position);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_event() -> impl Strategy<Value = StreamEvent> {
            prop_oneof![
                "[a-z ]{0,8}".prop_map(|text| StreamEvent::TextDelta { text }),
                ("[A-Za-z]{1,6}", proptest::option::of("[a-z_0-9]{1,8}")).prop_map(
                    |(name, id)| StreamEvent::ContentBlockStart {
                        kind: BlockKind::ToolUse { id, name },
                    }
                ),
                Just(StreamEvent::ContentBlockStart {
                    kind: BlockKind::Text
                }),
                "[{}\"a-z:,]{0,6}".prop_map(|partial_json| StreamEvent::ToolUseInputDelta {
                    partial_json
                }),
                Just(StreamEvent::ContentBlockStop),
                Just(StreamEvent::Ping),
            ]
        }

        proptest! {
            /// 任意事件序列都不破坏块配对不变式
            #[test]
            fn prop_block_pairing_holds(events in proptest::collection::vec(arb_event(), 0..24)) {
                let sse = drive(&events);
                assert_block_pairing(&sse);
            }

            /// 任意事件序列生成的流要么为空，要么以 message_stop 结尾
            #[test]
            fn prop_stream_terminates(events in proptest::collection::vec(arb_event(), 1..24)) {
                let sse = drive(&events);
                if !sse.is_empty() {
                    let last = sse.last().unwrap();
                    prop_assert!(last.starts_with("event: message_stop"));
                }
            }
        }
    }
}
