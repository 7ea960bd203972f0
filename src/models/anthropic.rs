//! Anthropic Messages 协议类型
//!
//! 网关对客户端呈现的协议。content 支持纯字符串和 content block
//! 序列两种形态，block 序列的顺序在所有转换中保持不变。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages 请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub stream: bool,
}

/// 对话消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// `user` 或 `assistant`
    pub role: String,
    pub content: MessageContent,
}

/// 消息内容：纯字符串或 content block 序列
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// 以 block 序列视图访问内容
    pub fn as_blocks(&self) -> Vec<ContentBlock> {
        match self {
            Self::Text(text) => vec![ContentBlock::Text { text: text.clone() }],
            Self::Blocks(blocks) => blocks.clone(),
        }
    }
}

/// Content block
///
/// 网关核心的标签联合类型。`ToolResult.content` 同样是显式的
/// 字符串/块序列联合，不做临时的 JSON 形状探测。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: ToolResultContent,
    },
}

/// tool_result 的内容
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// 工具定义
///
/// `input_schema` 是 JSON Schema 形状的对象，网关只做结构透传，
/// 从不检查或校验其内部。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: serde_json::Value,
}

/// Messages 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub role: String,
    pub model: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub stop_sequence: Option<String>,
    pub usage: Usage,
}

impl MessagesResponse {
    /// 构建 assistant 响应
    pub fn new(model: &str, content: Vec<ContentBlock>, stop_reason: &str, usage: Usage) -> Self {
        Self {
            id: new_message_id(),
            message_type: "message".to_string(),
            role: "assistant".to_string(),
            model: model.to_string(),
            content,
            stop_reason: Some(stop_reason.to_string()),
            stop_sequence: None,
            usage,
        }
    }
}

/// Token 使用量
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// count_tokens 请求（messages + 可选 system/tools，估算用）
#[derive(Debug, Clone, Deserialize)]
pub struct CountTokensRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub system: Option<serde_json::Value>,
    #[serde(default)]
    pub tools: Option<Vec<ToolDefinition>>,
}

/// count_tokens 响应
#[derive(Debug, Clone, Serialize)]
pub struct CountTokensResponse {
    pub input_tokens: u32,
}

/// 生成消息 ID（`msg_` 前缀）
pub fn new_message_id() -> String {
    format!("msg_{}", Uuid::new_v4().simple())
}

/// 生成工具调用 ID（`toolu_` 前缀）
pub fn new_tool_use_id() -> String {
    format!("toolu_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_content_deserializes() {
        let json = r#"{"role":"user","content":"hello"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(matches!(msg.content, MessageContent::Text(ref t) if t == "hello"));
    }

    #[test]
    fn test_block_content_deserializes() {
        let json = r#"{
            "role": "assistant",
            "content": [
                {"type": "text", "text": "I'll run it."},
                {"type": "tool_use", "id": "toolu_123", "name": "Bash", "input": {"command": "ls"}}
            ]
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        let blocks = msg.content.as_blocks();
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[1], ContentBlock::ToolUse { ref name, .. } if name == "Bash"));
    }

    #[test]
    fn test_tool_result_string_and_blocks() {
        let json = r#"{"type":"tool_result","tool_use_id":"toolu_1","content":"ok"}"#;
        let block: ContentBlock = serde_json::from_str(json).unwrap();
        assert!(matches!(
            block,
            ContentBlock::ToolResult {
                content: ToolResultContent::Text(_),
                ..
            }
        ));

        let json = r#"{
            "type": "tool_result",
            "tool_use_id": "toolu_1",
            "content": [{"type": "text", "text": "line 1"}, {"type": "text", "text": "line 2"}]
        }"#;
        let block: ContentBlock = serde_json::from_str(json).unwrap();
        match block {
            ContentBlock::ToolResult {
                content: ToolResultContent::Blocks(blocks),
                ..
            } => assert_eq!(blocks.len(), 2),
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_content_block_serializes_with_type_tag() {
        let block = ContentBlock::ToolUse {
            id: "toolu_abc".to_string(),
            name: "Write".to_string(),
            input: serde_json::json!({"file_path": "/tmp/a"}),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "tool_use");
        assert_eq!(json["name"], "Write");
    }

    #[test]
    fn test_id_formats() {
        assert!(new_message_id().starts_with("msg_"));
        assert!(new_tool_use_id().starts_with("toolu_"));
        assert_ne!(new_tool_use_id(), new_tool_use_id());
    }
}
