//! 统一流事件类型
//!
//! 定义流式传输的中间表示 (Intermediate Representation)，
//! 用于解耦解析器 (parsers) 和生成器 (generators)。
//!
//! # 设计原则
//!
//! - Parsers 输出 `StreamEvent`
//! - Generators 消费 `StreamEvent` 生成前端 SSE
//! - 三种后端流格式（Anthropic SSE、OpenAI SSE、Gemini SSE）都
//!   归一到相同的事件类型，块索引由生成器统一分配

use serde::{Deserialize, Serialize};

/// 统一流事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// 消息开始
    ///
    /// `model` 是后端上报的模型 ID，生成器改写为客户端的原始模型名
    MessageStart {
        /// 后端模型 ID（可能缺失）
        model: Option<String>,
    },

    /// 内容块开始
    ///
    /// 文本块允许隐式开始（首个 TextDelta 自动开块），
    /// 工具块必须显式开始
    ContentBlockStart {
        /// 内容块类型
        kind: BlockKind,
    },

    /// 文本内容增量
    TextDelta {
        /// 文本内容
        text: String,
    },

    /// 工具调用参数增量（部分 JSON 片段，原样传递）
    ToolUseInputDelta {
        /// 参数增量
        partial_json: String,
    },

    /// 当前内容块结束
    ContentBlockStop,

    /// 消息结束
    MessageStop {
        /// 停止原因
        stop_reason: StopReason,
    },

    /// Token 使用统计
    ///
    /// 后端分批上报（输入量在流头、输出量在流尾），缺失的字段为 None
    Usage {
        /// 输入 token 数
        input_tokens: Option<u32>,
        /// 输出 token 数
        output_tokens: Option<u32>,
    },

    /// 错误事件
    Error {
        /// 错误类型
        error_type: String,
        /// 错误消息
        message: String,
    },

    /// Ping/心跳事件
    Ping,
}

/// 内容块类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    /// 文本内容
    Text,
    /// 工具调用
    ///
    /// Gemini 后端不产生调用 ID，`id` 为 None 时由生成器合成
    ToolUse {
        /// 工具调用 ID
        id: Option<String>,
        /// 工具名称
        name: String,
    },
}

/// 停止原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// 正常结束
    EndTurn,
    /// 达到最大 token 数
    MaxTokens,
    /// 需要工具调用
    ToolUse,
    /// 命中停止序列
    StopSequence,
    /// 其他原因
    Other(String),
}

impl Default for StopReason {
    fn default() -> Self {
        Self::EndTurn
    }
}

impl StopReason {
    /// 从各后端的停止原因字符串解析
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "end_turn" | "stop" => Self::EndTurn,
            "max_tokens" | "length" => Self::MaxTokens,
            "tool_use" | "tool_calls" => Self::ToolUse,
            "stop_sequence" => Self::StopSequence,
            _ => Self::Other(s.to_string()),
        }
    }

    /// 转换为 Anthropic 格式的字符串
    pub fn as_anthropic_str(&self) -> &str {
        match self {
            Self::EndTurn => "end_turn",
            Self::MaxTokens => "max_tokens",
            Self::ToolUse => "tool_use",
            Self::StopSequence => "stop_sequence",
            Self::Other(s) => s,
        }
    }
}
