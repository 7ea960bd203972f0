//! 工具调用关联器
//!
//! 每个请求一张 `tool_use_id → {工具名, 来源 Provider}` 映射表。
//! 网关跨 HTTP 调用无状态——客户端每轮重传完整历史，
//! 所以表的生命周期只覆盖一次请求转换加上对应的响应/流式转换。
//!
//! 消费方：
//! - Gemini 请求转换：`functionResponse` 需要工具名而非调用 ID
//! - Anthropic 请求转换：校验 tool_result 的结构化链接
//! - 响应/流式转换：登记网关合成的新 ID

use crate::models::anthropic::{ContentBlock, Message, MessageContent};
use crate::router::ProviderType;
use std::collections::HashMap;

/// 已登记的工具调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRecord {
    /// 工具名
    pub name: String,
    /// 产生该调用的 Provider
    pub provider: ProviderType,
}

/// 工具调用关联器
#[derive(Debug, Default)]
pub struct ToolCallCorrelator {
    records: HashMap<String, ToolCallRecord>,
}

impl ToolCallCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从请求历史构建关联器
    ///
    /// 扫描所有 assistant 消息中的 `tool_use` block。协议只要求
    /// tool_result 引用紧邻前一个 assistant 轮次的 ID，但登记全部
    /// 历史 ID 保证过期引用不会使网关崩溃——是否拒绝由转换层决定。
    pub fn from_messages(messages: &[Message], provider: ProviderType) -> Self {
        let mut correlator = Self::new();
        for message in messages {
            if message.role != "assistant" {
                continue;
            }
            if let MessageContent::Blocks(blocks) = &message.content {
                for block in blocks {
                    if let ContentBlock::ToolUse { id, name, .. } = block {
                        correlator.record(id, name, provider);
                    }
                }
            }
        }
        correlator
    }

    /// 登记一个 tool_use ID
    ///
    /// ID 一旦登记不再改写（协议要求 ID 在会话内不可变）。
    pub fn record(&mut self, id: &str, name: &str, provider: ProviderType) {
        self.records
            .entry(id.to_string())
            .or_insert_with(|| ToolCallRecord {
                name: name.to_string(),
                provider,
            });
    }

    /// 查找 tool_use ID
    pub fn lookup(&self, id: &str) -> Option<&ToolCallRecord> {
        self.records.get(id)
    }

    /// 查找工具名
    pub fn tool_name(&self, id: &str) -> Option<&str> {
        self.records.get(id).map(|r| r.name.as_str())
    }

    /// 已登记的调用数量
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
