//! 转换器 Trait 定义
//!
//! 定义请求和响应转换器的核心接口。
//!
//! # 设计原则
//!
//! - `RequestTranslator`: 将 Anthropic Messages 请求转换为后端协议请求
//! - `ResponseTranslator`: 将后端非流式响应还原为 content block 序列
//! - 流式方向不走这两个 trait：解析器产出 `StreamEvent` 中间表示，
//!   由 SSE 生成器统一渲染（见 `stream` 模块）
//!
//! 请求方向只读 correlator；响应方向可能登记网关合成的新工具调用 ID，
//! 因此接收 `&mut self`。

use crate::error::GatewayError;
use crate::models::anthropic::{ContentBlock, MessagesRequest, Usage};

/// 请求转换器 Trait
///
/// # 类型参数
///
/// - `Output`: 后端请求类型（如 Gemini GenerateContentRequest）
pub trait RequestTranslator {
    /// 后端请求类型
    type Output;

    /// 转换请求
    fn translate_request(&self, request: &MessagesRequest) -> Result<Self::Output, GatewayError>;
}

/// 响应转换器 Trait
///
/// 返回 `(content, stop_reason, usage)` 三元组，由调用方组装成
/// `MessagesResponse`——响应的 model 字段必须填写客户端请求的
/// 原始模型名，不是后端实际模型 ID。
pub trait ResponseTranslator {
    /// 后端响应类型
    type Input;

    /// 转换响应
    fn translate_response(
        &mut self,
        response: Self::Input,
    ) -> Result<(Vec<ContentBlock>, String, Usage), GatewayError>;
}
