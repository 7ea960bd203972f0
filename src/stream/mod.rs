//! 流式处理层
//!
//! 提供统一的流式数据处理能力，包括：
//! - 事件类型定义 (events)
//! - 后端流格式解析 (parsers)
//! - 前端流格式生成 (generators)
//!
//! # 架构设计
//!
//! ```text
//! 后端响应流 ──> [Parser] ──> StreamEvent ──> [Generator] ──> 前端 Anthropic SSE
//!
//! 例如：
//! OpenAI SSE  ──> [OpenAiSseParser]  ──> StreamEvent ──> [AnthropicSseGenerator] ──> Anthropic SSE
//! Gemini SSE  ──> [GeminiSseParser]  ──> StreamEvent ──> [AnthropicSseGenerator] ──> Anthropic SSE
//! ```
//!
//! 原生 Anthropic 后端同样走解析-重生成：模型 ID 要还原为客户端的
//! 原始模型名，块配对保证由网关兜底，不信任上游。

pub mod events;
pub mod generators;
pub mod parsers;
pub mod pipeline;

pub use events::{BlockKind, StopReason, StreamEvent};
pub use generators::AnthropicSseGenerator;
pub use parsers::{AnthropicSseParser, GeminiSseParser, OpenAiSseParser, StreamParser};
pub use pipeline::{create_sse_stream, StreamPipeline};
