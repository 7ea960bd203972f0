//! SSE 流生成器
//!
//! 将统一的 `StreamEvent` 渲染为前端的 Anthropic SSE 格式。
//! 块索引在这里统一分配，块配对保证也在这里兜底。

pub mod anthropic_sse;

pub use anthropic_sse::AnthropicSseGenerator;
