//! Gemini 风格后端转换
//!
//! 该后端有结构化函数调用通道，但关联语义与 Anthropic 不同：
//! `functionResponse` 以工具名而非调用 ID 关联，且后端不产生调用 ID。
//! 请求方向通过 correlator 把 `tool_use_id` 还原为工具名，响应方向
//! 为每个 `functionCall` 合成新的 `toolu_` ID 并登记。

pub mod request;
pub mod response;

pub use request::GeminiRequestTranslator;
pub use response::GeminiResponseTranslator;
