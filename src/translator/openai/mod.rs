//! OpenAI 风格后端转换
//!
//! 该后端按无结构化函数调用通道处理（见 `router::ToolCapability`）：
//! 请求方向把工具清单和历史工具块降级为文本，响应方向扫描回复中的
//! 调用意图并以标记文本块呈现，stop_reason 永远不是 `tool_use`。

pub mod request;
pub mod response;

pub use request::OpenAiRequestTranslator;
pub use response::OpenAiResponseTranslator;
