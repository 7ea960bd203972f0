//! 协议数据模型
//!
//! 各 Provider 的请求/响应类型定义：
//! - `anthropic`: Messages 协议（网关的前端格式）
//! - `openai`: chat completions 格式
//! - `gemini`: generateContent 格式

pub mod anthropic;
pub mod gemini;
pub mod openai;
