//! proxymux - Anthropic Messages API 网关
//!
//! 接收 Anthropic Messages 格式的请求（含工具调用和流式传输），
//! 根据模型名路由到不同的后端 Provider（Anthropic、OpenAI、Gemini），
//! 并在两个方向上进行协议转换。
//!
//! # 架构设计
//!
//! ```text
//! 客户端请求 (Anthropic Messages)
//!     ↓
//! [router]      模型解析：model name → ModelRoute (provider + capability)
//!     ↓
//! [translator]  请求转换：Anthropic → Provider 原生格式
//!     ↓
//! [providers]   后端调用 (reqwest)
//!     ↓
//! [translator]  非流式：Provider 响应 → Anthropic content blocks
//! [stream]      流式：Provider chunks → StreamEvent → Anthropic SSE
//!     ↓
//! 客户端响应 (Anthropic Messages / SSE)
//! ```
//!
//! [correlator] 跨越请求和响应两个方向，跟踪 tool_use id 与工具名的映射。

pub mod config;
pub mod correlator;
pub mod error;
pub mod models;
pub mod providers;
pub mod router;
pub mod server;
pub mod stream;
pub mod translator;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use router::{ModelResolver, ModelRoute, ProviderType, ToolCapability};
