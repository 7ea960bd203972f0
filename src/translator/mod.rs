//! 协议转换层
//!
//! 处理 Anthropic Messages 前端格式与各后端格式之间的请求和响应转换。
//!
//! # 架构设计
//!
//! ```text
//! translator/
//! ├── traits.rs       # 转换器 trait 定义
//! ├── downgrade.rs    # 工具文本降级：清单渲染 + 意图检测
//! ├── anthropic.rs    # Anthropic 原生后端（模型改写 + 链接校验）
//! ├── openai/         # OpenAI 风格后端（工具降级为文本）
//! │   ├── request.rs
//! │   └── response.rs
//! └── gemini/         # Gemini 风格后端（结构化函数调用）
//!     ├── request.rs
//!     └── response.rs
//! ```

pub mod anthropic;
pub mod downgrade;
pub mod gemini;
pub mod openai;
pub mod traits;

pub use traits::{RequestTranslator, ResponseTranslator};

use crate::models::anthropic::{ContentBlock, ToolResultContent};

/// 多块 tool_result 展平时的分隔符
///
/// 行锚定的分隔符，JSON 转义后的单行文本拼接不可能产生它。
pub const TOOL_RESULT_SEPARATOR: &str = "\n---\n";

/// 把 tool_result 内容展平为单个字符串
///
/// 字符串内容原样返回；块序列按原始顺序拼接，文本块取其文本，
/// 非文本块作为 JSON 文本透传（网关对其内部不做解释）。
pub fn flatten_tool_result(content: &ToolResultContent) -> String {
    match content {
        ToolResultContent::Text(text) => text.clone(),
        ToolResultContent::Blocks(blocks) => blocks
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text.clone(),
                other => serde_json::to_string(other).unwrap_or_default(),
            })
            .collect::<Vec<_>>()
            .join(TOOL_RESULT_SEPARATOR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::anthropic::ContentBlock;

    #[test]
    fn test_flatten_string_passthrough() {
        let content = ToolResultContent::Text("total 48".to_string());
        assert_eq!(flatten_tool_result(&content), "total 48");
    }

    #[test]
    fn test_flatten_blocks_preserves_order() {
        let content = ToolResultContent::Blocks(vec![
            ContentBlock::Text {
                text: "first".to_string(),
            },
            ContentBlock::Text {
                text: "second".to_string(),
            },
        ]);
        assert_eq!(flatten_tool_result(&content), "first\n---\nsecond");
    }

    #[test]
    fn test_flatten_opaque_block_forwarded_as_text() {
        let content = ToolResultContent::Blocks(vec![
            ContentBlock::Text {
                text: "before".to_string(),
            },
            ContentBlock::ToolUse {
                id: "toolu_x".to_string(),
                name: "Bash".to_string(),
                input: serde_json::json!({}),
            },
        ]);
        let flattened = flatten_tool_result(&content);
        assert!(flattened.starts_with("before\n---\n"));
        assert!(flattened.contains("tool_use"));
    }
}
