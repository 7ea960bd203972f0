//! 工具文本降级
//!
//! 面向无结构化函数调用通道的后端（OpenAI 风格），工具能力降级为
//! 纯文本协议：
//!
//! - 请求方向：工具清单渲染为固定格式的提示词前导；历史中的
//!   tool_use / tool_result block 渲染为标记行文本
//! - 响应方向：扫描回复文本中的工具调用意图，命中则在 content
//!   中追加带标记的文本块，绝不合成 tool_use block
//!
//! 检测规则是确定性的：相同输入永远产生相同输出。

use crate::models::anthropic::ToolDefinition;
use once_cell::sync::Lazy;
use regex::Regex;

/// 工具调用标记
///
/// 前导指示模型以 `Tool usage: <名称> <JSON 参数>` 行声明调用；
/// 检测器识别同一标记。改动此常量会同时破坏两个方向。
pub const TOOL_USAGE_MARKER: &str = "Tool usage:";

/// 行首标记匹配（允许前导空白）
static MARKER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*Tool usage:").expect("marker regex"));

/// 检测到的工具调用意图
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedIntent {
    /// 工具名
    pub name: String,
    /// 参数 JSON 原文
    pub arguments: String,
}

/// 把工具清单渲染为提示词前导
///
/// 逐个工具输出名称、描述和参数 schema。serde_json 默认按键排序
/// 序列化 Map，渲染结果对相同清单是确定的。
pub fn render_tool_preamble(tools: &[ToolDefinition]) -> String {
    let mut preamble = String::from("In this environment you have access to the following tools:\n");
    for tool in tools {
        preamble.push_str("\nTool: ");
        preamble.push_str(&tool.name);
        if let Some(description) = &tool.description {
            preamble.push_str("\nDescription: ");
            preamble.push_str(description);
        }
        preamble.push_str("\nParameters: ");
        preamble.push_str(&serde_json::to_string(&tool.input_schema).unwrap_or_default());
        preamble.push('\n');
    }
    preamble.push_str(
        "\nTo call a tool, reply with a single line in the form:\n\
         Tool usage: <tool name> <JSON arguments>\n",
    );
    preamble
}

/// 把历史中的 tool_use block 渲染为标记行
pub fn render_tool_use_line(name: &str, input: &serde_json::Value) -> String {
    format!(
        "{} {} {}",
        TOOL_USAGE_MARKER,
        name,
        serde_json::to_string(input).unwrap_or_else(|_| "{}".to_string())
    )
}

/// 把历史中的 tool_result block 渲染为文本
pub fn render_tool_result_text(tool_use_id: &str, flattened: &str) -> String {
    format!("Tool result for {}:\n{}", tool_use_id, flattened)
}

/// 扫描回复文本中的工具调用意图
///
/// 两条规则，满足其一即判定命中：
///
/// 1. 文本中存在以 `Tool usage:` 开头的行（模型遵循了前导格式）
/// 2. 某个已声明的工具名后紧跟一个配平且可解析的 `{...}` JSON 对象
///    （名称与 `{` 之间只允许空白或 `:`、`(`、`-`）
///
/// 规则 1 命中时返回 None——文本已带标记，无需追加；
/// 规则 2 命中时返回最早出现位置的那个调用。
pub fn detect_tool_intent(text: &str, tool_names: &[&str]) -> Detection {
    if MARKER_LINE.is_match(text) {
        return Detection::AlreadyMarked;
    }

    let mut earliest: Option<(usize, DetectedIntent)> = None;
    for name in tool_names {
        let mut search_from = 0;
        while let Some(offset) = text[search_from..].find(name) {
            let start = search_from + offset;
            let after_name = start + name.len();
            search_from = after_name;

            if let Some(json) = json_object_after(&text[after_name..]) {
                if serde_json::from_str::<serde_json::Value>(json).is_ok() {
                    let candidate = (
                        start,
                        DetectedIntent {
                            name: name.to_string(),
                            arguments: json.to_string(),
                        },
                    );
                    match &earliest {
                        Some((pos, _)) if *pos <= start => {}
                        _ => earliest = Some(candidate),
                    }
                    break;
                }
            }
        }
    }

    match earliest {
        Some((_, intent)) => Detection::Detected(intent),
        None => Detection::None,
    }
}

/// 意图检测结果
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// 文本中已有标记行
    AlreadyMarked,
    /// 检测到未标记的调用意图
    Detected(DetectedIntent),
    /// 无调用意图
    None,
}

/// 在片段起始位置附近提取配平的 `{...}`
///
/// 起始处只允许空白或 `:`、`(`、`-` 等引导符，随后必须是 `{`。
/// 配平扫描跳过 JSON 字符串内部的花括号和转义字符。
fn json_object_after(fragment: &str) -> Option<&str> {
    let mut chars = fragment.char_indices();
    let open = loop {
        let (index, ch) = chars.next()?;
        match ch {
            '{' => break index,
            c if c.is_whitespace() => continue,
            ':' | '(' | '-' => continue,
            _ => return None,
        }
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (index, ch) in fragment[open..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&fragment[open..open + index + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, description: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: Some(description.to_string()),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {"file_path": {"type": "string"}}
            }),
        }
    }

    #[test]
    fn test_preamble_is_deterministic() {
        let tools = vec![tool("Write", "Write a file"), tool("Bash", "Run a command")];
        let first = render_tool_preamble(&tools);
        let second = render_tool_preamble(&tools);
        assert_eq!(first, second);
        assert!(first.contains("Tool: Write"));
        assert!(first.contains("Tool: Bash"));
        assert!(first.contains("Tool usage: <tool name> <JSON arguments>"));
    }

    #[test]
    fn test_marker_line_detected() {
        let text = "Sure, writing the file now.\nTool usage: Write {\"file_path\": \"/tmp/a\"}";
        assert_eq!(detect_tool_intent(text, &["Write"]), Detection::AlreadyMarked);
    }

    #[test]
    fn test_unmarked_intent_detected() {
        let text = r#"I'll call Write {"file_path": "/tmp/a", "content": "hi"} to create it."#;
        match detect_tool_intent(text, &["Write", "Bash"]) {
            Detection::Detected(intent) => {
                assert_eq!(intent.name, "Write");
                let args: serde_json::Value = serde_json::from_str(&intent.arguments).unwrap();
                assert_eq!(args["file_path"], "/tmp/a");
            }
            other => panic!("unexpected detection: {:?}", other),
        }
    }

    #[test]
    fn test_plain_prose_not_detected() {
        let text = "You could use the Write tool for that, or edit the file manually.";
        assert_eq!(detect_tool_intent(text, &["Write"]), Detection::None);
    }

    #[test]
    fn test_unparsable_braces_not_detected() {
        let text = "Write {not json at all";
        assert_eq!(detect_tool_intent(text, &["Write"]), Detection::None);
    }

    #[test]
    fn test_nested_object_extracted_balanced() {
        let text = r#"Bash: {"command": "echo", "env": {"A": "{b}"}} done"#;
        match detect_tool_intent(text, &["Bash"]) {
            Detection::Detected(intent) => {
                assert_eq!(intent.arguments, r#"{"command": "echo", "env": {"A": "{b}"}}"#);
            }
            other => panic!("unexpected detection: {:?}", other),
        }
    }

    #[test]
    fn test_earliest_tool_wins() {
        let text = r#"Bash {"command": "ls"} then Write {"file_path": "/tmp/a"}"#;
        match detect_tool_intent(text, &["Write", "Bash"]) {
            Detection::Detected(intent) => assert_eq!(intent.name, "Bash"),
            other => panic!("unexpected detection: {:?}", other),
        }
    }

    #[test]
    fn test_render_tool_use_line_format() {
        let line = render_tool_use_line("Bash", &serde_json::json!({"command": "ls"}));
        assert_eq!(line, r#"Tool usage: Bash {"command":"ls"}"#);
    }
}
