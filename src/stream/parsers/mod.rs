//! 流式数据解析器
//!
//! 解析不同后端的流式响应格式，输出统一的 `StreamEvent`。
//!
//! # 支持的格式
//!
//! - Anthropic SSE（原生后端）
//! - OpenAI SSE（chat completions chunk）
//! - Gemini SSE（streamGenerateContent `alt=sse`）
//!
//! 三个解析器共享 `SseFrameBuffer` 做帧重组：网络分块与 SSE 帧
//! 边界无关，帧可能跨 chunk 或一个 chunk 含多帧。

pub mod anthropic_sse;
pub mod gemini_sse;
pub mod openai_sse;

pub use anthropic_sse::AnthropicSseParser;
pub use gemini_sse::GeminiSseParser;
pub use openai_sse::OpenAiSseParser;

use crate::stream::StreamEvent;

/// 后端流解析器 Trait
///
/// `feed` 接收网络字节块，返回该块完成的所有事件；
/// `finish` 在流结束时调用，冲刷缓冲区的残余数据。
pub trait StreamParser {
    fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent>;

    fn finish(&mut self) -> Vec<StreamEvent> {
        Vec::new()
    }
}

/// 一个完整的 SSE 帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// `event:` 字段
    pub event: Option<String>,
    /// `data:` 字段（多行 data 以换行拼接）
    pub data: String,
}

/// SSE 帧重组缓冲区
///
/// 按 SSE 规范以空行分帧，支持 `\n` 和 `\r\n` 行尾，
/// 忽略注释行（`:` 开头）。
#[derive(Debug, Default)]
pub struct SseFrameBuffer {
    buffer: String,
}

impl SseFrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加字节并返回所有完成的帧
    ///
    /// 非 UTF-8 字节按替换字符处理（SSE 规范要求流是 UTF-8）。
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut frames = Vec::new();
        loop {
            let Some(boundary) = find_frame_boundary(&self.buffer) else {
                break;
            };
            let raw: String = self.buffer.drain(..boundary.frame_end).collect();
            self.buffer.drain(..boundary.separator_len);
            if let Some(frame) = parse_frame(&raw) {
                frames.push(frame);
            }
        }
        frames
    }

    /// 流结束时冲刷残余数据
    ///
    /// 末尾没有空行的帧也要解析（部分后端最后一帧不带分隔符）。
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buffer);
        parse_frame(&rest)
    }
}

struct FrameBoundary {
    frame_end: usize,
    separator_len: usize,
}

/// 查找最近的帧分隔空行（`\n\n` 或 `\r\n\r\n`）
fn find_frame_boundary(buffer: &str) -> Option<FrameBoundary> {
    let lf = buffer.find("\n\n");
    let crlf = buffer.find("\r\n\r\n");
    match (lf, crlf) {
        (Some(l), Some(c)) if c < l => Some(FrameBoundary {
            frame_end: c,
            separator_len: 4,
        }),
        (Some(l), _) => Some(FrameBoundary {
            frame_end: l,
            separator_len: 2,
        }),
        (None, Some(c)) => Some(FrameBoundary {
            frame_end: c,
            separator_len: 4,
        }),
        (None, None) => None,
    }
}

/// 解析单帧文本
fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data_lines = Vec::new();

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(value) = line.strip_prefix("event:") {
            event = Some(value.trim_start().to_string());
        } else if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value));
        }
        // 其余行（注释、id、retry）忽略
    }

    if event.is_none() && data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data_lines.join("\n"),
    })
}
