//! 统一流处理管道
//!
//! 封装完整的流式处理流程：后端字节流 → 解析 → StreamEvent → 前端 SSE。
//! 三种后端共用同一条管道，只换解析器；前端固定是 Anthropic SSE。
//!
//! # 使用示例
//!
//! ```ignore
//! let pipeline = StreamPipeline::new(ProviderType::Gemini, original_model);
//! let sse_stream = create_sse_stream(byte_stream, pipeline);
//! ```

use crate::router::ProviderType;
use crate::stream::events::StreamEvent;
use crate::stream::generators::AnthropicSseGenerator;
use crate::stream::parsers::{
    AnthropicSseParser, GeminiSseParser, OpenAiSseParser, StreamParser,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};

/// 后端解析器封装
enum BackendParser {
    Anthropic(AnthropicSseParser),
    OpenAi(OpenAiSseParser),
    Gemini(GeminiSseParser),
}

impl BackendParser {
    fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        match self {
            Self::Anthropic(parser) => parser.feed(chunk),
            Self::OpenAi(parser) => parser.feed(chunk),
            Self::Gemini(parser) => parser.feed(chunk),
        }
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        match self {
            Self::Anthropic(parser) => parser.finish(),
            Self::OpenAi(parser) => parser.finish(),
            Self::Gemini(parser) => parser.finish(),
        }
    }
}

/// 统一流处理管道
///
/// 将后端字节流转换为前端 Anthropic SSE 字符串流。
pub struct StreamPipeline {
    parser: BackendParser,
    generator: AnthropicSseGenerator,
}

impl StreamPipeline {
    /// 创建管道
    ///
    /// `original_model` 是客户端请求的原始模型名，流中对外上报它。
    pub fn new(provider: ProviderType, original_model: String) -> Self {
        let parser = match provider {
            ProviderType::Anthropic => BackendParser::Anthropic(AnthropicSseParser::new()),
            ProviderType::OpenAi => BackendParser::OpenAi(OpenAiSseParser::new()),
            ProviderType::Gemini => BackendParser::Gemini(GeminiSseParser::new()),
        };
        Self {
            parser,
            generator: AnthropicSseGenerator::new(original_model),
        }
    }

    /// 处理单个字节块，返回生成的 SSE 字符串
    pub fn process_chunk(&mut self, bytes: &[u8]) -> Vec<String> {
        let events = self.parser.feed(bytes);
        self.generate_sse(&events)
    }

    /// 流结束：冲刷解析器缓冲并强制收尾
    pub fn finish(&mut self) -> Vec<String> {
        let events = self.parser.finish();
        let mut out = self.generate_sse(&events);
        out.extend(self.generator.finalize());
        out
    }

    fn generate_sse(&mut self, events: &[StreamEvent]) -> Vec<String> {
        let mut out = Vec::new();
        for event in events {
            out.extend(self.generator.generate(event));
        }
        out
    }
}

/// 将后端字节流转换为 SSE 字符串流
///
/// 传输层错误（连接中断等）转为流内的完整性错误事件并正常收尾，
/// 客户端永远收到合法的事件序列。
pub fn create_sse_stream<S, E>(
    byte_stream: S,
    mut pipeline: StreamPipeline,
) -> impl Stream<Item = String>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        let mut byte_stream = std::pin::pin!(byte_stream);

        while let Some(result) = byte_stream.next().await {
            match result {
                Ok(bytes) => {
                    for sse in pipeline.process_chunk(&bytes) {
                        yield sse;
                    }
                }
                Err(err) => {
                    tracing::warn!("[STREAM] 后端流中断: {}", err);
                    for sse in pipeline.generate_sse(&[StreamEvent::Error {
                        error_type: "stream_integrity_error".to_string(),
                        message: format!("upstream connection interrupted: {}", err),
                    }]) {
                        yield sse;
                    }
                    break;
                }
            }
        }

        for sse in pipeline.finish() {
            yield sse;
        }
    }
}
