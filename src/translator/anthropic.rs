//! Anthropic 原生后端转换
//!
//! 前后端同协议，转换退化为两件事：模型字段改写为后端实际模型 ID，
//! 以及 tool_result 链接校验。结构化通道后端对悬空的 `tool_use_id`
//! 会以各自的方式失败，网关在边界上统一拒绝。

use crate::correlator::ToolCallCorrelator;
use crate::error::GatewayError;
use crate::models::anthropic::{ContentBlock, MessageContent, MessagesRequest, MessagesResponse};
use crate::router::ModelRoute;
use crate::translator::traits::RequestTranslator;

/// 原生请求转换器
pub struct AnthropicRequestTranslator<'a> {
    route: &'a ModelRoute,
    correlator: &'a ToolCallCorrelator,
}

impl<'a> AnthropicRequestTranslator<'a> {
    pub fn new(route: &'a ModelRoute, correlator: &'a ToolCallCorrelator) -> Self {
        Self { route, correlator }
    }
}

impl RequestTranslator for AnthropicRequestTranslator<'_> {
    type Output = MessagesRequest;

    fn translate_request(&self, request: &MessagesRequest) -> Result<Self::Output, GatewayError> {
        validate_tool_result_links(request, self.correlator)?;

        let mut backend = request.clone();
        backend.model = self.route.backend_model_id.clone();
        Ok(backend)
    }
}

/// 校验所有 tool_result 的 `tool_use_id` 都指向历史中的 tool_use
pub fn validate_tool_result_links(
    request: &MessagesRequest,
    correlator: &ToolCallCorrelator,
) -> Result<(), GatewayError> {
    for message in &request.messages {
        let MessageContent::Blocks(blocks) = &message.content else {
            continue;
        };
        for block in blocks {
            if let ContentBlock::ToolResult { tool_use_id, .. } = block {
                if correlator.lookup(tool_use_id).is_none() {
                    return Err(GatewayError::MalformedRequest(format!(
                        "tool_result references unknown tool_use_id: {}",
                        tool_use_id
                    )));
                }
            }
        }
    }
    Ok(())
}

/// 原生响应处理：只把后端模型 ID 还原为客户端请求的原始模型名
pub fn restore_original_model(mut response: MessagesResponse, route: &ModelRoute) -> MessagesResponse {
    response.model = route.original_model.clone();
    response
}
