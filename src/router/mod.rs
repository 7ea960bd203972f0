//! 模型路由模块
//!
//! 将客户端请求的模型名解析为具体的后端 Provider 和模型 ID。
//!
//! 解析顺序：
//! 1. 显式前缀（`anthropic/`、`openai/`、`gemini/`）→ 直接路由，凭证缺失则报错
//! 2. 裸模型名 → 先做 BIG_MODEL/SMALL_MODEL 别名替换，再按名称分类
//! 3. 无法分类 → 使用配置的默认 Provider
//!
//! 解析结果 `ModelRoute` 同时保留客户端请求的原始模型名，
//! 工具能力（原生 tool_use / 结构化函数调用 / 文本降级）在解析时
//! 一次性确定，后续转换器只消费能力标志，不再做类型判断。

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use serde::{Deserialize, Serialize};

/// Provider 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Anthropic（原生 Messages 协议）
    Anthropic,
    /// OpenAI 风格（chat completions）
    OpenAi,
    /// Gemini 风格（generateContent）
    Gemini,
}

impl ProviderType {
    /// 协议前缀和日志中使用的名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 工具调用能力
///
/// 每个 Provider 家族结构上支持的工具调用形式，
/// 由 Model Resolver 解析一次，转换器统一消费。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCapability {
    /// 原生 tool_use content block（Anthropic）
    Native,
    /// 结构化函数调用，网关合成 tool_use block（Gemini）
    Structured,
    /// 无结构化通道，工具降级为文本（OpenAI 风格）
    TextOnly,
}

/// 路由结果
///
/// 每个请求创建一次，创建后不再修改。
/// `original_model` 保留客户端请求的完整原始字符串——
/// 能力判断以原始请求为准，映射后的后端 ID 只决定请求发往哪里。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoute {
    /// 去除前缀后的请求模型名
    pub requested_name: String,
    /// 目标 Provider
    pub provider: ProviderType,
    /// 发往后端的模型 ID
    pub backend_model_id: String,
    /// 客户端请求的原始字符串（含前缀）
    pub original_model: String,
    /// 工具调用能力
    pub capability: ToolCapability,
}

impl ModelRoute {
    /// 该路由是否走文本降级路径
    pub fn tools_as_text(&self) -> bool {
        self.capability == ToolCapability::TextOnly
    }
}

/// 模型解析器
///
/// 持有只读配置引用，解析是纯函数：相同的 (模型名, 配置) 总是产生相同的路由。
#[derive(Debug, Clone)]
pub struct ModelResolver<'a> {
    config: &'a GatewayConfig,
}

impl<'a> ModelResolver<'a> {
    pub fn new(config: &'a GatewayConfig) -> Self {
        Self { config }
    }

    /// 解析模型名为路由
    pub fn resolve(&self, model: &str) -> Result<ModelRoute, GatewayError> {
        // 1. 显式前缀路由
        if let Some((provider, bare)) = strip_provider_prefix(model) {
            if !self.config.has_credential(provider) {
                return Err(GatewayError::UnconfiguredProvider(
                    provider.as_str().to_string(),
                ));
            }
            let route = ModelRoute {
                requested_name: bare.to_string(),
                provider,
                backend_model_id: bare.to_string(),
                original_model: model.to_string(),
                capability: capability_of(provider),
            };
            tracing::debug!(
                "[RESOLVER] {} -> {} ({}, explicit prefix)",
                model,
                route.backend_model_id,
                provider
            );
            return Ok(route);
        }

        // 2. 别名替换：小模型走 SMALL_MODEL，大模型走 BIG_MODEL
        let target = if model.contains("haiku") {
            self.config.small_model.as_str()
        } else if model.contains("sonnet") || model.contains("opus") {
            self.config.big_model.as_str()
        } else {
            model
        };

        // 3. 按替换后的目标名分类；无法分类则落到默认 Provider
        let provider = classify_model(target).unwrap_or(self.config.preferred_provider);

        if !self.config.has_credential(provider) {
            return Err(GatewayError::UnconfiguredProvider(
                provider.as_str().to_string(),
            ));
        }

        let route = ModelRoute {
            requested_name: model.to_string(),
            provider,
            backend_model_id: target.to_string(),
            original_model: model.to_string(),
            capability: capability_of(provider),
        };
        tracing::debug!(
            "[RESOLVER] {} -> {} ({}, capability={:?})",
            model,
            route.backend_model_id,
            provider,
            route.capability
        );
        Ok(route)
    }
}

/// 去除显式的 Provider 前缀
fn strip_provider_prefix(model: &str) -> Option<(ProviderType, &str)> {
    if let Some(bare) = model.strip_prefix("anthropic/") {
        Some((ProviderType::Anthropic, bare))
    } else if let Some(bare) = model.strip_prefix("openai/") {
        Some((ProviderType::OpenAi, bare))
    } else if let Some(bare) = model.strip_prefix("gemini/") {
        Some((ProviderType::Gemini, bare))
    } else {
        None
    }
}

/// 按模型名分类 Provider 家族
fn classify_model(model: &str) -> Option<ProviderType> {
    if model.contains("claude") {
        Some(ProviderType::Anthropic)
    } else if model.starts_with("gemini") {
        Some(ProviderType::Gemini)
    } else if model.starts_with("gpt-")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
        || model.starts_with("chatgpt-")
    {
        Some(ProviderType::OpenAi)
    } else {
        None
    }
}

/// Provider 家族的工具调用能力
fn capability_of(provider: ProviderType) -> ToolCapability {
    match provider {
        ProviderType::Anthropic => ToolCapability::Native,
        ProviderType::Gemini => ToolCapability::Structured,
        ProviderType::OpenAi => ToolCapability::TextOnly,
    }
}
