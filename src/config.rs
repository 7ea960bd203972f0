//! 网关配置
//!
//! 启动时从环境变量读取一次，构造不可变配置对象，
//! 之后通过 `Arc<GatewayConfig>` 在所有请求间只读共享。

use crate::router::ProviderType;
use std::time::Duration;

/// 默认监听端口（与原始部署保持一致）
const DEFAULT_PORT: u16 = 8082;

/// 网关配置
///
/// 构造后不再修改。Provider 凭证缺失用 `None` 表示，
/// 由 Model Resolver 在路由时检查。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Anthropic API Key
    pub anthropic_api_key: Option<String>,
    /// OpenAI API Key
    pub openai_api_key: Option<String>,
    /// Gemini API Key
    pub gemini_api_key: Option<String>,
    /// 无法分类的模型名使用的默认 Provider
    pub preferred_provider: ProviderType,
    /// sonnet/opus 系列的映射目标
    pub big_model: String,
    /// haiku 系列的映射目标
    pub small_model: String,
    /// Anthropic API 地址
    pub anthropic_base_url: String,
    /// OpenAI API 地址
    pub openai_base_url: String,
    /// Gemini API 地址
    pub gemini_base_url: String,
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 后端请求超时
    pub request_timeout: Duration,
    /// 后端连接超时
    pub connect_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            openai_api_key: None,
            gemini_api_key: None,
            preferred_provider: ProviderType::OpenAi,
            big_model: "gpt-4o".to_string(),
            small_model: "gpt-4o-mini".to_string(),
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            openai_base_url: "https://api.openai.com".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            request_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl GatewayConfig {
    /// 从环境变量构造配置
    ///
    /// 空字符串的 API Key 视为未配置。
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let preferred_provider = match env_var("PREFERRED_PROVIDER").as_deref() {
            Some("anthropic") => ProviderType::Anthropic,
            Some("gemini") | Some("google") => ProviderType::Gemini,
            Some("openai") | None => ProviderType::OpenAi,
            Some(other) => {
                tracing::warn!(
                    "[CONFIG] 未知的 PREFERRED_PROVIDER={}, 回退到 openai",
                    other
                );
                ProviderType::OpenAi
            }
        };

        Self {
            anthropic_api_key: env_var("ANTHROPIC_API_KEY"),
            openai_api_key: env_var("OPENAI_API_KEY"),
            gemini_api_key: env_var("GEMINI_API_KEY"),
            preferred_provider,
            big_model: env_var("BIG_MODEL").unwrap_or(defaults.big_model),
            small_model: env_var("SMALL_MODEL").unwrap_or(defaults.small_model),
            anthropic_base_url: env_var("ANTHROPIC_BASE_URL").unwrap_or(defaults.anthropic_base_url),
            openai_base_url: env_var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            gemini_base_url: env_var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            host: env_var("HOST").unwrap_or(defaults.host),
            port: env_var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            request_timeout: env_var("REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            connect_timeout: defaults.connect_timeout,
        }
    }

    /// 检查指定 Provider 是否配置了凭证
    pub fn has_credential(&self, provider: ProviderType) -> bool {
        match provider {
            ProviderType::Anthropic => self.anthropic_api_key.is_some(),
            ProviderType::OpenAi => self.openai_api_key.is_some(),
            ProviderType::Gemini => self.gemini_api_key.is_some(),
        }
    }

    /// 获取指定 Provider 的 API Key
    pub fn api_key(&self, provider: ProviderType) -> Option<&str> {
        match provider {
            ProviderType::Anthropic => self.anthropic_api_key.as_deref(),
            ProviderType::OpenAi => self.openai_api_key.as_deref(),
            ProviderType::Gemini => self.gemini_api_key.as_deref(),
        }
    }
}

/// 读取环境变量，空串视为缺失
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.preferred_provider, ProviderType::OpenAi);
        assert_eq!(config.big_model, "gpt-4o");
        assert_eq!(config.small_model, "gpt-4o-mini");
        assert_eq!(config.port, 8082);
        assert!(!config.has_credential(ProviderType::Anthropic));
    }

    #[test]
    fn test_has_credential() {
        let config = GatewayConfig {
            openai_api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert!(config.has_credential(ProviderType::OpenAi));
        assert!(!config.has_credential(ProviderType::Gemini));
        assert_eq!(config.api_key(ProviderType::OpenAi), Some("sk-test"));
    }
}
