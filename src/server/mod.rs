//! HTTP 服务层
//!
//! 路由表：
//! - `GET  /`                         健康检查
//! - `POST /v1/messages`              Messages 网关入口
//! - `POST /v1/messages/count_tokens` 本地 token 估算
//!
//! 客户端的 `x-api-key` / `anthropic-version` 头不做校验——
//! 后端凭证由网关自己的配置提供。

pub mod handlers;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::providers;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// 请求体上限（长对话历史可能很大）
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// 共享应用状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    /// 所有后端调用共享的 HTTP 客户端
    pub http: reqwest::Client,
}

/// 构建路由
pub fn build_router(config: Arc<GatewayConfig>) -> Result<Router, GatewayError> {
    let http = providers::build_http_client(&config)?;
    let state = AppState { config, http };

    Ok(Router::new()
        .route("/", get(handlers::health))
        .route("/v1/messages", post(handlers::messages))
        .route("/v1/messages/count_tokens", post(handlers::count_tokens))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state))
}
