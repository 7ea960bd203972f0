//! proxymux 入口
//!
//! 初始化日志、加载配置、启动 axum 服务器。

use anyhow::Context;
use proxymux::config::GatewayConfig;
use proxymux::server;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proxymux=info,tower_http=warn".into()),
        )
        .init();

    let config = Arc::new(GatewayConfig::from_env());
    tracing::info!(
        "[STARTUP] anthropic={} openai={} gemini={} preferred={} big={} small={}",
        config.anthropic_api_key.is_some(),
        config.openai_api_key.is_some(),
        config.gemini_api_key.is_some(),
        config.preferred_provider.as_str(),
        config.big_model,
        config.small_model,
    );

    let addr = format!("{}:{}", config.host, config.port);
    let app = server::build_router(config)?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("[STARTUP] listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
