//! 使用者列表查询服务
//!
//! 提供 `GET /api/users`：
//! - 每次请求建立一个独立的 PostgreSQL 连接
//! - 读取 users 表全部记录并以 JSON 信封返回
//! - 仅允许配置的前端来源跨域访问

mod handlers;
mod repository;
mod routes;
mod state;

use anyhow::Context;
use common::config::{load_dotenv, AppConfig, LogFormat};
use state::AppState;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SERVICE_NAME: &str = "users-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_path = load_dotenv();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME);

    // 初始化日志追踪
    init_tracing(config.log_format);
    if let Some(path) = &dotenv_path {
        info!(path = %path.display(), "已加载 .env");
    }

    let allowed_origin = config.allowed_origin_header()?;

    // 创建应用状态与路由
    let state = AppState::from_config(&config);
    let app = routes::create_router(state, allowed_origin);

    // 启动服务
    let addr = config.bind_address();
    info!(
        service = %config.service_name,
        address = %addr,
        database = %format!("{}:{}/{}", config.database.host, config.database.port, config.database.dbname),
        allowed_origin = %config.allowed_origin,
        "启动服务"
    );

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务运行失败")?;

    info!(service = %config.service_name, "服务已停止");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "无法监听 Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "无法监听 SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("收到 Ctrl+C，开始优雅停机"),
        _ = terminate => warn!("收到 SIGTERM，开始优雅停机"),
    }
}
