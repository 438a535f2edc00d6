use crate::{router::AppRouter, services::Services};
use anyhow::Context;
use axum::serve;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{error, info, warn};
use utils::AppConfig;

pub struct ApplicationServer;

impl ApplicationServer {
    pub async fn serve(config: Arc<AppConfig>, services: Services) -> anyhow::Result<()> {
        // 日志初始化已经在主程序(solspace/src/main.rs)中完成

        let address = format!("{}:{}", config.app_host, config.app_port);
        let tcp_listener = tokio::net::TcpListener::bind(address)
            .await
            .context("🔴 Failed to bind TCP listener")?;

        let local_addr = tcp_listener.local_addr().context("🔴 Failed to get local address")?;

        let router = AppRouter::new(services);

        info!("🟢 server:solspace has launched on {local_addr} 🚀");

        serve(tcp_listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("🔴 Failed to start server")?;

        Ok(())
    }
}

/// 等待 Ctrl+C 或 SIGTERM；信号处理器安装失败时只记录日志并一直等待另一路信号
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("🔴 Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("🔴 Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("❌ Signal received, starting graceful shutdown...");
}
