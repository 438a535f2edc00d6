use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{info, warn};

/// 请求日志中间件
/// 记录每个请求的来源 IP、方法、路径、状态码与耗时；没有连接信息时（如测试）IP 记为 unknown
pub async fn request_logger(connect_info: Option<ConnectInfo<SocketAddr>>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    if status.is_server_error() {
        warn!("⚠️ {} | {} {} | {} | {:.2}ms", client_ip, method, path, status.as_u16(), elapsed_ms);
    } else {
        info!("📍 {} | {} {} | {} | {:.2}ms", client_ip, method, path, status.as_u16(), elapsed_ms);
    }

    response
}
