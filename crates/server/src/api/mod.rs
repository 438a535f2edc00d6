pub mod claim_controller;
pub mod viral_controller;

use axum::routing::{get, Router};

/// 系统健康检查
///
/// 返回服务器运行状态
#[utoipa::path(
    get,
    path = "/api/v1/",
    responses(
        (status = 200, description = "服务器运行正常", body = String)
    ),
    tag = "系统状态"
)]
pub async fn health() -> &'static str {
    "Server is running! 🚀"
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(health))
        .nest("/nft", claim_controller::ClaimController::app())
        .nest("/viral", viral_controller::ViralController::app())
}
