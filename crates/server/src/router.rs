use super::services::Services;
use crate::{api, docs, middleware};
use axum::{
    error_handling::HandleErrorLayer,
    http::{Method, StatusCode},
    middleware as axum_middleware,
    response::IntoResponse,
    BoxError, Extension, Json, Router,
};
use lazy_static::lazy_static;
use serde_json::json;
use std::time::Duration;
use tower::{buffer::BufferLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

lazy_static! {
    static ref HTTP_TIMEOUT: u64 = 30;
}

pub struct AppRouter;

impl AppRouter {
    pub fn new(services: Services) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::ACCEPT,
                axum::http::header::USER_AGENT,
            ]);

        Router::new()
            // API 路由
            .nest("/api/v1", api::app())
            .layer(axum_middleware::from_fn(middleware::request_logger))
            .layer(cors)
            .layer(
                ServiceBuilder::new()
                    .layer(Extension(services))
                    .layer(TraceLayer::new_for_http())
                    .layer(HandleErrorLayer::new(Self::handle_timeout_error))
                    .timeout(Duration::from_secs(*HTTP_TIMEOUT))
                    .layer(BufferLayer::new(1024)),
            )
            // Swagger UI 路由 - 包含 OpenAPI JSON 端点
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
            .fallback(Self::handle_404)
    }

    async fn handle_404() -> impl IntoResponse {
        (
            StatusCode::NOT_FOUND,
            Json(json!({
                "errors": {
                    "message": vec![String::from("The requested resource does not exist on this server!")],
                }
            })),
        )
    }

    async fn handle_timeout_error(err: BoxError) -> (StatusCode, Json<serde_json::Value>) {
        if err.is::<tower::timeout::error::Elapsed>() {
            (
                StatusCode::REQUEST_TIMEOUT,
                Json(json!({
                    "errors": {
                        "message": vec![format!(
                            "Request took longer than the configured {} second timeout",
                            *HTTP_TIMEOUT
                        )],
                    }
                })),
            )
        } else {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "errors": {
                        "message": vec![format!("Unhandled internal error: {}", err)],
                    }
                })),
            )
        }
    }
}
