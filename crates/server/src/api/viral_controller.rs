use crate::{
    dtos::viral_dto::{EvaluateMetricsRequest, EvaluateMetricsResponse, ViralPostsQuery, ViralStatusResponse},
    extractors::validation_extractor::{ValidatedQuery, ValidationExtractor},
    services::Services,
};
use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use database::viral_post::model::ViralPost;
use utils::AppResult;

/// 评估互动指标
#[utoipa::path(
    post,
    path = "/api/v1/viral/evaluate",
    tag = "viral",
    request_body = EvaluateMetricsRequest,
    responses(
        (status = 200, description = "等级、停止监控标记与爆款分数", body = EvaluateMetricsResponse),
        (status = 400, description = "指标非法")
    )
)]
pub async fn evaluate(
    Extension(services): Extension<Services>,
    ValidationExtractor(req): ValidationExtractor<EvaluateMetricsRequest>,
) -> AppResult<Json<EvaluateMetricsResponse>> {
    let result = services.viral.evaluate(req).await?;

    Ok(Json(result))
}

/// 已跟踪的爆款帖子
#[utoipa::path(
    get,
    path = "/api/v1/viral/posts",
    tag = "viral",
    params(ViralPostsQuery),
    responses(
        (status = 200, description = "按等级倒序的帖子列表", body = Vec<ViralPost>)
    )
)]
pub async fn list_posts(
    Extension(services): Extension<Services>,
    ValidatedQuery(query): ValidatedQuery<ViralPostsQuery>,
) -> AppResult<Json<Vec<ViralPost>>> {
    let posts = services.viral.list_posts(query).await?;

    Ok(Json(posts))
}

/// 监控概况与 API 配额
#[utoipa::path(
    get,
    path = "/api/v1/viral/status",
    tag = "viral",
    responses(
        (status = 200, description = "监控概况", body = ViralStatusResponse)
    )
)]
pub async fn status(Extension(services): Extension<Services>) -> AppResult<Json<ViralStatusResponse>> {
    let status = services.viral.status().await?;

    Ok(Json(status))
}

pub struct ViralController;
impl ViralController {
    pub fn app() -> Router {
        Router::new()
            .route("/evaluate", post(evaluate))
            .route("/posts", get(list_posts))
            .route("/status", get(status))
    }
}
