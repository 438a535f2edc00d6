use crate::dtos::viral_dto::{
    ApiLimitStatusDto, EvaluateMetricsRequest, EvaluateMetricsResponse, ViralPostsQuery, ViralStatusResponse,
};
use async_trait::async_trait;
use chrono::Utc;
use database::viral_post::{
    model::ViralPost,
    repository::{DynViralPostRepository, ViralPostQuery},
};
use std::sync::Arc;
use utils::{AppError, AppResult};
use viral::{viral_score, SharedApiLimitTracker, Tier, TierClassifier, ViralError};

pub type DynViralService = Arc<dyn ViralServiceTrait + Send + Sync>;

const DEFAULT_LIST_LIMIT: i64 = 100;

#[async_trait]
pub trait ViralServiceTrait {
    async fn evaluate(&self, request: EvaluateMetricsRequest) -> AppResult<EvaluateMetricsResponse>;

    async fn list_posts(&self, query: ViralPostsQuery) -> AppResult<Vec<ViralPost>>;

    async fn status(&self) -> AppResult<ViralStatusResponse>;
}

#[derive(Clone)]
pub struct ViralService {
    repository: DynViralPostRepository,
    classifier: TierClassifier,
    limits: SharedApiLimitTracker,
}

impl ViralService {
    pub fn new(repository: DynViralPostRepository, classifier: TierClassifier, limits: SharedApiLimitTracker) -> Self {
        Self {
            repository,
            classifier,
            limits,
        }
    }
}

fn to_app_error(error: ViralError) -> AppError {
    match error {
        ViralError::InvalidMetrics(_) | ViralError::InvalidTier(_) => AppError::BadRequest(error.to_string()),
        other => AppError::InternalServerErrorWithContext(other.to_string()),
    }
}

#[async_trait]
impl ViralServiceTrait for ViralService {
    async fn evaluate(&self, request: EvaluateMetricsRequest) -> AppResult<EvaluateMetricsResponse> {
        let metrics = request.to_metrics().map_err(to_app_error)?;
        let tier = self.classifier.evaluate_tier(&metrics).map_err(to_app_error)?;
        let stop = self.classifier.should_stop_monitoring(&metrics).map_err(to_app_error)?;

        Ok(EvaluateMetricsResponse::new(tier, stop, viral_score(&metrics), &metrics))
    }

    async fn list_posts(&self, query: ViralPostsQuery) -> AppResult<Vec<ViralPost>> {
        let min_tier = query
            .min_tier
            .map(Tier::try_from)
            .transpose()
            .map_err(to_app_error)?;

        let query = ViralPostQuery {
            min_tier,
            active_only: query.active_only.unwrap_or(false),
            limit: query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
        };
        self.repository.list_posts(&query).await
    }

    async fn status(&self) -> AppResult<ViralStatusResponse> {
        let tracked_posts = self.repository.count_posts(false).await?;
        let active_posts = self.repository.count_posts(true).await?;

        let api_limits = {
            let mut limits = self
                .limits
                .lock()
                .map_err(|_| AppError::InternalServerErrorWithContext("api limit tracker lock poisoned".to_string()))?;
            limits.all_statuses(Utc::now())
        };

        Ok(ViralStatusResponse {
            tracked_posts,
            active_posts,
            stopped_posts: tracked_posts.saturating_sub(active_posts),
            api_limits: api_limits.into_iter().map(ApiLimitStatusDto::from).collect(),
        })
    }
}
