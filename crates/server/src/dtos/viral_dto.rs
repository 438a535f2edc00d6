use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;
use viral::metrics::count_from_signed;
use viral::{ApiLimitStatus, EngagementMetrics, PublicMetrics, Tier};

/// 待评估的互动指标
///
/// 速度字段缺省时由计数与帖子年龄推导。
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct EvaluateMetricsRequest {
    pub likes: i64,
    pub retweets: i64,
    #[serde(default)]
    pub replies: i64,
    #[serde(default)]
    pub quotes: i64,
    pub likes_per_hour: Option<f64>,
    pub retweets_per_hour: Option<f64>,
    /// 发布至今的小时数
    pub age_hours: f64,
}

impl EvaluateMetricsRequest {
    /// 负数计数直接报错，不做截断
    pub fn to_metrics(&self) -> viral::Result<EngagementMetrics> {
        let counts = PublicMetrics {
            like_count: count_from_signed("likes", self.likes)?,
            retweet_count: count_from_signed("retweets", self.retweets)?,
            reply_count: count_from_signed("replies", self.replies)?,
            quote_count: count_from_signed("quotes", self.quotes)?,
            ..Default::default()
        };

        let mut metrics = EngagementMetrics::from_counts(&counts, self.age_hours);
        if let Some(rate) = self.likes_per_hour {
            metrics.likes_per_hour = rate;
        }
        if let Some(rate) = self.retweets_per_hour {
            metrics.retweets_per_hour = rate;
        }
        Ok(metrics)
    }
}

/// 评估结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EvaluateMetricsResponse {
    /// 0-3
    pub tier: u8,
    pub tier_name: String,
    pub description: String,
    pub should_stop_monitoring: bool,
    /// 1-100
    pub viral_score: u8,
    pub likes_per_hour: f64,
    pub retweets_per_hour: f64,
}

impl EvaluateMetricsResponse {
    pub fn new(tier: Tier, should_stop_monitoring: bool, viral_score: u8, metrics: &EngagementMetrics) -> Self {
        Self {
            tier: tier.as_u8(),
            tier_name: tier.name().to_string(),
            description: tier.description().to_string(),
            should_stop_monitoring,
            viral_score,
            likes_per_hour: metrics.likes_per_hour,
            retweets_per_hour: metrics.retweets_per_hour,
        }
    }
}

/// 帖子列表查询参数
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ViralPostsQuery {
    /// 最低历史等级（0-3）
    #[validate(range(min = 0, max = 3))]
    pub min_tier: Option<u8>,
    /// 只返回仍在监控中的帖子
    pub active_only: Option<bool>,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<i64>,
}

/// 外部 API 配额状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApiLimitStatusDto {
    pub endpoint: String,
    pub limit: u64,
    pub usage: u64,
    pub usage_percent: f64,
    pub remaining: u64,
    /// Unix 毫秒
    pub reset_at: i64,
}

impl From<ApiLimitStatus> for ApiLimitStatusDto {
    fn from(status: ApiLimitStatus) -> Self {
        Self {
            endpoint: status.endpoint,
            limit: status.limit,
            usage: status.usage,
            usage_percent: status.usage_percent,
            remaining: status.remaining,
            reset_at: status.reset_at.timestamp_millis(),
        }
    }
}

/// 监控概况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ViralStatusResponse {
    pub tracked_posts: u64,
    pub active_posts: u64,
    pub stopped_posts: u64,
    pub api_limits: Vec<ApiLimitStatusDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(likes: i64, age_hours: f64) -> EvaluateMetricsRequest {
        EvaluateMetricsRequest {
            likes,
            retweets: 0,
            replies: 0,
            quotes: 0,
            likes_per_hour: None,
            retweets_per_hour: None,
            age_hours,
        }
    }

    #[test]
    fn test_velocity_derived_when_missing() {
        let metrics = request(3000, 10.0).to_metrics().unwrap();
        assert_eq!(metrics.likes, 3000);
        assert_eq!(metrics.likes_per_hour, 300.0);
    }

    #[test]
    fn test_explicit_velocity_wins() {
        let mut req = request(2500, 20.0);
        req.likes_per_hour = Some(250.0);
        assert_eq!(req.to_metrics().unwrap().likes_per_hour, 250.0);
    }

    #[test]
    fn test_negative_count_rejected() {
        assert!(matches!(
            request(-1, 1.0).to_metrics(),
            Err(viral::ViralError::InvalidMetrics(_))
        ));
    }
}
