use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use viral::{viral_score, EngagementMetrics, PostTierState, Tier};
use viral::source::PostSnapshot;

/// 被跟踪的爆款帖子
///
/// 等级以整数存储（0-3），时间均为 Unix 毫秒。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ViralPost {
    /// 平台帖子 ID
    pub post_id: String,
    pub author_id: Option<String>,
    /// 作者用户名（带 @）
    pub author_handle: Option<String>,
    pub content: String,
    pub current_tier: i32,
    /// 历史最高等级，只增不减
    pub highest_tier: i32,
    pub monitoring_active: bool,
    pub likes: i64,
    pub retweets: i64,
    pub replies: i64,
    pub quotes: i64,
    pub likes_per_hour: f64,
    pub retweets_per_hour: f64,
    /// 1-100
    pub viral_score: i32,
    pub post_created_at: i64,
    pub first_detected_at: i64,
    pub last_checked_at: i64,
    pub last_upgraded_at: Option<i64>,
}

pub(crate) fn count_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl ViralPost {
    pub fn new(state: &PostTierState, snapshot: &PostSnapshot, metrics: &EngagementMetrics, now_ms: i64) -> Self {
        Self {
            post_id: state.post_id().to_string(),
            author_id: snapshot.author_id.clone(),
            author_handle: snapshot.author_handle.clone(),
            content: snapshot.content.clone(),
            current_tier: i32::from(state.current_tier().as_u8()),
            highest_tier: i32::from(state.highest_tier().as_u8()),
            monitoring_active: !state.monitoring_stopped(),
            likes: count_to_i64(metrics.likes),
            retweets: count_to_i64(metrics.retweets),
            replies: count_to_i64(metrics.replies),
            quotes: count_to_i64(metrics.quotes),
            likes_per_hour: metrics.likes_per_hour,
            retweets_per_hour: metrics.retweets_per_hour,
            viral_score: i32::from(viral_score(metrics)),
            post_created_at: snapshot.created_at.timestamp_millis(),
            first_detected_at: now_ms,
            last_checked_at: now_ms,
            last_upgraded_at: None,
        }
    }

    pub fn highest_tier(&self) -> viral::Result<Tier> {
        Tier::try_from(i64::from(self.highest_tier))
    }

    /// 还原为领域状态，持久化数据不满足不变量时报错
    pub fn tier_state(&self) -> viral::Result<PostTierState> {
        PostTierState::from_parts(
            self.post_id.clone(),
            Tier::try_from(i64::from(self.current_tier))?,
            self.highest_tier()?,
            !self.monitoring_active,
        )
    }
}
