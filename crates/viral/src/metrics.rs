use crate::error::{Result, ViralError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 平台返回的原始互动计数（字段名与 Twitter v2 `public_metrics` 一致）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicMetrics {
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub quote_count: u64,
    #[serde(default)]
    pub impression_count: Option<u64>,
    #[serde(default)]
    pub bookmark_count: Option<u64>,
}

/// 某一时刻的互动快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub quotes: u64,
    /// 每小时点赞数
    pub likes_per_hour: f64,
    /// 每小时转发数
    pub retweets_per_hour: f64,
    /// 发布至今的小时数
    pub age_hours: f64,
    pub impression_count: Option<u64>,
    pub bookmark_count: Option<u64>,
}

impl EngagementMetrics {
    /// 由累计计数和帖子年龄推导速度；不足 1 小时按 1 小时计
    pub fn from_counts(counts: &PublicMetrics, age_hours: f64) -> Self {
        let hours = age_hours.max(1.0);

        Self {
            likes: counts.like_count,
            retweets: counts.retweet_count,
            replies: counts.reply_count,
            quotes: counts.quote_count,
            likes_per_hour: counts.like_count as f64 / hours,
            retweets_per_hour: counts.retweet_count as f64 / hours,
            age_hours,
            impression_count: counts.impression_count,
            bookmark_count: counts.bookmark_count,
        }
    }

    /// 以 `now` 为观测时间构造快照，发布时间晚于 `now` 时年龄记为 0
    pub fn observed(counts: &PublicMetrics, created_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let age_hours = ((now - created_at).num_seconds().max(0) as f64) / 3600.0;
        Self::from_counts(counts, age_hours)
    }

    /// 评估前的输入校验：速度与年龄必须是非负有限数
    pub fn validate(&self) -> Result<()> {
        check_non_negative("likes_per_hour", self.likes_per_hour)?;
        check_non_negative("retweets_per_hour", self.retweets_per_hour)?;
        check_non_negative("age_hours", self.age_hours)?;
        Ok(())
    }

    /// 加权总互动：转发和引用按 2 倍计
    pub fn total_engagement(&self) -> u64 {
        self.likes
            .saturating_add(self.retweets.saturating_mul(2))
            .saturating_add(self.replies)
            .saturating_add(self.quotes.saturating_mul(2))
    }
}

/// 外部有符号输入转换为计数，负数视为非法指标
pub fn count_from_signed(field: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| ViralError::InvalidMetrics(format!("{} must be non-negative, got {}", field, value)))
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(ViralError::InvalidMetrics(format!("{} must be finite, got {}", field, value)));
    }
    if value < 0.0 {
        return Err(ViralError::InvalidMetrics(format!("{} must be non-negative, got {}", field, value)));
    }
    Ok(())
}
