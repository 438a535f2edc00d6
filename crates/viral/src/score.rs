use crate::metrics::EngagementMetrics;

/// 爆款分数（1..=100）
///
/// 以点赞速度为基础，转发/点赞比和回复/点赞比作为放大系数，24 小时内的帖子有新鲜度加成。
pub fn viral_score(metrics: &EngagementMetrics) -> u8 {
    let hours = metrics.age_hours.max(1.0);
    let likes = metrics.likes as f64;
    let like_base = likes.max(1.0);

    let like_velocity = likes / hours;
    let retweet_factor = 1.0 + (metrics.retweets as f64 / like_base) * 0.5;
    let reply_factor = 1.0 + (metrics.replies as f64 / like_base) * 0.3;
    let recency_bonus = (2.0 - hours / 24.0).max(1.0);

    let raw = like_velocity * retweet_factor * reply_factor * recency_bonus / 10.0;
    if !raw.is_finite() {
        return 1;
    }

    raw.round().clamp(1.0, 100.0) as u8
}
