use crate::error::Result;
use crate::metrics::EngagementMetrics;
use crate::thresholds::{TierRequirement, TierThresholds};
use crate::tier::{PostTierState, Tier, TierUpgrade};

/// 计算满足条件的最高等级，阈值比较均为包含（`>=`）
pub fn evaluate_tier(metrics: &EngagementMetrics, thresholds: &TierThresholds) -> Result<Tier> {
    metrics.validate()?;

    let tier = Tier::RANKED
        .into_iter()
        .find(|tier| {
            thresholds
                .requirement(*tier)
                .map(|req| meets(metrics, req))
                .unwrap_or(false)
        })
        .unwrap_or(Tier::None);

    Ok(tier)
}

/// 帖子年龄超过 `age_hours_max` 后停止监控
pub fn should_stop_monitoring(metrics: &EngagementMetrics, thresholds: &TierThresholds) -> Result<bool> {
    metrics.validate()?;
    Ok(metrics.age_hours > thresholds.age_hours_max)
}

fn meets(metrics: &EngagementMetrics, req: &TierRequirement) -> bool {
    let absolute = metrics.likes >= req.min_likes
        && req.min_retweets.map_or(true, |min| metrics.retweets >= min)
        && req.min_replies.map_or(true, |min| metrics.replies >= min);

    let velocity = metrics.likes_per_hour >= req.likes_per_hour
        && req.retweets_per_hour.map_or(true, |min| metrics.retweets_per_hour >= min);

    absolute && velocity
}

/// 持有只读阈值的分级器
#[derive(Debug, Clone, Default)]
pub struct TierClassifier {
    thresholds: TierThresholds,
}

impl TierClassifier {
    pub fn new(thresholds: TierThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &TierThresholds {
        &self.thresholds
    }

    pub fn evaluate_tier(&self, metrics: &EngagementMetrics) -> Result<Tier> {
        evaluate_tier(metrics, &self.thresholds)
    }

    pub fn should_stop_monitoring(&self, metrics: &EngagementMetrics) -> Result<bool> {
        should_stop_monitoring(metrics, &self.thresholds)
    }

    /// 对已跟踪帖子做一次升级检查：超龄则停止监控，否则按最新指标尝试升级
    pub fn check_upgrade(&self, state: &mut PostTierState, metrics: &EngagementMetrics) -> Result<Option<TierUpgrade>> {
        if state.monitoring_stopped() {
            return Ok(None);
        }
        if self.should_stop_monitoring(metrics)? {
            state.stop_monitoring();
            return Ok(None);
        }

        let tier = self.evaluate_tier(metrics)?;
        Ok(state.apply_upgrade(tier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViralError;

    fn metrics(likes: u64, likes_per_hour: f64) -> EngagementMetrics {
        EngagementMetrics {
            likes,
            likes_per_hour,
            age_hours: 2.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_trending_at_exact_threshold() {
        let t = TierThresholds::default();
        assert_eq!(evaluate_tier(&metrics(2500, 250.0), &t).unwrap(), Tier::Trending);
    }

    #[test]
    fn test_velocity_just_below_rising_is_none() {
        let t = TierThresholds::default();
        assert_eq!(evaluate_tier(&metrics(1000, 99.0), &t).unwrap(), Tier::None);
    }

    #[test]
    fn test_inclusive_boundaries_for_every_tier() {
        let t = TierThresholds::default();
        for tier in Tier::RANKED {
            let req = t.requirement(tier).unwrap();
            let m = metrics(req.min_likes, req.likes_per_hour);
            assert_eq!(evaluate_tier(&m, &t).unwrap(), tier);
        }
    }

    #[test]
    fn test_viral_whenever_viral_minimums_hold() {
        let t = TierThresholds::default();
        for (likes, rate) in [(5000, 500.0), (5001, 10_000.0), (1_000_000, 500.0), (u64::MAX, f64::MAX)] {
            assert_eq!(evaluate_tier(&metrics(likes, rate), &t).unwrap(), Tier::Viral);
        }
    }

    #[test]
    fn test_below_every_tier_is_none() {
        let t = TierThresholds::default();
        for (likes, rate) in [(0, 0.0), (999, 10_000.0), (100_000, 99.999), (999, 99.0)] {
            assert_eq!(evaluate_tier(&metrics(likes, rate), &t).unwrap(), Tier::None);
        }
    }

    #[test]
    fn test_both_absolute_and_velocity_required() {
        let t = TierThresholds::default();
        // 点赞数达到 Viral 但速度只够 Rising
        assert_eq!(evaluate_tier(&metrics(6000, 120.0), &t).unwrap(), Tier::Rising);
        // 速度达到 Viral 但点赞数只够 Trending
        assert_eq!(evaluate_tier(&metrics(3000, 900.0), &t).unwrap(), Tier::Trending);
    }

    #[test]
    fn test_optional_secondary_gates() {
        let mut t = TierThresholds::default();
        t.viral.min_retweets = Some(1000);
        t.viral.retweets_per_hour = Some(100.0);

        let mut m = metrics(5000, 500.0);
        m.retweets = 999;
        m.retweets_per_hour = 150.0;
        assert_eq!(evaluate_tier(&m, &t).unwrap(), Tier::Trending);

        m.retweets = 1000;
        assert_eq!(evaluate_tier(&m, &t).unwrap(), Tier::Viral);

        m.retweets_per_hour = 99.0;
        assert_eq!(evaluate_tier(&m, &t).unwrap(), Tier::Trending);
    }

    #[test]
    fn test_invalid_metrics_rejected() {
        let t = TierThresholds::default();
        let m = metrics(5000, f64::NAN);
        assert!(matches!(evaluate_tier(&m, &t), Err(ViralError::InvalidMetrics(_))));
        assert!(matches!(should_stop_monitoring(&m, &t), Err(ViralError::InvalidMetrics(_))));
    }

    #[test]
    fn test_stop_monitoring_is_monotonic_in_age() {
        let t = TierThresholds::default();
        let at = |age: f64| EngagementMetrics { age_hours: age, ..Default::default() };

        assert!(!should_stop_monitoring(&at(48.0), &t).unwrap());
        let mut stopped_once = false;
        for age in [0.0, 12.0, 47.9, 48.0, 48.01, 60.0, 1000.0] {
            let stop = should_stop_monitoring(&at(age), &t).unwrap();
            assert!(!stopped_once || stop, "stop flipped back at age {}", age);
            stopped_once |= stop;
        }
        assert!(stopped_once);
    }

    #[test]
    fn test_check_upgrade_flow() {
        let classifier = TierClassifier::default();
        let mut state = PostTierState::new("p1", Tier::Rising);

        let upgrade = classifier.check_upgrade(&mut state, &metrics(2600, 300.0)).unwrap();
        assert_eq!(upgrade.map(|u| (u.from, u.to)), Some((Tier::Rising, Tier::Trending)));

        // 指标回落不会降级
        assert!(classifier.check_upgrade(&mut state, &metrics(10, 1.0)).unwrap().is_none());
        assert_eq!(state.highest_tier(), Tier::Trending);

        // 超龄：停止监控，之后即使满足 Viral 也不再升级
        let old = EngagementMetrics { age_hours: 49.0, ..metrics(9000, 900.0) };
        assert!(classifier.check_upgrade(&mut state, &old).unwrap().is_none());
        assert!(state.monitoring_stopped());
        assert!(classifier.check_upgrade(&mut state, &metrics(9000, 900.0)).unwrap().is_none());
        assert_eq!(state.highest_tier(), Tier::Trending);
    }
}
