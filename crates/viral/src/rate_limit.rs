use crate::error::{Result, ViralError};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const TWITTER_ENDPOINT: &str = "twitter";
pub const SEARCH_ENDPOINT: &str = "search";
pub const MINTING_ENDPOINT: &str = "minting";

/// 监控任务与 HTTP 状态接口共享同一份配额
pub type SharedApiLimitTracker = Arc<Mutex<ApiLimitTracker>>;

/// 默认保留 10% 配额作为缓冲
pub const DEFAULT_RATE_LIMIT_BUFFER: f64 = 0.1;

#[derive(Debug, Clone)]
struct ApiLimit {
    limit: u64,
    usage: u64,
    window: Duration,
    reset_at: DateTime<Utc>,
}

impl ApiLimit {
    fn roll_over(&mut self, now: DateTime<Utc>) {
        if now >= self.reset_at {
            self.usage = 0;
            self.reset_at = now + self.window;
        }
    }
}

/// 某个端点的配额状态
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiLimitStatus {
    pub endpoint: String,
    pub limit: u64,
    pub usage: u64,
    pub usage_percent: f64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

/// 外部 API 调用配额追踪
///
/// 所有方法显式接收 `now`，窗口到期时惰性清零。
#[derive(Debug, Clone)]
pub struct ApiLimitTracker {
    limits: HashMap<String, ApiLimit>,
    buffer: f64,
}

impl ApiLimitTracker {
    /// 带默认端点配额：twitter 每 30 天 500000 次，search 与 minting 每天 1000/100 次
    pub fn new(now: DateTime<Utc>) -> Self {
        let mut tracker = Self::empty(DEFAULT_RATE_LIMIT_BUFFER);
        tracker.register(TWITTER_ENDPOINT, 500_000, Duration::days(30), now);
        tracker.register(SEARCH_ENDPOINT, 1_000, Duration::hours(24), now);
        tracker.register(MINTING_ENDPOINT, 100, Duration::hours(24), now);
        tracker
    }

    pub fn empty(buffer: f64) -> Self {
        Self {
            limits: HashMap::new(),
            buffer: buffer.clamp(0.0, 1.0),
        }
    }

    pub fn register(&mut self, endpoint: &str, limit: u64, window: Duration, now: DateTime<Utc>) {
        self.limits.insert(
            endpoint.to_string(),
            ApiLimit {
                limit,
                usage: 0,
                window,
                reset_at: now + window,
            },
        );
    }

    /// 记录调用次数；未注册的端点按每天 1000 次自动注册
    pub fn track_usage(&mut self, endpoint: &str, increment: u64, now: DateTime<Utc>) -> ApiLimitStatus {
        let limit = self.limits.entry(endpoint.to_string()).or_insert_with(|| {
            debug!("registering default limit for endpoint {}", endpoint);
            ApiLimit {
                limit: 1_000,
                usage: 0,
                window: Duration::days(1),
                reset_at: now + Duration::days(1),
            }
        });
        limit.roll_over(now);
        limit.usage = limit.usage.saturating_add(increment);
        Self::to_status(endpoint, limit)
    }

    /// 是否已用尽（扣除缓冲后的）配额；未知端点不受限
    pub fn is_limit_exceeded(&mut self, endpoint: &str, now: DateTime<Utc>) -> bool {
        let buffer = self.buffer;
        match self.limit_mut(endpoint, now) {
            Some(limit) => limit.usage >= Self::effective_limit(limit.limit, buffer),
            None => false,
        }
    }

    /// 一次请求同时占用多个端点的配额；任一端点用尽时都不计数
    pub fn try_acquire_all(&mut self, endpoints: &[&str], increment: u64, now: DateTime<Utc>) -> Result<()> {
        if let Some(exhausted) = endpoints.iter().find(|endpoint| self.is_limit_exceeded(endpoint, now)) {
            warn!("🚦 rate limit reached for endpoint {}", exhausted);
            return Err(ViralError::RateLimited(exhausted.to_string()));
        }
        for endpoint in endpoints {
            self.track_usage(endpoint, increment, now);
        }
        Ok(())
    }

    pub fn status(&mut self, endpoint: &str, now: DateTime<Utc>) -> Option<ApiLimitStatus> {
        self.limit_mut(endpoint, now).map(|limit| Self::to_status(endpoint, limit))
    }

    pub fn all_statuses(&mut self, now: DateTime<Utc>) -> Vec<ApiLimitStatus> {
        let mut endpoints: Vec<String> = self.limits.keys().cloned().collect();
        endpoints.sort();
        endpoints.iter().filter_map(|endpoint| self.status(endpoint, now)).collect()
    }

    pub fn reset(&mut self, endpoint: &str, now: DateTime<Utc>) {
        if let Some(limit) = self.limits.get_mut(endpoint) {
            limit.usage = 0;
            limit.reset_at = now + limit.window;
        }
    }

    fn limit_mut(&mut self, endpoint: &str, now: DateTime<Utc>) -> Option<&mut ApiLimit> {
        let limit = self.limits.get_mut(endpoint)?;
        limit.roll_over(now);
        Some(limit)
    }

    fn effective_limit(limit: u64, buffer: f64) -> u64 {
        ((limit as f64) * (1.0 - buffer)).floor() as u64
    }

    fn to_status(endpoint: &str, limit: &ApiLimit) -> ApiLimitStatus {
        let usage_percent = if limit.limit == 0 {
            100.0
        } else {
            limit.usage as f64 / limit.limit as f64 * 100.0
        };

        ApiLimitStatus {
            endpoint: endpoint.to_string(),
            limit: limit.limit,
            usage: limit.usage,
            usage_percent,
            remaining: limit.limit.saturating_sub(limit.usage),
            reset_at: limit.reset_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let now = Utc::now();
        let mut tracker = ApiLimitTracker::new(now);
        let statuses = tracker.all_statuses(now);
        let names: Vec<&str> = statuses.iter().map(|s| s.endpoint.as_str()).collect();
        assert_eq!(names, vec![MINTING_ENDPOINT, SEARCH_ENDPOINT, TWITTER_ENDPOINT]);
        assert_eq!(tracker.status(TWITTER_ENDPOINT, now).unwrap().limit, 500_000);
    }

    #[test]
    fn test_buffer_applies_before_hard_limit() {
        let now = Utc::now();
        let mut tracker = ApiLimitTracker::empty(0.1);
        tracker.register("lookup", 10, Duration::hours(1), now);

        tracker.track_usage("lookup", 8, now);
        assert!(!tracker.is_limit_exceeded("lookup", now));
        tracker.track_usage("lookup", 1, now);
        assert!(tracker.is_limit_exceeded("lookup", now));

        let status = tracker.status("lookup", now).unwrap();
        assert_eq!(status.remaining, 1);
        assert!((status.usage_percent - 90.0).abs() < 1e-9);
        assert!(matches!(tracker.try_acquire_all(&["lookup"], 1, now), Err(ViralError::RateLimited(_))));
    }

    #[test]
    fn test_exhausted_endpoint_charges_nothing() {
        let now = Utc::now();
        let mut tracker = ApiLimitTracker::new(now);
        tracker.track_usage(SEARCH_ENDPOINT, 1_000, now);

        let result = tracker.try_acquire_all(&[TWITTER_ENDPOINT, SEARCH_ENDPOINT], 1, now);
        assert!(matches!(result, Err(ViralError::RateLimited(ref e)) if e == SEARCH_ENDPOINT));
        assert_eq!(tracker.status(TWITTER_ENDPOINT, now).unwrap().usage, 0);
        assert_eq!(tracker.status(SEARCH_ENDPOINT, now).unwrap().usage, 1_000);

        tracker.reset(SEARCH_ENDPOINT, now);
        tracker.try_acquire_all(&[TWITTER_ENDPOINT, SEARCH_ENDPOINT], 1, now).unwrap();
        assert_eq!(tracker.status(TWITTER_ENDPOINT, now).unwrap().usage, 1);
        assert_eq!(tracker.status(SEARCH_ENDPOINT, now).unwrap().usage, 1);
    }

    #[test]
    fn test_window_rolls_over() {
        let now = Utc::now();
        let mut tracker = ApiLimitTracker::empty(0.0);
        tracker.register("lookup", 2, Duration::minutes(15), now);
        tracker.track_usage("lookup", 2, now);
        assert!(tracker.is_limit_exceeded("lookup", now));

        let later = now + Duration::minutes(15);
        assert!(!tracker.is_limit_exceeded("lookup", later));
        let status = tracker.status("lookup", later).unwrap();
        assert_eq!(status.usage, 0);
        assert_eq!(status.reset_at, later + Duration::minutes(15));
    }

    #[test]
    fn test_unknown_endpoint_gets_default_limit() {
        let now = Utc::now();
        let mut tracker = ApiLimitTracker::empty(0.0);
        assert!(!tracker.is_limit_exceeded("mentions", now));
        let status = tracker.track_usage("mentions", 3, now);
        assert_eq!(status.limit, 1_000);
        assert_eq!(status.usage, 3);
    }

    #[test]
    fn test_reset() {
        let now = Utc::now();
        let mut tracker = ApiLimitTracker::new(now);
        tracker.track_usage(MINTING_ENDPOINT, 100, now);
        assert!(tracker.is_limit_exceeded(MINTING_ENDPOINT, now));
        tracker.reset(MINTING_ENDPOINT, now);
        assert!(!tracker.is_limit_exceeded(MINTING_ENDPOINT, now));
    }
}
