//! 爆款帖子检测：互动指标分级、等级升级、API 配额追踪与周期性互动监控。

pub mod classifier;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod notify;
pub mod rate_limit;
pub mod score;
pub mod source;
pub mod store;
pub mod thresholds;
pub mod tier;
pub mod twitter;

pub use classifier::{evaluate_tier, should_stop_monitoring, TierClassifier};
pub use error::{Result, ViralError};
pub use metrics::{EngagementMetrics, PublicMetrics};
pub use monitor::{CycleReport, EngagementMonitor};
pub use rate_limit::{ApiLimitStatus, ApiLimitTracker, SharedApiLimitTracker};
pub use score::viral_score;
pub use thresholds::{TierRequirement, TierThresholds};
pub use tier::{PostTierState, Tier, TierUpgrade};
