// Timer: 按 cron 表达式周期执行互动监控
// - 发现新的爆款帖子，并对已跟踪帖子做升级检查
use anyhow::Context;
use chrono::Utc;
use cron::Schedule;
use std::{str::FromStr, sync::Arc, time::Duration};
use tokio::time::sleep_until;
use tracing::{error, info};
use viral::{CycleReport, EngagementMonitor};

/// 默认每 15 分钟执行一次
pub const DEFAULT_MONITOR_CRON: &str = "0 */15 * * * *";

#[derive(Clone)]
pub struct Timer {
    pub time: String,
    monitor: Arc<EngagementMonitor>,
}

impl Timer {
    // "0 */15 * * * *": 每 15 分钟的第 0 秒执行
    pub fn new(time: Option<String>, monitor: Arc<EngagementMonitor>) -> Self {
        Timer {
            time: time.unwrap_or_else(|| DEFAULT_MONITOR_CRON.to_string()),
            monitor,
        }
    }

    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let schedule = Schedule::from_str(&self.time).with_context(|| format!("🔴 Invalid cron expression: {}", self.time))?;
        info!("⏳ Timer action on schedule `{}`.", self.time);

        loop {
            let now = Utc::now();
            let Some(next_run_time) = schedule.upcoming(Utc).next() else {
                info!("⏹️ schedule `{}` has no upcoming run, timer stopped", self.time);
                return Ok(());
            };

            let duration_until_next_run = (next_run_time - now).to_std().unwrap_or(Duration::from_secs(0));

            sleep_until(tokio::time::Instant::now() + duration_until_next_run).await;

            if let Err(e) = self.run_once().await {
                error!("❌ engagement cycle failed: {:#}", e);
            }
        }
    }

    /// 立即执行一轮监控
    pub async fn run_once(&self) -> anyhow::Result<CycleReport> {
        let report = self
            .monitor
            .run_cycle(Utc::now())
            .await
            .context("engagement monitor cycle")?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use viral::notify::{DynUpgradeNotifier, LogNotifier};
    use viral::source::{DynMetricsSource, MetricsSource, PostSnapshot};
    use viral::store::MemoryTierStateStore;
    use viral::{PublicMetrics, Tier, TierClassifier};

    struct OnePostSource;

    #[async_trait]
    impl MetricsSource for OnePostSource {
        async fn search_candidates(&self) -> viral::Result<Vec<PostSnapshot>> {
            Ok(vec![PostSnapshot {
                post_id: "42".to_string(),
                author_id: None,
                author_handle: Some("@alice".to_string()),
                content: "gm".to_string(),
                created_at: Utc::now() - ChronoDuration::hours(10),
                counts: PublicMetrics {
                    like_count: 6000,
                    ..Default::default()
                },
            }])
        }

        async fn lookup(&self, _post_ids: &[String]) -> viral::Result<Vec<PostSnapshot>> {
            Ok(Vec::new())
        }
    }

    fn timer(time: Option<String>, store: Arc<MemoryTierStateStore>) -> Timer {
        let source: DynMetricsSource = Arc::new(OnePostSource);
        let notifier: DynUpgradeNotifier = Arc::new(LogNotifier::new("http://localhost:3000"));
        let monitor = EngagementMonitor::new(TierClassifier::default(), source, store, notifier);
        Timer::new(time, Arc::new(monitor))
    }

    #[test]
    fn test_default_schedule() {
        let timer = timer(None, Arc::new(MemoryTierStateStore::new()));
        assert_eq!(timer.time, DEFAULT_MONITOR_CRON);
        assert!(Schedule::from_str(DEFAULT_MONITOR_CRON).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_cron_is_error() {
        let timer = Arc::new(timer(Some("every now and then".to_string()), Arc::new(MemoryTierStateStore::new())));
        assert!(timer.run().await.is_err());
    }

    #[tokio::test]
    async fn test_run_once_tracks_new_posts() {
        let store = Arc::new(MemoryTierStateStore::new());
        let timer = timer(None, store.clone());

        let report = timer.run_once().await.unwrap();
        assert_eq!(report.discovered, 1);

        let states = store.snapshot().unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].highest_tier(), Tier::Viral);
    }
}
