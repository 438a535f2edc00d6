use crate::classifier::TierClassifier;
use crate::error::Result;
use crate::notify::DynUpgradeNotifier;
use crate::source::{DynMetricsSource, PostSnapshot};
use crate::store::DynTierStateStore;
use crate::tier::{PostTierState, Tier};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// 单轮监控结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// 新发现并开始跟踪的帖子数
    pub discovered: usize,
    /// 拿到最新指标并完成检查的帖子数
    pub checked: usize,
    pub upgraded: usize,
    /// 停止监控的帖子数（超龄或已达最高等级）
    pub stopped: usize,
    /// 本轮没有拿到指标或处理出错的帖子数
    pub skipped: usize,
}

/// 互动监控：发现新的爆款帖子，并对已跟踪帖子做升级检查
pub struct EngagementMonitor {
    classifier: TierClassifier,
    source: DynMetricsSource,
    store: DynTierStateStore,
    notifier: DynUpgradeNotifier,
}

impl EngagementMonitor {
    pub fn new(
        classifier: TierClassifier,
        source: DynMetricsSource,
        store: DynTierStateStore,
        notifier: DynUpgradeNotifier,
    ) -> Self {
        Self {
            classifier,
            source,
            store,
            notifier,
        }
    }

    pub fn classifier(&self) -> &TierClassifier {
        &self.classifier
    }

    /// 执行一轮监控。单个帖子的错误只记录日志，不中断本轮。
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        self.discover(now, &mut report).await;
        self.check_tracked(now, &mut report).await?;

        info!(
            "🔁 engagement cycle done: discovered={} checked={} upgraded={} stopped={} skipped={}",
            report.discovered, report.checked, report.upgraded, report.stopped, report.skipped
        );
        Ok(report)
    }

    async fn discover(&self, now: DateTime<Utc>, report: &mut CycleReport) {
        let candidates = match self.source.search_candidates().await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("⚠️ candidate search failed, skipping discovery: {}", e);
                return;
            }
        };

        for post in candidates {
            match self.track_candidate(&post, now).await {
                Ok(true) => report.discovered += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(post_id = %post.post_id, "❌ failed to track candidate: {}", e);
                    report.skipped += 1;
                }
            }
        }
    }

    async fn track_candidate(&self, post: &PostSnapshot, now: DateTime<Utc>) -> Result<bool> {
        let metrics = post.metrics_at(now);
        if self.classifier.should_stop_monitoring(&metrics)? {
            return Ok(false);
        }

        let tier = self.classifier.evaluate_tier(&metrics)?;
        if tier == Tier::None {
            return Ok(false);
        }

        // 首次发现即为最高等级的帖子无需后续升级检查
        let mut state = PostTierState::new(post.post_id.clone(), tier);
        if tier.is_max() {
            state.stop_monitoring();
        }
        if !self.store.insert_new(&state, post, &metrics).await? {
            debug!(post_id = %post.post_id, "already tracked");
            return Ok(false);
        }

        info!(post_id = %post.post_id, "✨ new {} post detected", tier.name());
        if let Err(e) = self.notifier.notify_new_viral(post, tier).await {
            warn!(post_id = %post.post_id, "⚠️ notification failed: {}", e);
        }
        Ok(true)
    }

    async fn check_tracked(&self, now: DateTime<Utc>, report: &mut CycleReport) -> Result<()> {
        // 已是最高等级的帖子不再查询，直接停止监控
        let (maxed, tracked): (Vec<PostTierState>, Vec<PostTierState>) = self
            .store
            .list_active()
            .await?
            .into_iter()
            .partition(|state| state.highest_tier().is_max());

        for state in maxed {
            match self.store.mark_stopped(state.post_id()).await {
                Ok(()) => report.stopped += 1,
                Err(e) => {
                    error!(post_id = %state.post_id(), "❌ failed to stop maxed post: {}", e);
                    report.skipped += 1;
                }
            }
        }

        if tracked.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = tracked.iter().map(|s| s.post_id().to_string()).collect();
        let fresh: HashMap<String, PostSnapshot> = match self.source.lookup(&ids).await {
            Ok(posts) => posts.into_iter().map(|p| (p.post_id.clone(), p)).collect(),
            Err(e) => {
                warn!("⚠️ metrics lookup failed, skipping {} tracked posts: {}", ids.len(), e);
                report.skipped += ids.len();
                return Ok(());
            }
        };

        for mut state in tracked {
            let Some(post) = fresh.get(state.post_id()) else {
                report.skipped += 1;
                continue;
            };

            match self.check_one(&mut state, post, now, report).await {
                Ok(()) => report.checked += 1,
                Err(e) => {
                    error!(post_id = %state.post_id(), "❌ upgrade check failed: {}", e);
                    report.skipped += 1;
                }
            }
        }

        Ok(())
    }

    async fn check_one(
        &self,
        state: &mut PostTierState,
        post: &PostSnapshot,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Result<()> {
        let metrics = post.metrics_at(now);

        let Some(upgrade) = self.classifier.check_upgrade(state, &metrics)? else {
            if state.monitoring_stopped() {
                self.store.mark_stopped(state.post_id()).await?;
                info!(post_id = %state.post_id(), "⏹️ post aged out, monitoring stopped");
                report.stopped += 1;
            }
            return Ok(());
        };

        if !self.store.record_upgrade(&upgrade, &metrics).await? {
            // 其他写入者已升级到同级或更高
            debug!(post_id = %upgrade.post_id, "upgrade already applied elsewhere");
            return Ok(());
        }

        report.upgraded += 1;
        if let Err(e) = self.notifier.notify_tier_upgrade(&upgrade).await {
            warn!(post_id = %upgrade.post_id, "⚠️ notification failed: {}", e);
        }

        if upgrade.to.is_max() {
            state.stop_monitoring();
            self.store.mark_stopped(state.post_id()).await?;
            info!(post_id = %state.post_id(), "🏁 reached top tier, monitoring stopped");
            report.stopped += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViralError;
    use crate::metrics::PublicMetrics;
    use crate::notify::UpgradeNotifier;
    use crate::source::MetricsSource;
    use crate::store::{MemoryTierStateStore, TierStateStore};
    use crate::tier::TierUpgrade;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeSource {
        candidates: Mutex<Vec<PostSnapshot>>,
        latest: Mutex<HashMap<String, PostSnapshot>>,
        fail_lookup: bool,
    }

    #[async_trait]
    impl MetricsSource for FakeSource {
        async fn search_candidates(&self) -> Result<Vec<PostSnapshot>> {
            Ok(std::mem::take(&mut *self.candidates.lock().unwrap()))
        }

        async fn lookup(&self, post_ids: &[String]) -> Result<Vec<PostSnapshot>> {
            if self.fail_lookup {
                return Err(ViralError::RateLimited("twitter".to_string()));
            }
            let latest = self.latest.lock().unwrap();
            Ok(post_ids.iter().filter_map(|id| latest.get(id).cloned()).collect())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        new_posts: Mutex<Vec<(String, Tier)>>,
        upgrades: Mutex<Vec<TierUpgrade>>,
    }

    #[async_trait]
    impl UpgradeNotifier for RecordingNotifier {
        async fn notify_new_viral(&self, post: &PostSnapshot, tier: Tier) -> Result<()> {
            self.new_posts.lock().unwrap().push((post.post_id.clone(), tier));
            Ok(())
        }

        async fn notify_tier_upgrade(&self, upgrade: &TierUpgrade) -> Result<()> {
            self.upgrades.lock().unwrap().push(upgrade.clone());
            Ok(())
        }
    }

    fn post(id: &str, likes: u64, hours_old: i64, now: DateTime<Utc>) -> PostSnapshot {
        PostSnapshot {
            post_id: id.to_string(),
            author_id: Some("author".to_string()),
            author_handle: Some("@author".to_string()),
            content: "gm".to_string(),
            created_at: now - Duration::hours(hours_old),
            counts: PublicMetrics {
                like_count: likes,
                ..Default::default()
            },
        }
    }

    fn monitor(
        source: Arc<FakeSource>,
        store: Arc<MemoryTierStateStore>,
        notifier: Arc<RecordingNotifier>,
    ) -> EngagementMonitor {
        EngagementMonitor::new(TierClassifier::default(), source, store, notifier)
    }

    #[tokio::test]
    async fn test_discovery_tracks_only_qualifying_posts() {
        let now = Utc::now();
        let source = Arc::new(FakeSource::default());
        // 2h 1200 赞 => 600/h，满足 Rising；2h 400 赞不满足；60h 的帖子超龄
        *source.candidates.lock().unwrap() = vec![
            post("a", 1200, 2, now),
            post("b", 400, 2, now),
            post("c", 90_000, 60, now),
        ];
        let store = Arc::new(MemoryTierStateStore::new());
        let notifier = Arc::new(RecordingNotifier::default());

        let report = monitor(source, store.clone(), notifier.clone()).run_cycle(now).await.unwrap();

        assert_eq!(report.discovered, 1);
        let states = store.snapshot().unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].post_id(), "a");
        assert_eq!(states[0].highest_tier(), Tier::Rising);
        assert_eq!(*notifier.new_posts.lock().unwrap(), vec![("a".to_string(), Tier::Rising)]);
    }

    #[tokio::test]
    async fn test_tracked_post_upgrades_and_notifies() {
        let now = Utc::now();
        let store = Arc::new(MemoryTierStateStore::new());
        let initial = post("a", 1200, 2, now);
        store
            .insert_new(&PostTierState::new("a", Tier::Rising), &initial, &initial.metrics_at(now))
            .await
            .unwrap();

        let source = Arc::new(FakeSource::default());
        // 3h 3000 赞 => 1000/h，满足 Trending（Viral 需要 5000 赞）
        source.latest.lock().unwrap().insert("a".to_string(), post("a", 3000, 3, now));
        let notifier = Arc::new(RecordingNotifier::default());

        let report = monitor(source, store.clone(), notifier.clone()).run_cycle(now).await.unwrap();

        assert_eq!(report.checked, 1);
        assert_eq!(report.upgraded, 1);
        assert_eq!(store.load("a").await.unwrap().unwrap().highest_tier(), Tier::Trending);
        let upgrades = notifier.upgrades.lock().unwrap();
        assert_eq!(upgrades.len(), 1);
        assert_eq!((upgrades[0].from, upgrades[0].to), (Tier::Rising, Tier::Trending));
    }

    #[tokio::test]
    async fn test_aged_out_post_is_stopped_and_missing_metrics_skipped() {
        let now = Utc::now();
        let store = Arc::new(MemoryTierStateStore::new());
        for id in ["old", "quiet"] {
            let p = post(id, 1200, 2, now);
            store.insert_new(&PostTierState::new(id, Tier::Rising), &p, &p.metrics_at(now)).await.unwrap();
        }

        let source = Arc::new(FakeSource::default());
        source.latest.lock().unwrap().insert("old".to_string(), post("old", 100_000, 50, now));
        let notifier = Arc::new(RecordingNotifier::default());

        let report = monitor(source, store.clone(), notifier.clone()).run_cycle(now).await.unwrap();

        assert_eq!(report.stopped, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.upgraded, 0);
        let old = store.load("old").await.unwrap().unwrap();
        assert!(old.monitoring_stopped());
        assert_eq!(old.highest_tier(), Tier::Rising);
        assert_eq!(store.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_skips_cycle_without_error() {
        let now = Utc::now();
        let store = Arc::new(MemoryTierStateStore::new());
        let p = post("a", 1200, 2, now);
        store.insert_new(&PostTierState::new("a", Tier::Rising), &p, &p.metrics_at(now)).await.unwrap();

        let source = Arc::new(FakeSource {
            fail_lookup: true,
            ..Default::default()
        });
        let report = monitor(source, store, Arc::new(RecordingNotifier::default()))
            .run_cycle(now)
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.checked, 0);
    }

    #[tokio::test]
    async fn test_viral_posts_are_stopped_without_lookup() {
        let now = Utc::now();
        let store = Arc::new(MemoryTierStateStore::new());
        let p = post("top", 9000, 2, now);
        store.insert_new(&PostTierState::new("top", Tier::Viral), &p, &p.metrics_at(now)).await.unwrap();

        let source = Arc::new(FakeSource {
            fail_lookup: true,
            ..Default::default()
        });
        let report = monitor(source, store.clone(), Arc::new(RecordingNotifier::default()))
            .run_cycle(now)
            .await
            .unwrap();

        assert_eq!(report, CycleReport { stopped: 1, ..Default::default() });
        assert!(store.list_active().await.unwrap().is_empty());
        assert_eq!(store.load("top").await.unwrap().unwrap().highest_tier(), Tier::Viral);
    }

    #[tokio::test]
    async fn test_reaching_viral_leaves_active_set() {
        let now = Utc::now();
        let store = Arc::new(MemoryTierStateStore::new());
        let initial = post("a", 1200, 2, now);
        store
            .insert_new(&PostTierState::new("a", Tier::Rising), &initial, &initial.metrics_at(now))
            .await
            .unwrap();

        let source = Arc::new(FakeSource::default());
        // 2h 9000 赞 => 4500/h，满足 Viral；另一个新帖子首次发现即为 Viral
        source.latest.lock().unwrap().insert("a".to_string(), post("a", 9000, 2, now));
        *source.candidates.lock().unwrap() = vec![post("b", 8000, 1, now)];
        let notifier = Arc::new(RecordingNotifier::default());

        let report = monitor(source, store.clone(), notifier.clone()).run_cycle(now).await.unwrap();

        assert_eq!(report.discovered, 1);
        assert_eq!(report.upgraded, 1);
        assert_eq!(report.stopped, 1);
        assert!(store.list_active().await.unwrap().is_empty());
        for id in ["a", "b"] {
            let state = store.load(id).await.unwrap().unwrap();
            assert_eq!(state.highest_tier(), Tier::Viral);
            assert!(state.monitoring_stopped());
        }
        assert_eq!(notifier.upgrades.lock().unwrap().len(), 1);
    }
}
