use crate::error::{Result, ViralError};
use crate::metrics::EngagementMetrics;
use crate::source::PostSnapshot;
use crate::tier::{PostTierState, TierUpgrade};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub type DynTierStateStore = Arc<dyn TierStateStore + Send + Sync>;

/// 帖子等级状态存储
///
/// `record_upgrade` 必须是条件写入（仅当存量 `highest_tier < upgrade.to`），
/// 以保证并发评估下 `highest_tier` 不会回退。
#[async_trait]
pub trait TierStateStore {
    async fn load(&self, post_id: &str) -> Result<Option<PostTierState>>;

    /// 所有未停止监控的帖子
    async fn list_active(&self) -> Result<Vec<PostTierState>>;

    /// 新建记录，已存在时返回 false
    async fn insert_new(&self, state: &PostTierState, snapshot: &PostSnapshot, metrics: &EngagementMetrics) -> Result<bool>;

    /// 条件升级，返回是否实际写入
    async fn record_upgrade(&self, upgrade: &TierUpgrade, metrics: &EngagementMetrics) -> Result<bool>;

    async fn mark_stopped(&self, post_id: &str) -> Result<()>;
}

/// 进程内存储，用于单机运行与测试
#[derive(Debug, Default)]
pub struct MemoryTierStateStore {
    posts: RwLock<HashMap<String, PostTierState>>,
}

impl MemoryTierStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Result<Vec<PostTierState>> {
        let posts = self.posts.read().map_err(|_| ViralError::Store("tier state lock poisoned".to_string()))?;
        let mut states: Vec<PostTierState> = posts.values().cloned().collect();
        states.sort_by(|a, b| a.post_id().cmp(b.post_id()));
        Ok(states)
    }
}

#[async_trait]
impl TierStateStore for MemoryTierStateStore {
    async fn load(&self, post_id: &str) -> Result<Option<PostTierState>> {
        let posts = self.posts.read().map_err(|_| ViralError::Store("tier state lock poisoned".to_string()))?;
        Ok(posts.get(post_id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<PostTierState>> {
        Ok(self.snapshot()?.into_iter().filter(|s| !s.monitoring_stopped()).collect())
    }

    async fn insert_new(&self, state: &PostTierState, _snapshot: &PostSnapshot, _metrics: &EngagementMetrics) -> Result<bool> {
        let mut posts = self.posts.write().map_err(|_| ViralError::Store("tier state lock poisoned".to_string()))?;
        if posts.contains_key(state.post_id()) {
            return Ok(false);
        }
        posts.insert(state.post_id().to_string(), state.clone());
        Ok(true)
    }

    async fn record_upgrade(&self, upgrade: &TierUpgrade, _metrics: &EngagementMetrics) -> Result<bool> {
        let mut posts = self.posts.write().map_err(|_| ViralError::Store("tier state lock poisoned".to_string()))?;
        match posts.get_mut(&upgrade.post_id) {
            Some(state) => Ok(state.apply_upgrade(upgrade.to).is_some()),
            None => Err(ViralError::Store(format!("post {} is not tracked", upgrade.post_id))),
        }
    }

    async fn mark_stopped(&self, post_id: &str) -> Result<()> {
        let mut posts = self.posts.write().map_err(|_| ViralError::Store("tier state lock poisoned".to_string()))?;
        if let Some(state) = posts.get_mut(post_id) {
            state.stop_monitoring();
        }
        Ok(())
    }
}
