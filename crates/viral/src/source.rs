use crate::error::Result;
use crate::metrics::{EngagementMetrics, PublicMetrics};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// 从外部平台取回的帖子快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSnapshot {
    pub post_id: String,
    pub author_id: Option<String>,
    pub author_handle: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub counts: PublicMetrics,
}

impl PostSnapshot {
    pub fn metrics_at(&self, now: DateTime<Utc>) -> EngagementMetrics {
        EngagementMetrics::observed(&self.counts, self.created_at, now)
    }
}

pub type DynMetricsSource = Arc<dyn MetricsSource + Send + Sync>;

/// 互动指标来源
///
/// 外部接口有严格配额，实现方可以对部分帖子不返回数据，调用方按"本轮跳过"处理。
#[async_trait]
pub trait MetricsSource {
    /// 搜索可能走红的新帖子
    async fn search_candidates(&self) -> Result<Vec<PostSnapshot>>;

    /// 按 ID 批量取最新指标，取不到的帖子不出现在结果中
    async fn lookup(&self, post_ids: &[String]) -> Result<Vec<PostSnapshot>>;
}
