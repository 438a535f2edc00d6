use super::model::{count_to_i64, ViralPost};
use crate::is_duplicate_key;
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{FindOptions, IndexOptions},
    Collection, IndexModel,
};
use std::sync::Arc;
use tracing::{info, warn};
use utils::{AppError, AppResult};
use viral::source::PostSnapshot;
use viral::store::TierStateStore;
use viral::{viral_score, EngagementMetrics, PostTierState, Tier, TierUpgrade, ViralError};

pub type DynViralPostRepository = Arc<dyn ViralPostRepositoryTrait + Send + Sync>;

/// 列表查询条件
#[derive(Debug, Clone, Default)]
pub struct ViralPostQuery {
    /// 最低历史等级
    pub min_tier: Option<Tier>,
    pub active_only: bool,
    /// 0 表示不限制
    pub limit: i64,
}

#[async_trait]
pub trait ViralPostRepositoryTrait {
    async fn find_post(&self, post_id: &str) -> AppResult<Option<ViralPost>>;

    /// 按最高等级、最近检查时间倒序
    async fn list_posts(&self, query: &ViralPostQuery) -> AppResult<Vec<ViralPost>>;

    /// 已存在同一 post_id 时不写入并返回 false
    async fn insert_new(&self, post: &ViralPost) -> AppResult<bool>;

    /// 仅当存量 highest_tier 低于目标等级时写入
    async fn apply_upgrade(&self, upgrade: &TierUpgrade, metrics: &EngagementMetrics, now_ms: i64) -> AppResult<bool>;

    async fn mark_stopped(&self, post_id: &str, now_ms: i64) -> AppResult<bool>;

    async fn count_posts(&self, active_only: bool) -> AppResult<u64>;
}

#[derive(Clone, Debug)]
pub struct ViralPostRepository {
    collection: Collection<ViralPost>,
}

impl ViralPostRepository {
    pub fn new(collection: Collection<ViralPost>) -> Self {
        Self { collection }
    }

    pub fn get_collection(&self) -> &Collection<ViralPost> {
        &self.collection
    }

    /// 初始化数据库索引
    pub async fn init_indexes(&self) -> AppResult<()> {
        let indexes = vec![
            // 帖子 ID 唯一
            IndexModel::builder()
                .keys(doc! { "post_id": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
            // 监控轮询
            IndexModel::builder()
                .keys(doc! { "monitoring_active": 1, "highest_tier": 1 })
                .build(),
            IndexModel::builder().keys(doc! { "last_checked_at": -1 }).build(),
        ];

        self.collection.create_indexes(indexes, None).await?;
        info!("✅ ViralPost数据库索引初始化完成");
        Ok(())
    }

    fn list_filter(query: &ViralPostQuery) -> Document {
        let mut filter = doc! {};
        if query.active_only {
            filter.insert("monitoring_active", true);
        }
        if let Some(tier) = query.min_tier {
            filter.insert("highest_tier", doc! { "$gte": i32::from(tier.as_u8()) });
        }
        filter
    }
}

#[async_trait]
impl ViralPostRepositoryTrait for ViralPostRepository {
    async fn find_post(&self, post_id: &str) -> AppResult<Option<ViralPost>> {
        let post = self.collection.find_one(doc! { "post_id": post_id }, None).await?;
        Ok(post)
    }

    async fn list_posts(&self, query: &ViralPostQuery) -> AppResult<Vec<ViralPost>> {
        let mut options = FindOptions::builder()
            .sort(doc! { "highest_tier": -1, "last_checked_at": -1 })
            .build();
        if query.limit > 0 {
            options.limit = Some(query.limit);
        }

        let cursor = self.collection.find(Self::list_filter(query), options).await?;
        let posts: Vec<ViralPost> = cursor.try_collect().await?;
        Ok(posts)
    }

    async fn insert_new(&self, post: &ViralPost) -> AppResult<bool> {
        match self.collection.insert_one(post, None).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_upgrade(&self, upgrade: &TierUpgrade, metrics: &EngagementMetrics, now_ms: i64) -> AppResult<bool> {
        let to = i32::from(upgrade.to.as_u8());
        let filter = doc! {
            "post_id": upgrade.post_id.as_str(),
            "highest_tier": { "$lt": to },
        };
        let update = doc! {
            "$set": {
                "current_tier": to,
                "highest_tier": to,
                "likes": count_to_i64(metrics.likes),
                "retweets": count_to_i64(metrics.retweets),
                "replies": count_to_i64(metrics.replies),
                "quotes": count_to_i64(metrics.quotes),
                "likes_per_hour": metrics.likes_per_hour,
                "retweets_per_hour": metrics.retweets_per_hour,
                "viral_score": i32::from(viral_score(metrics)),
                "last_checked_at": now_ms,
                "last_upgraded_at": now_ms,
            }
        };

        let result = self.collection.update_one(filter, update, None).await?;
        Ok(result.modified_count > 0)
    }

    async fn mark_stopped(&self, post_id: &str, now_ms: i64) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "post_id": post_id, "monitoring_active": true },
                doc! { "$set": { "monitoring_active": false, "last_checked_at": now_ms } },
                None,
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    async fn count_posts(&self, active_only: bool) -> AppResult<u64> {
        let filter = if active_only {
            doc! { "monitoring_active": true }
        } else {
            doc! {}
        };
        let count = self.collection.count_documents(filter, None).await?;
        Ok(count)
    }
}

fn store_error(error: AppError) -> ViralError {
    ViralError::Store(error.to_string())
}

/// 监控任务通过 `TierStateStore` 读写同一集合
#[async_trait]
impl TierStateStore for ViralPostRepository {
    async fn load(&self, post_id: &str) -> viral::Result<Option<PostTierState>> {
        match self.find_post(post_id).await.map_err(store_error)? {
            Some(post) => Ok(Some(post.tier_state()?)),
            None => Ok(None),
        }
    }

    async fn list_active(&self) -> viral::Result<Vec<PostTierState>> {
        let query = ViralPostQuery {
            active_only: true,
            ..Default::default()
        };
        let posts = self.list_posts(&query).await.map_err(store_error)?;

        let mut states = Vec::with_capacity(posts.len());
        for post in posts {
            match post.tier_state() {
                Ok(state) => states.push(state),
                Err(e) => warn!("⚠️ skip corrupt viral post {}: {}", post.post_id, e),
            }
        }
        Ok(states)
    }

    async fn insert_new(
        &self,
        state: &PostTierState,
        snapshot: &PostSnapshot,
        metrics: &EngagementMetrics,
    ) -> viral::Result<bool> {
        let post = ViralPost::new(state, snapshot, metrics, Utc::now().timestamp_millis());
        ViralPostRepositoryTrait::insert_new(self, &post).await.map_err(store_error)
    }

    async fn record_upgrade(&self, upgrade: &TierUpgrade, metrics: &EngagementMetrics) -> viral::Result<bool> {
        self.apply_upgrade(upgrade, metrics, Utc::now().timestamp_millis())
            .await
            .map_err(store_error)
    }

    async fn mark_stopped(&self, post_id: &str) -> viral::Result<()> {
        ViralPostRepositoryTrait::mark_stopped(self, post_id, Utc::now().timestamp_millis())
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filter() {
        assert_eq!(ViralPostRepository::list_filter(&ViralPostQuery::default()), doc! {});

        let query = ViralPostQuery {
            min_tier: Some(Tier::Trending),
            active_only: true,
            limit: 20,
        };
        assert_eq!(
            ViralPostRepository::list_filter(&query),
            doc! { "monitoring_active": true, "highest_tier": { "$gte": 2 } }
        );
    }
}
