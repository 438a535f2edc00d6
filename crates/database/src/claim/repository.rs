use super::model::{ClaimProofRecord, ClaimStatus};
use crate::is_duplicate_key;
use async_trait::async_trait;
use mongodb::{
    bson::doc,
    options::{IndexOptions, UpdateOptions},
    Collection, IndexModel,
};
use std::sync::Arc;
use tracing::info;
use utils::AppResult;

pub type DynClaimRepository = Arc<dyn ClaimRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait ClaimRepositoryTrait {
    async fn get_claim_status(&self, nft_address: &str) -> AppResult<Option<ClaimStatus>>;

    /// 将领取状态置为 verified；已是 verified/claimed 时返回 false
    async fn upsert_verified(&self, nft_address: &str, wallet_address: &str, now_ms: i64) -> AppResult<bool>;

    /// 记录签名已使用；签名已存在时返回 false
    async fn consume_proof(&self, record: &ClaimProofRecord) -> AppResult<bool>;
}

#[derive(Clone, Debug)]
pub struct ClaimRepository {
    statuses: Collection<ClaimStatus>,
    proofs: Collection<ClaimProofRecord>,
}

impl ClaimRepository {
    pub fn new(statuses: Collection<ClaimStatus>, proofs: Collection<ClaimProofRecord>) -> Self {
        Self { statuses, proofs }
    }

    /// 初始化数据库索引
    pub async fn init_indexes(&self) -> AppResult<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.statuses
            .create_indexes(
                vec![IndexModel::builder()
                    .keys(doc! { "nft_address": 1 })
                    .options(unique())
                    .build()],
                None,
            )
            .await?;

        self.proofs
            .create_indexes(
                vec![
                    // 重放防护依赖该唯一索引
                    IndexModel::builder()
                        .keys(doc! { "signature": 1 })
                        .options(unique())
                        .build(),
                    IndexModel::builder().keys(doc! { "nft_address": 1 }).build(),
                ],
                None,
            )
            .await?;

        info!("✅ ClaimStatus/ClaimProof数据库索引初始化完成");
        Ok(())
    }
}

#[async_trait]
impl ClaimRepositoryTrait for ClaimRepository {
    async fn get_claim_status(&self, nft_address: &str) -> AppResult<Option<ClaimStatus>> {
        let status = self.statuses.find_one(doc! { "nft_address": nft_address }, None).await?;
        Ok(status)
    }

    async fn upsert_verified(&self, nft_address: &str, wallet_address: &str, now_ms: i64) -> AppResult<bool> {
        let filter = doc! {
            "nft_address": nft_address,
            "status": { "$nin": ["verified", "claimed"] },
        };
        let update = doc! {
            "$set": {
                "wallet_address": wallet_address,
                "status": "verified",
                "verified_at": now_ms,
                "updated_at": now_ms,
            }
        };
        let options = UpdateOptions::builder().upsert(true).build();

        // 已锁定的记录不匹配过滤条件，upsert 会撞上 nft_address 唯一索引
        match self.statuses.update_one(filter, update, options).await {
            Ok(result) => Ok(result.modified_count > 0 || result.upserted_id.is_some()),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn consume_proof(&self, record: &ClaimProofRecord) -> AppResult<bool> {
        match self.proofs.insert_one(record, None).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::claim::model::ClaimState;

    #[test]
    fn test_locked_state_names_match_filter() {
        let locked: Vec<String> = [ClaimState::Verified, ClaimState::Claimed]
            .into_iter()
            .map(|s| mongodb::bson::to_bson(&s).unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(locked, vec!["verified", "claimed"]);
    }
}
