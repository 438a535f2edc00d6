////////////////////////////////////////////////////////////////////////
//
// 1. 每个Domain(Entity)单独一个文件夹
// 2. 每个Domain由两部分组成:
//    - model: 定义Schema
//    - repository: 实际的数据库底层操作
//
//////////////////////////////////////////////////////////////////////

use mongodb::{
    error::{ErrorKind, WriteFailure},
    Client, Collection,
};
use std::sync::Arc;
use tracing::{error, info};
use utils::{AppConfig, AppResult};

pub mod claim;
pub mod viral_post;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone, Debug)]
pub struct Database {
    pub viral_posts: Collection<viral_post::model::ViralPost>,
    pub claim_statuses: Collection<claim::model::ClaimStatus>,
    pub claim_proofs: Collection<claim::model::ClaimProofRecord>,
    // 仓库层
    pub viral_post_repository: viral_post::repository::ViralPostRepository,
    pub claim_repository: claim::repository::ClaimRepository,
}

impl Database {
    pub async fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        let client = Client::with_uri_str(&config.mongo_uri).await?;
        let db: mongodb::Database = client.database(&config.mongo_db);

        let viral_posts = db.collection("ViralPost");
        let claim_statuses = db.collection("ClaimStatus");
        let claim_proofs = db.collection("ClaimProofRecord");

        let viral_post_repository = viral_post::repository::ViralPostRepository::new(viral_posts.clone());
        let claim_repository = claim::repository::ClaimRepository::new(claim_statuses.clone(), claim_proofs.clone());

        info!("🧱 database({:#}) connected.", &config.mongo_db);

        Ok(Database {
            viral_posts,
            claim_statuses,
            claim_proofs,
            viral_post_repository,
            claim_repository,
        })
    }

    /// 初始化索引；唯一索引是去重与重放防护的前提，失败直接返回
    pub async fn init_repository_indexes(&self) -> AppResult<()> {
        if let Err(e) = self.viral_post_repository.init_indexes().await {
            error!("❌ ViralPost索引初始化失败: {}", e);
            return Err(e);
        }
        if let Err(e) = self.claim_repository.init_indexes().await {
            error!("❌ Claim索引初始化失败: {}", e);
            return Err(e);
        }

        info!("✅ 数据库索引初始化完成");
        Ok(())
    }
}

/// 唯一索引冲突
pub(crate) fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}
