use crate::dtos::claim_dto::ClaimNftRequest;
use async_trait::async_trait;
use chrono::Utc;
use claim::{is_valid_address, ClaimProof, ClaimVerifier};
use database::claim::{
    model::{ClaimProofRecord, ClaimState, ClaimStatus},
    repository::DynClaimRepository,
};
use std::sync::Arc;
use tracing::info;
use utils::{AppError, AppResult};

pub type DynClaimService = Arc<dyn ClaimServiceTrait + Send + Sync>;

#[async_trait]
pub trait ClaimServiceTrait {
    /// 校验钱包签名并将 NFT 标记为 verified
    async fn claim_nft(&self, request: ClaimNftRequest) -> AppResult<ClaimStatus>;

    async fn get_claim_status(&self, nft_address: &str) -> AppResult<ClaimStatus>;
}

#[derive(Clone)]
pub struct ClaimService {
    repository: DynClaimRepository,
    verifier: ClaimVerifier,
}

impl ClaimService {
    pub fn new(repository: DynClaimRepository, verifier: ClaimVerifier) -> Self {
        Self { repository, verifier }
    }
}

#[async_trait]
impl ClaimServiceTrait for ClaimService {
    async fn claim_nft(&self, request: ClaimNftRequest) -> AppResult<ClaimStatus> {
        let nft_address = request.nft_address;
        let wallet_address = request.wallet_address;

        if !is_valid_address(&nft_address) {
            return Err(AppError::BadRequest("Invalid NFT address".to_string()));
        }
        if !is_valid_address(&wallet_address) {
            return Err(AppError::BadRequest("Invalid wallet address".to_string()));
        }

        if let Some(existing) = self.repository.get_claim_status(&nft_address).await? {
            if existing.status.is_locked() {
                return Err(AppError::Conflict("NFT already claimed".to_string()));
            }
        }

        let proof: ClaimProof = request.signature_proof.into();
        let now_ms = Utc::now().timestamp_millis();
        if !self.verifier.validate_at(&proof, &nft_address, &wallet_address, now_ms) {
            return Err(AppError::BadRequest("Invalid signature proof".to_string()));
        }

        // 先占用签名，再写状态；同一证明并发提交时只有一个能通过
        let record = ClaimProofRecord {
            signature: proof.signature,
            nft_address: nft_address.clone(),
            wallet_address: wallet_address.clone(),
            consumed_at: now_ms,
        };
        if !self.repository.consume_proof(&record).await? {
            return Err(AppError::Conflict("Signature proof already used".to_string()));
        }

        if !self.repository.upsert_verified(&nft_address, &wallet_address, now_ms).await? {
            return Err(AppError::Conflict("NFT already claimed".to_string()));
        }

        info!("🎟️ claim verified: nft={} wallet={}", nft_address, wallet_address);

        Ok(ClaimStatus {
            nft_address,
            wallet_address: Some(wallet_address),
            status: ClaimState::Verified,
            verified_at: Some(now_ms),
            updated_at: now_ms,
        })
    }

    async fn get_claim_status(&self, nft_address: &str) -> AppResult<ClaimStatus> {
        match self.repository.get_claim_status(nft_address).await? {
            Some(status) => Ok(status),
            None => Err(AppError::NotFound(format!("Claim status of NFT {} not found.", nft_address))),
        }
    }
}
