use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// NFT 领取进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClaimState {
    Pending,
    /// 签名已校验，等待链上转移
    Verified,
    /// 已完成转移
    Claimed,
}

impl ClaimState {
    /// 已校验或已领取的 NFT 不能再次发起领取
    pub fn is_locked(self) -> bool {
        matches!(self, ClaimState::Verified | ClaimState::Claimed)
    }
}

/// 每个 NFT 一条领取状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClaimStatus {
    pub nft_address: String,
    pub wallet_address: Option<String>,
    pub status: ClaimState,
    pub verified_at: Option<i64>,
    pub updated_at: i64,
}

/// 已使用过的签名，防止同一证明重复提交
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimProofRecord {
    pub signature: String,
    pub nft_address: String,
    pub wallet_address: String,
    pub consumed_at: i64,
}
