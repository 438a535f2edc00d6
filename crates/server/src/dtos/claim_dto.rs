use claim::ClaimProof;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// 钱包签名证明
///
/// 不做格式校验：任何格式问题都由签名校验统一返回 "Invalid signature proof"，
/// 调用方无法区分格式错误与签名错误。
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignatureProofDto {
    /// base58 编码的 ed25519 签名
    pub signature: String,

    /// 被签名的原始消息
    pub message: String,

    /// 签名钱包公钥（base58）
    #[serde(alias = "publicKey")]
    pub public_key: String,
}

impl From<SignatureProofDto> for ClaimProof {
    fn from(dto: SignatureProofDto) -> Self {
        ClaimProof {
            signature: dto.signature,
            message: dto.message,
            public_key: dto.public_key,
        }
    }
}

/// 领取 NFT 请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ClaimNftRequest {
    /// NFT mint 地址
    #[serde(alias = "nftAddress")]
    #[validate(length(min = 32, max = 44))]
    pub nft_address: String,

    /// 领取人钱包地址
    #[serde(alias = "walletAddress")]
    #[validate(length(min = 32, max = 44))]
    pub wallet_address: String,

    #[serde(alias = "signatureProof")]
    pub signature_proof: SignatureProofDto,
}

/// 领取状态查询参数
#[derive(Debug, Clone, Serialize, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClaimStatusQuery {
    /// NFT mint 地址
    #[validate(length(min = 32, max = 44))]
    pub nft_address: String,
}
