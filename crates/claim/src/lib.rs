//! NFT 领取的钱包签名校验。
//!
//! 对外只暴露布尔结果：调用方无法区分"签名错误"与"输入格式错误"，失败原因仅写入日志。

pub mod message;
pub mod verifier;

pub use message::{build_claim_message, parse_claim_message, ClaimMessage};
pub use verifier::{is_valid_address, validate_claim_proof, verify_signature, ClaimProof, ClaimVerifier, VerifyFailure};
