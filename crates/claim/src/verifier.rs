use crate::message::{build_claim_message, parse_claim_message};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// 钱包对领取消息的签名证明（签名与公钥均为 base58）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimProof {
    pub signature: String,
    pub message: String,
    #[serde(alias = "publicKey")]
    pub public_key: String,
}

/// 校验失败原因，只用于日志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerifyFailure {
    #[error("signature_decoding")]
    SignatureDecoding,
    #[error("public_key_decoding")]
    PublicKeyDecoding,
    #[error("invalid_public_key")]
    InvalidPublicKey,
    #[error("template_mismatch")]
    TemplateMismatch,
    #[error("wallet_mismatch")]
    WalletMismatch,
    #[error("bad_signature")]
    BadSignature,
    #[error("expired")]
    Expired,
    #[error("from_future")]
    FromFuture,
}

/// 是否为 base58 编码的 32 字节公钥
pub fn is_valid_address(address: &str) -> bool {
    matches!(bs58::decode(address).into_vec(), Ok(bytes) if bytes.len() == 32)
}

fn check_signature(proof: &ClaimProof) -> Result<(), VerifyFailure> {
    let key_bytes: [u8; 32] = bs58::decode(&proof.public_key)
        .into_vec()
        .map_err(|_| VerifyFailure::PublicKeyDecoding)?
        .try_into()
        .map_err(|_| VerifyFailure::PublicKeyDecoding)?;
    let signature_bytes: [u8; 64] = bs58::decode(&proof.signature)
        .into_vec()
        .map_err(|_| VerifyFailure::SignatureDecoding)?
        .try_into()
        .map_err(|_| VerifyFailure::SignatureDecoding)?;

    let verifying_key = VerifyingKey::from_bytes(&key_bytes).map_err(|_| VerifyFailure::InvalidPublicKey)?;
    let signature = Signature::from_bytes(&signature_bytes);

    verifying_key
        .verify(proof.message.as_bytes(), &signature)
        .map_err(|_| VerifyFailure::BadSignature)
}

/// 返回嵌入消息中的时间戳
fn check_claim_proof(proof: &ClaimProof, nft_address: &str, wallet_address: &str) -> Result<i64, VerifyFailure> {
    let embedded = parse_claim_message(&proof.message).ok_or(VerifyFailure::TemplateMismatch)?;
    if proof.message != build_claim_message(nft_address, wallet_address, embedded.timestamp_ms) {
        return Err(VerifyFailure::TemplateMismatch);
    }
    if proof.public_key != wallet_address {
        return Err(VerifyFailure::WalletMismatch);
    }
    check_signature(proof)?;
    Ok(embedded.timestamp_ms)
}

fn log_failure(reason: VerifyFailure, public_key: &str) {
    warn!(reason = %reason, public_key = %public_key, "❌ claim proof rejected");
}

/// 校验签名本身；解码或密码学失败都返回 false
pub fn verify_signature(proof: &ClaimProof) -> bool {
    match check_signature(proof) {
        Ok(()) => true,
        Err(reason) => {
            log_failure(reason, &proof.public_key);
            false
        }
    }
}

/// 消息模板、钱包地址、签名三项依次校验，任一失败即返回 false
pub fn validate_claim_proof(proof: &ClaimProof, nft_address: &str, wallet_address: &str) -> bool {
    match check_claim_proof(proof, nft_address, wallet_address) {
        Ok(_) => true,
        Err(reason) => {
            log_failure(reason, &proof.public_key);
            false
        }
    }
}

/// 带时效窗口的领取校验
///
/// `max_age` 为 `None` 时与 [`validate_claim_proof`] 完全一致。
/// 允许消息时间戳比 `now` 超前不超过 `clock_skew`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimVerifier {
    max_age: Option<Duration>,
    clock_skew: Duration,
}

impl Default for ClaimVerifier {
    fn default() -> Self {
        Self {
            max_age: None,
            clock_skew: Duration::ZERO,
        }
    }
}

impl ClaimVerifier {
    pub fn new(max_age: Option<Duration>, clock_skew: Duration) -> Self {
        Self { max_age, clock_skew }
    }

    pub fn validate_at(&self, proof: &ClaimProof, nft_address: &str, wallet_address: &str, now_ms: i64) -> bool {
        let result = check_claim_proof(proof, nft_address, wallet_address)
            .and_then(|timestamp_ms| self.check_freshness(timestamp_ms, now_ms));

        match result {
            Ok(()) => {
                debug!(nft = %nft_address, wallet = %wallet_address, "✅ claim proof accepted");
                true
            }
            Err(reason) => {
                log_failure(reason, &proof.public_key);
                false
            }
        }
    }

    fn check_freshness(&self, timestamp_ms: i64, now_ms: i64) -> Result<(), VerifyFailure> {
        let Some(max_age) = self.max_age else {
            return Ok(());
        };

        let age_ms = i128::from(now_ms) - i128::from(timestamp_ms);
        if age_ms > max_age.as_millis() as i128 {
            return Err(VerifyFailure::Expired);
        }
        if -age_ms > self.clock_skew.as_millis() as i128 {
            return Err(VerifyFailure::FromFuture);
        }
        Ok(())
    }
}
