use serde::{Deserialize, Serialize};

const CLAIM_HEADER: &str = "Sign this message to claim your NFT";
const NFT_PREFIX: &str = "NFT: ";
const WALLET_PREFIX: &str = "Wallet: ";
const TIMESTAMP_PREFIX: &str = "Timestamp: ";

/// 领取消息中绑定的字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimMessage {
    pub nft_address: String,
    pub wallet_address: String,
    /// Unix 毫秒时间戳
    pub timestamp_ms: i64,
}

/// 构造待签名的领取消息。时间戳由调用方提供，这里不读取时钟。
pub fn build_claim_message(nft_address: &str, wallet_address: &str, timestamp_ms: i64) -> String {
    format!(
        "{}\n{}{}\n{}{}\n{}{}",
        CLAIM_HEADER, NFT_PREFIX, nft_address, WALLET_PREFIX, wallet_address, TIMESTAMP_PREFIX, timestamp_ms
    )
}

/// 严格解析领取消息，只接受 `build_claim_message` 能原样生成的文本
pub fn parse_claim_message(message: &str) -> Option<ClaimMessage> {
    let mut lines = message.split('\n');

    if lines.next()? != CLAIM_HEADER {
        return None;
    }
    let nft_address = lines.next()?.strip_prefix(NFT_PREFIX)?;
    let wallet_address = lines.next()?.strip_prefix(WALLET_PREFIX)?;
    let timestamp_ms: i64 = lines.next()?.strip_prefix(TIMESTAMP_PREFIX)?.parse().ok()?;
    if lines.next().is_some() {
        return None;
    }

    // "+1" / "007" 之类能被 parse 但不是规范形式
    if build_claim_message(nft_address, wallet_address, timestamp_ms) != message {
        return None;
    }

    Some(ClaimMessage {
        nft_address: nft_address.to_string(),
        wallet_address: wallet_address.to_string(),
        timestamp_ms,
    })
}
