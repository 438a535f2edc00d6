use crate::error::Result;
use crate::source::PostSnapshot;
use crate::tier::{Tier, TierUpgrade};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub type DynUpgradeNotifier = Arc<dyn UpgradeNotifier + Send + Sync>;

/// 等级事件通知（私信投递本身由外部服务完成）
#[async_trait]
pub trait UpgradeNotifier {
    /// 新帖子首次达到某个等级
    async fn notify_new_viral(&self, post: &PostSnapshot, tier: Tier) -> Result<()>;

    /// 已跟踪帖子升级
    async fn notify_tier_upgrade(&self, upgrade: &TierUpgrade) -> Result<()>;
}

/// 领取页面地址
pub fn claim_url(base_url: &str, post_id: &str) -> String {
    format!("{}/claim-nft?tweet={}", base_url.trim_end_matches('/'), post_id)
}

/// 按等级生成给作者的私信文案
pub fn dm_template(tier: Tier, claim_url: &str) -> Option<String> {
    let text = match tier {
        Tier::None => return None,
        Tier::Rising => format!(
            "🌟 Your tweet is gaining traction! We've preserved it as an NFT on SOLspace.\n\n\
             🎯 Ready to own your content? Claim it here: {}",
            claim_url
        ),
        Tier::Trending => format!(
            "🚀 Your tweet is taking off! We've preserved this rising star as an NFT on SOLspace.\n\n\
             🎯 Ready to own your viral content? Claim it here: {}",
            claim_url
        ),
        Tier::Viral => format!(
            "🌟 Congratulations! Your tweet has gone viral! We've preserved this moment as an NFT on SOLspace.\n\n\
             🎯 Ready to own your viral success? Claim it here: {}",
            claim_url
        ),
    };
    Some(text)
}

/// 只写日志的通知器
#[derive(Debug, Clone)]
pub struct LogNotifier {
    claim_base_url: String,
}

impl LogNotifier {
    pub fn new(claim_base_url: impl Into<String>) -> Self {
        Self {
            claim_base_url: claim_base_url.into(),
        }
    }
}

#[async_trait]
impl UpgradeNotifier for LogNotifier {
    async fn notify_new_viral(&self, post: &PostSnapshot, tier: Tier) -> Result<()> {
        let url = claim_url(&self.claim_base_url, &post.post_id);
        if let Some(dm) = dm_template(tier, &url) {
            info!(
                post_id = %post.post_id,
                author = ?post.author_handle,
                tier = tier.as_u8(),
                "📨 new {} post, dm: {}",
                tier.name(),
                dm
            );
        }
        Ok(())
    }

    async fn notify_tier_upgrade(&self, upgrade: &TierUpgrade) -> Result<()> {
        let url = claim_url(&self.claim_base_url, &upgrade.post_id);
        info!(
            post_id = %upgrade.post_id,
            from = upgrade.from.as_u8(),
            to = upgrade.to.as_u8(),
            "⬆️ tier upgrade {} -> {}, claim at {}",
            upgrade.from.name(),
            upgrade.to.name(),
            url
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_url() {
        assert_eq!(claim_url("https://solspace.app/", "42"), "https://solspace.app/claim-nft?tweet=42");
    }

    #[test]
    fn test_dm_template_per_tier() {
        assert!(dm_template(Tier::None, "u").is_none());
        assert!(dm_template(Tier::Rising, "u1").unwrap().contains("gaining traction"));
        assert!(dm_template(Tier::Trending, "u2").unwrap().ends_with("u2"));
        assert!(dm_template(Tier::Viral, "u3").unwrap().contains("gone viral"));
    }
}
