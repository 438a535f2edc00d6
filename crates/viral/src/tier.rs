use crate::error::{Result, ViralError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 爆款等级
///
/// 数值与链上元数据保持一致：0 未达标，1 Rising，2 Trending，3 Viral。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Tier {
    #[default]
    None,
    Rising,
    Trending,
    Viral,
}

impl Tier {
    /// 从高到低排列的可评级等级
    pub const RANKED: [Tier; 3] = [Tier::Viral, Tier::Trending, Tier::Rising];

    pub fn as_u8(self) -> u8 {
        match self {
            Tier::None => 0,
            Tier::Rising => 1,
            Tier::Trending => 2,
            Tier::Viral => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::None => "None",
            Tier::Rising => "Rising",
            Tier::Trending => "Trending",
            Tier::Viral => "Viral",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Tier::None => "",
            Tier::Rising => "A rising social media post with growing engagement",
            Tier::Trending => "A trending post with substantial engagement",
            Tier::Viral => "A viral post with exceptional engagement",
        }
    }

    /// 是否已是最高等级
    pub fn is_max(self) -> bool {
        self == Tier::Viral
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.as_u8()
    }
}

impl TryFrom<u8> for Tier {
    type Error = ViralError;

    fn try_from(value: u8) -> Result<Self> {
        Tier::try_from(i64::from(value))
    }
}

impl TryFrom<i64> for Tier {
    type Error = ViralError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Tier::None),
            1 => Ok(Tier::Rising),
            2 => Ok(Tier::Trending),
            3 => Ok(Tier::Viral),
            other => Err(ViralError::InvalidTier(other)),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.as_u8())
    }
}

/// 一次等级升级事件，交由下游通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierUpgrade {
    pub post_id: String,
    pub from: Tier,
    pub to: Tier,
}

/// 帖子的等级状态
///
/// `highest_tier` 只增不减且始终 >= `current_tier`；`monitoring_stopped` 一旦置位不再恢复。
/// 同一帖子的并发写入需由存储层串行化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostTierState {
    post_id: String,
    current_tier: Tier,
    highest_tier: Tier,
    monitoring_stopped: bool,
}

impl PostTierState {
    pub fn new(post_id: impl Into<String>, tier: Tier) -> Self {
        Self {
            post_id: post_id.into(),
            current_tier: tier,
            highest_tier: tier,
            monitoring_stopped: false,
        }
    }

    /// 从持久化数据恢复，校验不变量
    pub fn from_parts(
        post_id: impl Into<String>,
        current_tier: Tier,
        highest_tier: Tier,
        monitoring_stopped: bool,
    ) -> Result<Self> {
        let post_id = post_id.into();
        if highest_tier < current_tier {
            return Err(ViralError::Store(format!(
                "post {} has highest tier {} below current tier {}",
                post_id, highest_tier, current_tier
            )));
        }

        Ok(Self {
            post_id,
            current_tier,
            highest_tier,
            monitoring_stopped,
        })
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn current_tier(&self) -> Tier {
        self.current_tier
    }

    pub fn highest_tier(&self) -> Tier {
        self.highest_tier
    }

    pub fn monitoring_stopped(&self) -> bool {
        self.monitoring_stopped
    }

    /// 尝试升级；`new_tier <= highest_tier` 时不做任何修改
    pub fn apply_upgrade(&mut self, new_tier: Tier) -> Option<TierUpgrade> {
        if new_tier <= self.highest_tier {
            return None;
        }

        let from = self.highest_tier;
        self.current_tier = new_tier;
        self.highest_tier = new_tier;

        Some(TierUpgrade {
            post_id: self.post_id.clone(),
            from,
            to: new_tier,
        })
    }

    /// 停止监控，返回状态是否发生变化
    pub fn stop_monitoring(&mut self) -> bool {
        let changed = !self.monitoring_stopped;
        self.monitoring_stopped = true;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering_and_numbers() {
        assert!(Tier::None < Tier::Rising);
        assert!(Tier::Rising < Tier::Trending);
        assert!(Tier::Trending < Tier::Viral);
        for tier in [Tier::None, Tier::Rising, Tier::Trending, Tier::Viral] {
            assert_eq!(Tier::try_from(tier.as_u8()).unwrap(), tier);
        }
        assert!(matches!(Tier::try_from(4u8), Err(ViralError::InvalidTier(4))));
        assert!(matches!(Tier::try_from(-1i64), Err(ViralError::InvalidTier(-1))));
    }

    #[test]
    fn test_tier_serde_as_number() {
        assert_eq!(serde_json::to_string(&Tier::Trending).unwrap(), "2");
        assert_eq!(serde_json::from_str::<Tier>("3").unwrap(), Tier::Viral);
        assert!(serde_json::from_str::<Tier>("7").is_err());
    }

    #[test]
    fn test_upgrade_from_trending_to_viral() {
        let mut state = PostTierState::new("1800000000000000001", Tier::Trending);

        // 低于最高等级：不变
        assert_eq!(state.apply_upgrade(Tier::Rising), None);
        assert_eq!(state.current_tier(), Tier::Trending);
        assert_eq!(state.highest_tier(), Tier::Trending);

        let upgrade = state.apply_upgrade(Tier::Viral).unwrap();
        assert_eq!(upgrade.from, Tier::Trending);
        assert_eq!(upgrade.to, Tier::Viral);
        assert_eq!(upgrade.post_id, "1800000000000000001");
        assert_eq!(state.current_tier(), Tier::Viral);
        assert_eq!(state.highest_tier(), Tier::Viral);
    }

    #[test]
    fn test_upgrade_is_idempotent_and_monotonic() {
        let mut state = PostTierState::new("p", Tier::Rising);
        let sequence = [
            Tier::Trending,
            Tier::Trending,
            Tier::None,
            Tier::Rising,
            Tier::Viral,
            Tier::Trending,
            Tier::Viral,
        ];

        let mut previous = state.highest_tier();
        let mut upgrades = 0;
        for tier in sequence {
            if state.apply_upgrade(tier).is_some() {
                upgrades += 1;
            }
            assert!(state.highest_tier() >= previous);
            assert!(state.highest_tier() >= state.current_tier());
            previous = state.highest_tier();
        }

        assert_eq!(upgrades, 2);
        assert_eq!(state.highest_tier(), Tier::Viral);
    }

    #[test]
    fn test_stop_monitoring_is_sticky() {
        let mut state = PostTierState::new("p", Tier::Rising);
        assert!(state.stop_monitoring());
        assert!(!state.stop_monitoring());
        assert!(state.monitoring_stopped());
    }

    #[test]
    fn test_from_parts_rejects_broken_invariant() {
        assert!(PostTierState::from_parts("p", Tier::Viral, Tier::Rising, false).is_err());
        let state = PostTierState::from_parts("p", Tier::Rising, Tier::Trending, true).unwrap();
        assert_eq!(state.highest_tier(), Tier::Trending);
        assert!(state.monitoring_stopped());
    }
}
