use crate::error::{Result, ViralError};
use crate::tier::Tier;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// 单个等级的准入条件
///
/// `min_likes` 与 `likes_per_hour` 必须同时满足；其余条件为可选门槛，未配置时不检查。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRequirement {
    pub min_likes: u64,
    pub likes_per_hour: f64,
    #[serde(default)]
    pub min_retweets: Option<u64>,
    #[serde(default)]
    pub min_replies: Option<u64>,
    #[serde(default)]
    pub retweets_per_hour: Option<f64>,
}

impl TierRequirement {
    pub fn new(min_likes: u64, likes_per_hour: f64) -> Self {
        Self {
            min_likes,
            likes_per_hour,
            min_retweets: None,
            min_replies: None,
            retweets_per_hour: None,
        }
    }
}

/// 分级阈值配置，进程启动时加载一次，之后只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub rising: TierRequirement,
    pub trending: TierRequirement,
    pub viral: TierRequirement,
    /// 超过该年龄（小时）的帖子不再参与升级检查
    pub age_hours_max: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            rising: TierRequirement::new(1000, 100.0),
            trending: TierRequirement::new(2500, 250.0),
            viral: TierRequirement::new(5000, 500.0),
            age_hours_max: 48.0,
        }
    }
}

impl TierThresholds {
    /// 等级到阈值的映射；`Tier::None` 没有准入条件
    pub fn requirement(&self, tier: Tier) -> Option<&TierRequirement> {
        match tier {
            Tier::None => None,
            Tier::Rising => Some(&self.rising),
            Tier::Trending => Some(&self.trending),
            Tier::Viral => Some(&self.viral),
        }
    }

    /// 从 JSON 文件加载并校验
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let thresholds: TierThresholds = serde_json::from_str(&raw)?;
        thresholds.validate()?;

        info!("📐 loaded tier thresholds from {:?}", path);
        Ok(thresholds)
    }

    /// 按配置加载：指定文件则读文件，否则使用内置默认值
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => {
                info!("📐 using built-in tier thresholds");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.age_hours_max.is_finite() || self.age_hours_max <= 0.0 {
            return Err(ViralError::Config(format!("age_hours_max must be positive, got {}", self.age_hours_max)));
        }

        for tier in Tier::RANKED {
            let Some(req) = self.requirement(tier) else { continue };
            let rates = [Some(req.likes_per_hour), req.retweets_per_hour];
            if rates.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(ViralError::Config(format!("{} velocity must be a non-negative number", tier.name())));
            }
        }

        // 高等级门槛低于低等级不影响正确性（评估总是取最高满足等级），但多半是配置失误
        if self.rising.min_likes > self.trending.min_likes || self.trending.min_likes > self.viral.min_likes {
            warn!("⚠️ tier min_likes are not increasing: {:?}", self);
        }

        Ok(())
    }
}
