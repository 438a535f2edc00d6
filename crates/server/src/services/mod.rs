pub mod claim_service;
pub mod viral_service;

use claim::ClaimVerifier;
use claim_service::{ClaimService, DynClaimService};
use database::{
    claim::repository::DynClaimRepository, viral_post::repository::DynViralPostRepository, Database,
};
use std::sync::Arc;
use tracing::info;
use utils::AppConfig;
use viral::{SharedApiLimitTracker, TierClassifier};
use viral_service::{DynViralService, ViralService};

#[derive(Clone)]
pub struct Services {
    pub claim: DynClaimService,
    pub viral: DynViralService,
}

impl Services {
    pub fn new(db: Arc<Database>, config: &AppConfig, classifier: TierClassifier, limits: SharedApiLimitTracker) -> Self {
        let claim_repository = Arc::new(db.claim_repository.clone()) as DynClaimRepository;
        let viral_post_repository = Arc::new(db.viral_post_repository.clone()) as DynViralPostRepository;
        let verifier = ClaimVerifier::new(
            config.claim_message_ttl(),
            std::time::Duration::from_secs(config.claim_clock_skew_secs),
        );

        info!("🧠 initializing services...");
        Self::with_repositories(claim_repository, viral_post_repository, verifier, classifier, limits)
    }

    /// 直接注入仓库，测试中使用内存实现
    pub fn with_repositories(
        claim_repository: DynClaimRepository,
        viral_post_repository: DynViralPostRepository,
        verifier: ClaimVerifier,
        classifier: TierClassifier,
        limits: SharedApiLimitTracker,
    ) -> Self {
        let claim = Arc::new(ClaimService::new(claim_repository, verifier)) as DynClaimService;
        let viral = Arc::new(ViralService::new(viral_post_repository, classifier, limits)) as DynViralService;

        Self { claim, viral }
    }
}
