use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use database::Database;
use server::{
    app::{shutdown_signal, ApplicationServer},
    services::Services,
};
use std::sync::{Arc, Mutex};
use timer::Timer;
use tokio::{task::JoinSet, time::Duration};
use tracing::{error, info, warn};
use utils::{AppConfig, Logger};
use viral::{
    notify::LogNotifier,
    store::DynTierStateStore,
    twitter::{TwitterConfig, TwitterMetricsSource},
    ApiLimitTracker, EngagementMonitor, SharedApiLimitTracker, TierClassifier, TierThresholds,
};

/// 收到停止信号后等待服务端优雅退出的最长时间
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Solspace::with_config();
    let _guard = Logger::new(config.cargo_env, &config.rust_log);

    let solspace = Solspace::new(config).await.context("🔴 Failed to initialize solspace")?;
    solspace.run().await
}

pub struct Solspace {
    services: Services,
    timer: Option<Arc<Timer>>,
    config: Arc<AppConfig>,
}

impl Solspace {
    pub async fn new(config: Arc<AppConfig>) -> Result<Self> {
        let thresholds = TierThresholds::load(config.viral_thresholds_file.as_deref())?;
        let classifier = TierClassifier::new(thresholds);
        let limits: SharedApiLimitTracker = Arc::new(Mutex::new(ApiLimitTracker::new(Utc::now())));

        let database = Solspace::with_database(config.clone()).await?;
        let services = Services::new(database.clone(), &config, classifier.clone(), limits.clone());
        let timer = Solspace::with_timer(&config, database, classifier, limits)?;

        Ok(Self {
            services,
            timer,
            config,
        })
    }

    pub async fn run(self) -> Result<()> {
        let mut set: JoinSet<Result<()>> = JoinSet::new();

        // 1. 启动api & services
        // 2. 启动Timer(互动监控)

        let config = self.config.clone();
        let services = self.services.clone();
        set.spawn(async move { ApplicationServer::serve(config, services).await });

        let timer_handle = self.timer.map(|timer| {
            set.spawn(async move {
                info!("Starting engagement monitor timer...");
                timer.run().await
            })
        });

        tokio::select! {
            Some(result) = set.join_next() => {
                match result {
                    Ok(Ok(())) => info!("🔔 Task completed"),
                    Ok(Err(e)) => error!("🔴 Task failed: {:#}", e),
                    Err(e) => error!("🔴 Task panicked or was cancelled: {}", e),
                }
            },
            _ = shutdown_signal() => {
                info!("🔔 Shutdown signal received, stopping all tasks...");
            },
        }

        if let Some(handle) = timer_handle {
            handle.abort();
        }

        // 服务端自身也在监听信号，这里只等待它完成优雅退出
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while let Some(result) = set.join_next().await {
                if let Ok(Err(e)) = result {
                    error!("🔴 Task failed during shutdown: {:#}", e);
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("⚠️ Tasks did not stop within {:?}, aborting", SHUTDOWN_GRACE);
            set.shutdown().await;
        }

        info!("👋 solspace stopped");
        Ok(())
    }
}

impl Solspace {
    fn with_config() -> Arc<AppConfig> {
        // 根据 CARGO_ENV 加载对应的环境配置文件
        utils::EnvLoader::load_env_file().ok();
        Arc::new(AppConfig::parse())
    }

    async fn with_database(config: Arc<AppConfig>) -> Result<Arc<Database>> {
        let database = Database::new(config).await.context("🔴 Failed to connect mongodb")?;
        database.init_repository_indexes().await.context("🔴 Failed to init indexes")?;
        Ok(Arc::new(database))
    }

    /// 未配置 Twitter token 时不启动监控，只提供 HTTP 接口
    fn with_timer(
        config: &AppConfig,
        database: Arc<Database>,
        classifier: TierClassifier,
        limits: SharedApiLimitTracker,
    ) -> Result<Option<Arc<Timer>>> {
        let Some(token) = config.twitter_bearer_token.clone().filter(|t| !t.is_empty()) else {
            warn!("⚠️ TWITTER_BEARER_TOKEN not set, engagement monitor disabled");
            return Ok(None);
        };

        let source = TwitterMetricsSource::new(TwitterConfig::new(config.twitter_api_url.clone(), token), limits)?;
        let store: DynTierStateStore = Arc::new(database.viral_post_repository.clone());
        let notifier = Arc::new(LogNotifier::new(config.claim_base_url.clone()));
        let monitor = EngagementMonitor::new(classifier, Arc::new(source), store, notifier);

        Ok(Some(Arc::new(Timer::new(Some(config.monitor_cron.clone()), Arc::new(monitor)))))
    }
}
