use crate::error::{Result, ViralError};
use crate::metrics::PublicMetrics;
use crate::rate_limit::{SharedApiLimitTracker, SEARCH_ENDPOINT, TWITTER_ENDPOINT};
use crate::source::{MetricsSource, PostSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// 单次 lookup 最多 100 个 ID
const LOOKUP_BATCH_SIZE: usize = 100;
const TWEET_FIELDS: &str = "public_metrics,created_at,author_id";

#[derive(Debug, Clone)]
pub struct TwitterConfig {
    pub api_url: String,
    pub bearer_token: String,
    pub search_query: String,
    pub max_results: u32,
    pub timeout: Duration,
}

impl TwitterConfig {
    pub fn new(api_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            bearer_token: bearer_token.into(),
            search_query: "(#web3 OR #NFT OR #blockchain OR #crypto OR #Solana) -is:retweet".to_string(),
            max_results: 10,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TweetsResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Option<Includes>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    #[serde(default)]
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    public_metrics: PublicMetrics,
}

#[derive(Debug, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    username: String,
}

/// Twitter v2 REST 指标来源，所有请求先经过配额追踪
pub struct TwitterMetricsSource {
    client: reqwest::Client,
    config: TwitterConfig,
    limits: SharedApiLimitTracker,
}

impl TwitterMetricsSource {
    pub fn new(config: TwitterConfig, limits: SharedApiLimitTracker) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config, limits })
    }

    fn acquire(&self, endpoint: &str) -> Result<()> {
        let now = Utc::now();
        let mut limits = self
            .limits
            .lock()
            .map_err(|_| ViralError::Source("api limit tracker lock poisoned".to_string()))?;
        // 所有请求都计入 twitter 总配额
        if endpoint == TWITTER_ENDPOINT {
            limits.try_acquire_all(&[TWITTER_ENDPOINT], 1, now)
        } else {
            limits.try_acquire_all(&[TWITTER_ENDPOINT, endpoint], 1, now)
        }
    }

    async fn get_tweets(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<PostSnapshot>> {
        let url = format!("{}{}", self.config.api_url.trim_end_matches('/'), path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.bearer_token)
            .query(query)
            .query(&[
                ("tweet.fields", TWEET_FIELDS),
                ("expansions", "author_id"),
                ("user.fields", "username"),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(ViralError::RateLimited(path.to_string())),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(ViralError::Source(format!("{} returned {}: {}", path, status, body)));
            }
            _ => {}
        }

        let body: TweetsResponse = response.json().await?;
        Ok(Self::into_snapshots(body))
    }

    fn into_snapshots(body: TweetsResponse) -> Vec<PostSnapshot> {
        let users: HashMap<String, String> = body
            .includes
            .map(|i| i.users.into_iter().map(|u| (u.id, u.username)).collect())
            .unwrap_or_default();

        body.data
            .into_iter()
            .filter_map(|tweet| {
                // 没有发布时间无法计算速度
                let created_at = tweet.created_at?;
                let author_handle = tweet
                    .author_id
                    .as_ref()
                    .and_then(|id| users.get(id))
                    .map(|name| format!("@{}", name));

                Some(PostSnapshot {
                    post_id: tweet.id,
                    author_id: tweet.author_id,
                    author_handle,
                    content: tweet.text,
                    created_at,
                    counts: tweet.public_metrics,
                })
            })
            .collect()
    }
}

#[async_trait]
impl MetricsSource for TwitterMetricsSource {
    async fn search_candidates(&self) -> Result<Vec<PostSnapshot>> {
        self.acquire(SEARCH_ENDPOINT)?;

        let query = [
            ("query", self.config.search_query.clone()),
            ("max_results", self.config.max_results.max(10).to_string()),
        ];
        let posts = self.get_tweets("/2/tweets/search/recent", &query).await?;

        info!("🔎 search returned {} candidate posts", posts.len());
        Ok(posts)
    }

    async fn lookup(&self, post_ids: &[String]) -> Result<Vec<PostSnapshot>> {
        let mut posts = Vec::with_capacity(post_ids.len());

        for chunk in post_ids.chunks(LOOKUP_BATCH_SIZE) {
            self.acquire(TWITTER_ENDPOINT)?;
            let batch = self.get_tweets("/2/tweets", &[("ids", chunk.join(","))]).await?;
            debug!("looked up {} of {} posts", batch.len(), chunk.len());
            posts.extend(batch);
        }

        Ok(posts)
    }
}
