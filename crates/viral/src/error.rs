use thiserror::Error;

/// 爆款检测错误类型定义
#[derive(Error, Debug)]
pub enum ViralError {
    #[error("invalid metrics: {0}")]
    InvalidMetrics(String),

    #[error("invalid tier value: {0}")]
    InvalidTier(i64),

    #[error("invalid threshold config: {0}")]
    Config(String),

    #[error("rate limit exceeded for endpoint {0}")]
    RateLimited(String),

    #[error("metrics source error: {0}")]
    Source(String),

    #[error("tier state store error: {0}")]
    Store(String),

    #[error("notification error: {0}")]
    Notify(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
}

/// Result类型别名
pub type Result<T> = std::result::Result<T, ViralError>;
