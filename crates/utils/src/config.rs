use clap::Parser;

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
#[clap(rename_all = "lowercase")]
pub enum CargoEnv {
    Development,
    Production,
}

/// 环境配置加载器
pub struct EnvLoader;

impl EnvLoader {
    /// 根据 CARGO_ENV 加载对应的环境配置文件
    pub fn load_env_file() -> Result<(), Box<dyn std::error::Error>> {
        // 1. 获取环境变量 CARGO_ENV，默认 development
        let cargo_env = std::env::var("CARGO_ENV").unwrap_or_else(|_| "development".to_string());

        // 2. 构建配置文件路径
        let env_file = Self::env_file_for(&cargo_env);

        // 3. 文件不存在时回退到默认的 .env
        if !std::path::Path::new(env_file).exists() {
            eprintln!("⚠️  配置文件 {} 不存在，尝试加载默认的 .env 文件", env_file);
            if std::path::Path::new(".env").exists() {
                dotenvy::from_filename(".env")?;
                println!("✅ 已加载默认配置文件: .env");
            } else {
                eprintln!("❌ 未找到任何配置文件，使用默认配置");
            }
            return Ok(());
        }

        // 4. 加载指定的环境配置文件
        dotenvy::from_filename(env_file)?;
        println!("✅ 已加载环境配置文件: {} (CARGO_ENV={})", env_file, cargo_env);

        Ok(())
    }

    fn env_file_for(cargo_env: &str) -> &'static str {
        match cargo_env {
            "production" | "Production" | "prod" => ".env.production",
            "development" | "Development" | "dev" => ".env.development",
            "test" | "Test" => ".env.test",
            _ => {
                println!("⚠️  未知的 CARGO_ENV: {}，使用默认的 .env.development", cargo_env);
                ".env.development"
            }
        }
    }
}

#[derive(clap::Parser, Clone, Debug)]
pub struct AppConfig {
    #[clap(long, env, value_enum)]
    pub cargo_env: CargoEnv,

    #[clap(long, env, default_value = "0.0.0.0")]
    pub app_host: String,

    #[clap(long, env, default_value = "8000")]
    pub app_port: u16,

    #[clap(long, env, default_value = "mongodb://localhost:27017")]
    pub mongo_uri: String,

    #[clap(long, env)]
    pub mongo_db: String,

    /// Twitter v2 API bearer token，为空时不启动互动监控
    #[clap(long, env)]
    pub twitter_bearer_token: Option<String>,

    #[clap(long, env, default_value = "https://api.twitter.com")]
    pub twitter_api_url: String,

    /// 自定义分级阈值 JSON 文件，未设置时使用内置阈值
    #[clap(long, env)]
    pub viral_thresholds_file: Option<String>,

    /// 互动监控的 cron 表达式（秒 分 时 日 月 周）
    #[clap(long, env, default_value = "0 */15 * * * *")]
    pub monitor_cron: String,

    /// 私信中领取页面的站点地址
    #[clap(long, env, default_value = "http://localhost:3000")]
    pub claim_base_url: String,

    /// 领取签名消息的有效期（秒），0 表示不检查时效
    #[clap(long, env, default_value = "300")]
    pub claim_message_ttl_secs: u64,

    /// 允许的客户端时钟偏差（秒）
    #[clap(long, env, default_value = "30")]
    pub claim_clock_skew_secs: u64,

    #[clap(long, env, default_value = "info")]
    pub rust_log: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        EnvLoader::load_env_file().ok();
        AppConfig::parse()
    }
}

impl AppConfig {
    /// 手动创建配置实例（用于测试）
    pub fn new_for_test() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            app_host: "0.0.0.0".to_string(),
            app_port: 8765,
            mongo_uri: std::env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db: std::env::var("MONGO_DB").unwrap_or_else(|_| "test_db".to_string()),
            twitter_bearer_token: None,
            twitter_api_url: "https://api.twitter.com".to_string(),
            viral_thresholds_file: None,
            monitor_cron: "0 */15 * * * *".to_string(),
            claim_base_url: "http://localhost:3000".to_string(),
            claim_message_ttl_secs: 300,
            claim_clock_skew_secs: 30,
            rust_log: "info".to_string(),
        }
    }

    /// 领取消息有效期，0 视为关闭
    pub fn claim_message_ttl(&self) -> Option<std::time::Duration> {
        match self.claim_message_ttl_secs {
            0 => None,
            secs => Some(std::time::Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_file_selection() {
        assert_eq!(EnvLoader::env_file_for("prod"), ".env.production");
        assert_eq!(EnvLoader::env_file_for("Development"), ".env.development");
        assert_eq!(EnvLoader::env_file_for("test"), ".env.test");
        assert_eq!(EnvLoader::env_file_for("staging"), ".env.development");
    }

    #[test]
    fn test_parse_from_args() {
        let config = AppConfig::parse_from([
            "solspace",
            "--cargo-env",
            "production",
            "--mongo-db",
            "solspace",
            "--claim-message-ttl-secs",
            "0",
        ]);

        assert_eq!(config.cargo_env, CargoEnv::Production);
        assert_eq!(config.app_port, 8000);
        assert_eq!(config.monitor_cron, "0 */15 * * * *");
        assert!(config.claim_message_ttl().is_none());
    }

    #[test]
    fn test_config_for_test_has_ttl() {
        let config = AppConfig::new_for_test();
        assert_eq!(config.claim_message_ttl(), Some(std::time::Duration::from_secs(300)));
    }
}
