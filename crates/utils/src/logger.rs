use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::CargoEnv;

pub struct Logger;
impl Logger {
    pub fn new(cargo_env: CargoEnv, default_level: &str) -> WorkerGuard {
        Self::new_with_log_dir(cargo_env, default_level, None)
    }

    pub fn new_with_log_dir(cargo_env: CargoEnv, default_level: &str, log_dir: Option<PathBuf>) -> WorkerGuard {
        let (non_blocking, guard) = match cargo_env {
            CargoEnv::Development => tracing_appender::non_blocking(std::io::stdout()),
            CargoEnv::Production => {
                let mut log_directory = Self::get_log_directory(log_dir);

                // 确保日志目录存在
                if let Err(e) = std::fs::create_dir_all(&log_directory) {
                    eprintln!("⚠️ 无法创建日志目录 {:?}: {}，回退到 ./logs", log_directory, e);
                    log_directory = PathBuf::from("logs");
                    std::fs::create_dir_all(&log_directory).ok();
                }

                println!("✅ 日志将输出到目录: {:?}", log_directory);
                let file_logger = tracing_appender::rolling::daily(&log_directory, "log");
                tracing_appender::non_blocking(file_logger)
            }
        };

        // env var: `RUST_LOG` 优先，否则使用配置中的级别
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{},tower_http=debug", default_level).into());

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false),
            )
            .init();

        guard
    }

    fn get_log_directory(log_dir: Option<PathBuf>) -> PathBuf {
        // 1. 优先使用传入的参数
        if let Some(dir) = log_dir {
            return dir;
        }

        // 2. 检查环境变量 LOG_DIR
        if let Ok(log_dir_env) = std::env::var("LOG_DIR") {
            return PathBuf::from(log_dir_env);
        }

        // 3. 可执行文件目录
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                return exe_dir.join("logs");
            }
        }

        // 4. 回退到当前工作目录
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("logs")
    }
}
