//! ロギング初期化ユーティリティ
//!
//! Installs a `tracing-subscriber` fmt subscriber. The filter comes from
//! `SOTCONDUIT_LOG_LEVEL` (fallback `RUST_LOG`, default `info`). When
//! `SOTCONDUIT_LOG_DIR` is set, a daily rolling file layer is added as well.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::get_env_with_fallback_or;

/// ログファイル名のプレフィックス
const LOG_FILE_PREFIX: &str = "sotconduit.log";

/// Log settings resolved from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// EnvFilter directive (e.g. `info,sotconduit=debug`)
    pub filter: String,
    /// Directory for rolling log files
    pub log_dir: Option<PathBuf>,
}

impl LogConfig {
    /// Read log settings from the environment
    pub fn from_env() -> Self {
        let filter = get_env_with_fallback_or("SOTCONDUIT_LOG_LEVEL", "RUST_LOG", "info");
        let log_dir = std::env::var("SOTCONDUIT_LOG_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        Self { filter, log_dir }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize logging from the environment
///
/// The returned guard must be held for the lifetime of the process when a
/// file layer is active, otherwise buffered lines are lost.
pub fn init() -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    init_with(&LogConfig::from_env())
}

/// Initialize logging with explicit settings
pub fn init_with(
    config: &LogConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let stdout_layer = fmt::layer().with_target(true);

    match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_ansi(false).with_writer(writer);
            tracing_subscriber::registry()
                .with(config.env_filter())
                .with(stdout_layer)
                .with(file_layer)
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(config.env_filter())
                .with(stdout_layer)
                .try_init()?;
            Ok(None)
        }
    }
}
