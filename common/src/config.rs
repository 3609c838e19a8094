//! 設定管理
//!
//! ConduitConfig設定構造体

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::CommonError;

/// Environment variable prefix read by [`ConduitConfig::load`]
pub const ENV_PREFIX: &str = "SOTCONDUIT";

/// Gatekeeper設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConduitConfig {
    /// アクセサーを配置するワークショップ名 (デフォルト: "Edge")
    #[serde(default = "default_workshop_name")]
    pub workshop_name: String,

    /// 分類トークンの定義者 (デフォルト: "FHIR")
    #[serde(default = "default_classification_definer")]
    pub classification_definer: String,

    /// リソースのデフォルトバージョン (デフォルト: "4.0.1")
    #[serde(default = "default_resource_version")]
    pub default_version: String,

    /// 監査ブローカー呼び出しのタイムアウト（ミリ秒）(デフォルト: 5000)
    #[serde(default = "default_broker_timeout_ms")]
    pub broker_timeout_ms: u64,

    /// 監査ライターのフラッシュ間隔（秒）(デフォルト: 30)
    #[serde(default = "default_writer_flush_interval")]
    pub writer_flush_interval_secs: u64,

    /// 監査ライターのバッファ上限 (デフォルト: 10000)
    #[serde(default = "default_writer_buffer_capacity")]
    pub writer_buffer_capacity: usize,
}

fn default_workshop_name() -> String {
    "Edge".to_string()
}

fn default_classification_definer() -> String {
    "FHIR".to_string()
}

fn default_resource_version() -> String {
    "4.0.1".to_string()
}

fn default_broker_timeout_ms() -> u64 {
    5_000
}

fn default_writer_flush_interval() -> u64 {
    30
}

fn default_writer_buffer_capacity() -> usize {
    10_000
}

impl Default for ConduitConfig {
    fn default() -> Self {
        Self {
            workshop_name: default_workshop_name(),
            classification_definer: default_classification_definer(),
            default_version: default_resource_version(),
            broker_timeout_ms: default_broker_timeout_ms(),
            writer_flush_interval_secs: default_writer_flush_interval(),
            writer_buffer_capacity: default_writer_buffer_capacity(),
        }
    }
}

impl ConduitConfig {
    /// Load configuration from an optional file layered with `SOTCONDUIT_*`
    /// environment variables (environment wins).
    pub fn load(path: Option<&Path>) -> Result<Self, CommonError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the gatekeeper cannot run with
    pub fn validate(&self) -> Result<(), CommonError> {
        if self.workshop_name.trim().is_empty() {
            return Err(CommonError::Validation(
                "workshop_name must not be empty".to_string(),
            ));
        }
        if self.broker_timeout_ms == 0 {
            return Err(CommonError::Validation(
                "broker_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.writer_buffer_capacity == 0 {
            return Err(CommonError::Validation(
                "writer_buffer_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// ブローカータイムアウト
    pub fn broker_timeout(&self) -> Duration {
        Duration::from_millis(self.broker_timeout_ms)
    }

    /// ライターのフラッシュ間隔
    pub fn writer_flush_interval(&self) -> Duration {
        Duration::from_secs(self.writer_flush_interval_secs)
    }
}
