//! エラー型定義
//!
//! 共通レイヤーのエラー型（thiserror使用）

use thiserror::Error;

/// Common layer error type
#[derive(Debug, Error)]
pub enum CommonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<config::ConfigError> for CommonError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// A domain record could not be encoded to its canonical string form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("EncodingError: {message}")]
pub struct EncodingError {
    /// 失敗理由
    pub message: String,
}

impl EncodingError {
    /// エラーを作成
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for EncodingError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}
