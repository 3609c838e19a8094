//! SoT Conduit 共通ライブラリ
//!
//! gatekeeperと監査ブローカー間で共有する型・設定・エラー

#![warn(missing_docs)]

/// 共通型定義
pub mod types;

/// 監査プロトコル定義
pub mod protocol;

/// 設定管理
pub mod config;

/// エラー型定義
pub mod error;
