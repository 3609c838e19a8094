//! SoT Conduit Gatekeeper
//!
//! Source-of-truth への全アクセスを監査トランザクションで囲むゲートキーパー

#![warn(missing_docs)]

/// 監査トランザクション（マネージャー、ブローカー、トレイル）
pub mod audit;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// ドメインレコードのエンコード
pub mod encoding;

/// エラー型
pub mod error;

/// Gatekeeper本体とSource-of-truthフック
pub mod gatekeeper;

/// ロギング初期化ユーティリティ
pub mod logging;

/// ランタイム構築
pub mod runtime;

/// トポロジー（アクセサーID）管理
pub mod topology;

pub use audit::AuditManager;
pub use gatekeeper::{Gatekeeper, SourceOfTruth};
pub use runtime::ConduitRuntime;
pub use topology::IdentityResolver;
