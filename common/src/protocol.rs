//! 監査プロトコル定義
//!
//! Work unit envelopes, payload classification and the uniform result-set
//! envelope exchanged between the gatekeeper and the audit broker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{HierarchicalName, Resource};

/// Segment kinds of a classification token identifier
pub mod topic_kind {
    /// データセット定義者
    pub const DEFINER: &str = "DatasetDefiner";
    /// データセットカテゴリ
    pub const CATEGORY: &str = "DatasetCategory";
    /// データセットサブカテゴリ
    pub const SUBCATEGORY: &str = "DatasetSubcategory";
    /// データセットリソース
    pub const RESOURCE: &str = "DatasetResource";
}

/// Placeholder used in result summaries for entries without an id
pub const RESOURCE_HAS_NO_ID: &str = "[Resource Has No Id]";

/// (type, version) tag describing the semantic shape of a payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ClassificationToken {
    /// 階層識別子
    pub identifier: HierarchicalName,
    /// バージョン
    pub version: String,
}

impl ClassificationToken {
    /// Reserved classification for payloads that failed to encode
    pub fn encoding_error() -> Self {
        let mut identifier = HierarchicalName::root(topic_kind::DEFINER, "AETHER");
        identifier.append(topic_kind::CATEGORY, "DataTypes");
        identifier.append(topic_kind::SUBCATEGORY, "Error");
        identifier.append(topic_kind::RESOURCE, "JSONConversionErrorMessage");
        Self {
            identifier,
            version: "1.0.0".to_string(),
        }
    }

    /// True for the reserved encoding-error classification
    pub fn is_encoding_error(&self) -> bool {
        *self == Self::encoding_error()
    }

    /// Resource name (leaf segment value)
    pub fn resource_name(&self) -> &str {
        self.identifier
            .leaf()
            .map(|s| s.value.as_str())
            .unwrap_or_default()
    }
}

/// ペイロード（文字列＋分類トークン）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payload {
    /// 本文
    pub content: String,
    /// 分類トークン
    pub classification: ClassificationToken,
}

impl Payload {
    /// ペイロードを作成
    pub fn new(content: impl Into<String>, classification: ClassificationToken) -> Self {
        Self {
            content: content.into(),
            classification,
        }
    }
}

/// Processing outcome of a work unit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkUnitOutcome {
    /// 未着手
    #[default]
    NotStarted,
    /// 成功
    Success,
    /// 失敗
    Failed,
}

impl WorkUnitOutcome {
    /// 文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for WorkUnitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The audited record of one access operation.
///
/// Holds the ingress payload, zero or more egress payloads and the outcome.
/// Only the audit manager mutates a work unit once it has been opened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkUnit {
    id: Uuid,
    created_at: DateTime<Utc>,
    ingress: Payload,
    #[serde(default)]
    egress: Vec<Payload>,
    outcome: WorkUnitOutcome,
}

impl WorkUnit {
    /// Work unit with the given ingress payload, not started
    pub fn new(ingress: Payload) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            ingress,
            egress: Vec::new(),
            outcome: WorkUnitOutcome::NotStarted,
        }
    }

    /// Work unit that is already failed on creation
    pub fn failed(ingress: Payload) -> Self {
        let mut unit = Self::new(ingress);
        unit.outcome = WorkUnitOutcome::Failed;
        unit
    }

    /// ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 作成日時
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 入力ペイロード
    pub fn ingress(&self) -> &Payload {
        &self.ingress
    }

    /// 出力ペイロード一覧
    pub fn egress(&self) -> &[Payload] {
        &self.egress
    }

    /// 最後の出力ペイロード
    pub fn last_egress(&self) -> Option<&Payload> {
        self.egress.last()
    }

    /// 処理結果
    pub fn outcome(&self) -> WorkUnitOutcome {
        self.outcome
    }

    // 以下2つは監査マネージャー専用

    #[doc(hidden)]
    pub fn push_egress(&mut self, payload: Payload) {
        self.egress.push(payload);
    }

    #[doc(hidden)]
    pub fn set_outcome(&mut self, outcome: WorkUnitOutcome) {
        self.outcome = outcome;
    }
}

/// 結果セット種別
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResultSetType {
    /// 検索結果
    #[default]
    Searchset,
}

impl ResultSetType {
    /// 文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Searchset => "searchset",
        }
    }
}

/// 検索エントリモード
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchEntryMode {
    /// 検索条件に一致
    #[default]
    Match,
}

/// エントリの検索メタデータ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchMeta {
    /// モード
    pub mode: SearchEntryMode,
    /// 関連度スコア
    pub score: f64,
}

impl Default for SearchMeta {
    fn default() -> Self {
        Self {
            mode: SearchEntryMode::Match,
            score: 1.0,
        }
    }
}

/// 結果セットのエントリ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultEntry {
    /// リソース
    pub resource: Resource,
    /// 検索メタデータ
    pub search: SearchMeta,
}

/// Uniform result-set envelope (a "searchset" bundle)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultSet {
    /// ID
    pub id: Uuid,
    /// 種別
    #[serde(rename = "type")]
    pub kind: ResultSetType,
    /// 生成時刻
    pub timestamp: DateTime<Utc>,
    /// 合計件数
    pub total: usize,
    /// エントリ一覧
    #[serde(default)]
    pub entries: Vec<ResultEntry>,
}

impl ResultSet {
    /// Search set with one MATCH entry (score 1) per resource, stamped now
    pub fn search_set(resources: impl IntoIterator<Item = Resource>) -> Self {
        let entries: Vec<ResultEntry> = resources
            .into_iter()
            .map(|resource| ResultEntry {
                resource,
                search: SearchMeta::default(),
            })
            .collect();
        Self {
            id: Uuid::new_v4(),
            kind: ResultSetType::Searchset,
            timestamp: Utc::now(),
            total: entries.len(),
            entries,
        }
    }

    /// 空の結果セット
    pub fn empty() -> Self {
        Self::search_set(Vec::new())
    }

    /// エントリ数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resources in entry order
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entries.iter().map(|e| &e.resource)
    }
}
