//! 共通型定義
//!
//! Hierarchical names, topology nodes, component identities and the domain
//! record ([`Resource`]) that flows through the gatekeeper.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One typed, named segment of a [`HierarchicalName`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameSegment {
    /// セグメント種別（例: "Workshop"）
    pub kind: String,
    /// セグメント名（例: "Edge"）
    pub value: String,
}

impl NameSegment {
    /// Create a new segment
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for NameSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}={}]", self.kind, self.value)
    }
}

/// Ordered sequence of segments, root first.
///
/// Used both for topology node ids and classification token identifiers.
/// The string token (`Display`) is `[kind=value].[kind=value]...`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HierarchicalName {
    segments: Vec<NameSegment>,
}

impl HierarchicalName {
    /// 空の名前を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-segment name
    pub fn root(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            segments: vec![NameSegment::new(kind, value)],
        }
    }

    /// Append a segment in place
    pub fn append(&mut self, kind: impl Into<String>, value: impl Into<String>) {
        self.segments.push(NameSegment::new(kind, value));
    }

    /// Return a copy of this name with one more segment appended
    pub fn child(&self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        let mut name = self.clone();
        name.append(kind, value);
        name
    }

    /// セグメント一覧
    pub fn segments(&self) -> &[NameSegment] {
        &self.segments
    }

    /// 末端セグメント
    pub fn leaf(&self) -> Option<&NameSegment> {
        self.segments.last()
    }

    /// Name with the last segment removed, `None` for single-segment or empty names
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// セグメント数
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// String token of this name
    pub fn token(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for HierarchicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// トポロジーノード種別
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// ソリューション
    Solution,
    /// サイト
    Site,
    /// プロセッシングプラント
    ProcessingPlant,
    /// ワークショップ
    Workshop,
    /// Work Unit Processor（アクセサー）
    #[serde(rename = "WUP")]
    Wup,
}

impl NodeKind {
    /// Segment kind string used in hierarchical names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solution => "Solution",
            Self::Site => "Site",
            Self::ProcessingPlant => "ProcessingPlant",
            Self::Workshop => "Workshop",
            Self::Wup => "WUP",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 並行実行モード
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// 単一インスタンス
    #[default]
    Standalone,
    /// 並行実行
    Concurrent,
    /// オンデマンド起動
    OnDemand,
}

/// 耐障害モード
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResilienceMode {
    /// 単一構成
    #[default]
    Standalone,
    /// クラスタ構成
    Clustered,
    /// マルチサイト構成
    MultiSite,
}

/// Node element as persisted in the topology store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopologyNode {
    /// ノードID（階層名）
    pub id: HierarchicalName,
    /// ノード種別
    pub kind: NodeKind,
    /// バージョン
    pub version: String,
    /// 並行実行モード
    pub concurrency_mode: ConcurrencyMode,
    /// 耐障害モード
    pub resilience_mode: ResilienceMode,
    /// 稼働中フラグ
    pub instance_in_place: bool,
    /// 親ノードID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containing_element: Option<HierarchicalName>,
}

impl TopologyNode {
    /// Node with default modes, not yet in place
    pub fn new(id: HierarchicalName, kind: NodeKind, version: impl Into<String>) -> Self {
        let containing_element = id.parent();
        Self {
            id,
            kind,
            version: version.into(),
            concurrency_mode: ConcurrencyMode::default(),
            resilience_mode: ResilienceMode::default(),
            instance_in_place: false,
            containing_element,
        }
    }

    /// 並行実行モードを指定
    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    /// 耐障害モードを指定
    pub fn with_resilience(mut self, mode: ResilienceMode) -> Self {
        self.resilience_mode = mode;
        self
    }
}

/// Resolved identity of an accessing component (root → workshop → accessor)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentIdentity {
    /// 階層パス
    pub path: HierarchicalName,
    /// バージョン
    pub version: String,
    /// 親ワークショップから継承した並行実行モード
    pub concurrency_mode: ConcurrencyMode,
    /// 親ワークショップから継承した耐障害モード
    pub resilience_mode: ResilienceMode,
    /// 登録済みフラグ
    pub registered: bool,
    /// 親ワークショップID
    pub containing_element: HierarchicalName,
}

impl ComponentIdentity {
    /// Accessor name (the leaf segment value)
    pub fn name(&self) -> &str {
        self.path.leaf().map(|s| s.value.as_str()).unwrap_or_default()
    }

    /// String token of the identity path
    pub fn token(&self) -> String {
        self.path.token()
    }

    /// Topology node describing this identity
    pub fn to_node(&self) -> TopologyNode {
        TopologyNode {
            id: self.path.clone(),
            kind: NodeKind::Wup,
            version: self.version.clone(),
            concurrency_mode: self.concurrency_mode,
            resilience_mode: self.resilience_mode,
            instance_in_place: true,
            containing_element: Some(self.containing_element.clone()),
        }
    }
}

impl fmt::Display for ComponentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (v{})", self.path, self.version)
    }
}

/// Kind of access operation performed against a domain record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessAction {
    /// 作成
    Create,
    /// 参照
    Read,
    /// 更新
    Update,
    /// 削除
    Delete,
    /// 検索
    Search,
}

impl AccessAction {
    /// Label handed to the audit broker
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Search => "SEARCH",
        }
    }

    /// Human verb used in audit payload labels
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Read => "Get",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Search => "Search",
        }
    }
}

impl fmt::Display for AccessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain record (a FHIR-style resource)
///
/// Serializes as a JSON object carrying `resourceType`, the optional `id`,
/// then the body fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    /// リソース種別（例: "Patient"）
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    /// 論理ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 本体フィールド
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Resource {
    /// Empty resource of the given type
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            body: Map::new(),
        }
    }

    /// IDを設定
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// 本体フィールドを設定
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(name.into(), value.into());
        self
    }

    /// 空でないIDのみ返す
    pub fn non_empty_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// How a caller addresses a domain record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceKey {
    /// 論理ID
    Id(String),
    /// 業務識別子
    Identifier {
        /// 識別子体系（URI）
        #[serde(default, skip_serializing_if = "Option::is_none")]
        system: Option<String>,
        /// 識別子の値
        value: String,
    },
}

impl ResourceKey {
    /// 論理IDキーを作成
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// 業務識別子キーを作成
    pub fn identifier(system: Option<&str>, value: impl Into<String>) -> Self {
        Self::Identifier {
            system: system.map(str::to_string),
            value: value.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.write_str(id),
            Self::Identifier {
                system: Some(system),
                value,
            } => write!(f, "Identifier({}|{})", system, value),
            Self::Identifier {
                system: None,
                value,
            } => write!(f, "Identifier({})", value),
        }
    }
}

/// Insertion-ordered search criteria (property → value)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchCriteria {
    params: Vec<(String, String)>,
}

impl SearchCriteria {
    /// 空の検索条件
    pub fn new() -> Self {
        Self::default()
    }

    /// 条件を追加
    pub fn with(mut self, property: impl Into<String>, value: impl ToString) -> Self {
        self.push(property, value);
        self
    }

    /// 条件を追加（in place）
    pub fn push(&mut self, property: impl Into<String>, value: impl ToString) {
        self.params.push((property.into(), value.to_string()));
    }

    /// 値を取得
    pub fn get(&self, property: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.as_str())
    }

    /// (property, value) iterator in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 条件数
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for SearchCriteria {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut criteria = Self::new();
        for (k, v) in iter {
            criteria.push(k, v);
        }
        criteria
    }
}
