//! 分類トークンの生成

use sotconduit_common::protocol::{topic_kind, ClassificationToken};
use sotconduit_common::types::HierarchicalName;

/// Default definer of resource classifications
pub const DEFAULT_DEFINER: &str = "FHIR";

/// Category segment shared by every resource classification
pub const RESOURCE_CATEGORY: &str = "Resources";

/// Builds `[DatasetDefiner=<definer>].[DatasetCategory=Resources].[DatasetResource=<type>]`
/// classification tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationTokenBuilder {
    definer: String,
}

impl Default for ClassificationTokenBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_DEFINER)
    }
}

impl ClassificationTokenBuilder {
    /// 定義者を指定して作成
    pub fn new(definer: impl Into<String>) -> Self {
        Self {
            definer: definer.into(),
        }
    }

    /// 定義者
    pub fn definer(&self) -> &str {
        &self.definer
    }

    /// Token for `resource_type` at `version`
    pub fn build(&self, resource_type: &str, version: &str) -> ClassificationToken {
        let mut identifier = HierarchicalName::root(topic_kind::DEFINER, self.definer.as_str());
        identifier.append(topic_kind::CATEGORY, RESOURCE_CATEGORY);
        identifier.append(topic_kind::RESOURCE, resource_type);
        ClassificationToken {
            identifier,
            version: version.to_string(),
        }
    }
}
