//! Property-based tests using proptest

use proptest::prelude::*;

use sotconduit::audit::{render_criteria, render_result_summary, ClassificationTokenBuilder};
use sotconduit::topology::resolver::accessor_path;
use sotconduit_common::protocol::ResultSet;
use sotconduit_common::types::{HierarchicalName, Resource, SearchCriteria};

fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9]{0,15}"
}

// ---------------------------------------------------------------------------
// accessor_path
// ---------------------------------------------------------------------------

proptest! {
    /// 同じ入力からは常に同じパス
    #[test]
    fn accessor_path_is_deterministic(
        plant in name_strategy(),
        workshop in name_strategy(),
        accessor in name_strategy(),
    ) {
        let root = HierarchicalName::root("ProcessingPlant", plant);
        let first = accessor_path(&root, &workshop, &accessor);
        let second = accessor_path(&root, &workshop, &accessor);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), 3);
        let expected_leaf = format!("[WUP=Accessor-{}]", accessor);
        prop_assert!(first.token().ends_with(&expected_leaf));
    }

    /// アクセサーの親は常にワークショップ
    #[test]
    fn accessor_parent_is_workshop(
        workshop in name_strategy(),
        accessor in name_strategy(),
    ) {
        let root = HierarchicalName::root("ProcessingPlant", "p");
        let path = accessor_path(&root, &workshop, &accessor);
        let parent = path.parent().unwrap();
        prop_assert_eq!(parent.leaf().unwrap().value.as_str(), workshop.as_str());
        prop_assert_eq!(parent.leaf().unwrap().kind.as_str(), "Workshop");
    }
}

// ---------------------------------------------------------------------------
// render_criteria / render_result_summary
// ---------------------------------------------------------------------------

proptest! {
    /// 全ての条件が順序通りに含まれ、末尾カンマが無い
    #[test]
    fn criteria_render_every_pair(
        pairs in prop::collection::vec((name_strategy(), name_strategy()), 1..8),
    ) {
        let criteria: SearchCriteria = pairs.iter().cloned().collect();
        let rendered = render_criteria(&criteria);
        let body: Vec<String> = pairs.iter().map(|(k, v)| format!("{}-->{}", k, v)).collect();
        prop_assert_eq!(rendered, format!("Search Criteria({})", body.join(",")));
    }

    /// 件数と全IDがサマリーに現れる
    #[test]
    fn result_summary_lists_every_id(
        ids in prop::collection::vec(name_strategy(), 1..12),
    ) {
        let set = ResultSet::search_set(
            ids.iter().map(|id| Resource::new("Patient").with_id(id.clone())),
        );
        let summary = render_result_summary(Some(&set));
        let expected_prefix =
            format!("Search Succeeded: Result Count = {}: Entries --> ", ids.len());
        prop_assert!(summary.starts_with(&expected_prefix));
        prop_assert_eq!(&summary[expected_prefix.len()..], ids.join(", "));
        prop_assert!(!summary.ends_with(", "));
    }

    /// 分類トークンは定義者・種別・バージョンを保持する
    #[test]
    fn classification_token_carries_inputs(
        definer in name_strategy(),
        resource in name_strategy(),
        version in "[0-9]\\.[0-9]\\.[0-9]",
    ) {
        let token = ClassificationTokenBuilder::new(definer.clone()).build(&resource, &version);
        prop_assert_eq!(token.resource_name(), resource.as_str());
        prop_assert_eq!(&token.version, &version);
        prop_assert_eq!(token.identifier.segments()[0].value.as_str(), definer.as_str());
        prop_assert!(!token.is_encoding_error());
    }
}
