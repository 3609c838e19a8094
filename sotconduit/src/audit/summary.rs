//! 監査ペイロードのラベルとサマリー

use sotconduit_common::protocol::{ResultSet, RESOURCE_HAS_NO_ID};
use sotconduit_common::types::{AccessAction, SearchCriteria};

/// Prefix of the payload recorded when a record cannot be encoded
pub const ENCODING_ERROR_PREFIX: &str = "Error encoding content --> ";

/// Label prepended to the ingress payload
///
/// Search transactions carry their rendered criteria without a prefix.
pub fn begin_label(action: AccessAction) -> String {
    match action {
        AccessAction::Search => String::new(),
        _ => format!("Action: {} --> ", action.verb()),
    }
}

/// Label prepended to the egress payload of a successful transaction
pub fn end_label(action: AccessAction) -> String {
    format!("Action: {}, Result --> ", action.verb())
}

/// `Search Criteria(name-->value,...)`, or `Search Criteria(empty)`
pub fn render_criteria(criteria: &SearchCriteria) -> String {
    if criteria.is_empty() {
        return "Search Criteria(empty)".to_string();
    }
    let pairs: Vec<String> = criteria
        .iter()
        .map(|(name, value)| format!("{}-->{}", name, value))
        .collect();
    format!("Search Criteria({})", pairs.join(","))
}

/// Outcome summary of a search
pub fn render_result_summary(result_set: Option<&ResultSet>) -> String {
    let Some(result_set) = result_set else {
        return "Search Failed".to_string();
    };
    if result_set.is_empty() {
        return "Search Succeeded: Result Count = 0".to_string();
    }
    let ids: Vec<&str> = result_set
        .resources()
        .map(|r| r.non_empty_id().unwrap_or(RESOURCE_HAS_NO_ID))
        .collect();
    format!(
        "Search Succeeded: Result Count = {}: Entries --> {}",
        result_set.len(),
        ids.join(", ")
    )
}
