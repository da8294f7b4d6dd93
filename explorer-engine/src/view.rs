//! FILENAME: explorer-engine/src/view.rs
//! Explorer View - Renderable output for the explorer UI.
//!
//! This module holds what a materialization pass publishes:
//! - The flattened, ordered node list (bar rows)
//! - Group buckets for collapsible group headers
//! - The hierarchy's max count for proportional bar widths
//! - Orphaned members that could not be placed in the tree

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::member;

// ============================================================================
// NODE
// ============================================================================

/// One materialized member of the explorer tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerNode {
    /// Display label.
    pub label: String,

    pub unique_name: String,

    /// Measure for this member in the base result.
    pub count: i64,

    /// Max count of the hierarchy at the time of the pass.
    pub maxcount: i64,

    /// Raw member name.
    pub value: String,

    /// uniqueName of the owning hierarchy.
    pub hierarchy: String,

    /// True for intermediate grouping members.
    pub is_group: bool,

    /// Group name: the owning group for leaves, the group's own name for groups.
    pub level: String,

    /// Structural depth derived from the uniqueName.
    pub lvl_depth: usize,

    pub collapsed: bool,

    pub ordinal: i64,

    pub level_unique_name: String,

    /// Measure within the selection scope; only set when a selection was merged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcount: Option<i64>,

    #[serde(default)]
    pub has_select: bool,
}

impl ExplorerNode {
    /// A bare node with its depth derived from `unique_name`.
    pub fn new(unique_name: impl Into<String>, label: impl Into<String>) -> Self {
        let unique_name = unique_name.into();
        let label = label.into();
        ExplorerNode {
            lvl_depth: member::depth(&unique_name),
            value: label.clone(),
            level: label.clone(),
            label,
            unique_name,
            count: 0,
            maxcount: 0,
            hierarchy: String::new(),
            is_group: false,
            collapsed: false,
            ordinal: -1,
            level_unique_name: String::new(),
            subcount: None,
            has_select: false,
        }
    }

    /// The synthetic "All" root for a hierarchy.
    pub fn root(hierarchy: &str) -> Self {
        let mut node = ExplorerNode::new(hierarchy, "All");
        node.hierarchy = hierarchy.to_string();
        node
    }
}

// ============================================================================
// PASS OUTPUT
// ============================================================================

/// A member whose parent could not be found while building the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanedNode {
    pub unique_name: String,
    pub lvl_depth: usize,
}

/// Running max count for one hierarchy. Only ever grows; every growth bumps
/// the version so consumers can tell a stale value from a fresh one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxCount {
    pub value: i64,
    pub version: u64,
}

impl MaxCount {
    pub fn new(value: i64) -> Self {
        MaxCount { value, version: 0 }
    }

    /// Folds in a newly observed count.
    pub fn observe(self, candidate: i64) -> MaxCount {
        if candidate > self.value {
            MaxCount {
                value: candidate,
                version: self.version + 1,
            }
        } else {
            self
        }
    }
}

/// Everything one materialization pass publishes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerView {
    pub hierarchy: String,

    /// Preorder render list (synthetic root excluded).
    pub nodes: Vec<ExplorerNode>,

    /// Group name -> leaves bucketed under that group.
    pub custom_groups: BTreeMap<String, Vec<ExplorerNode>>,

    /// Max count published for this pass (0 for a discarded group-only pass).
    pub max_count: i64,

    /// The hierarchy's running max after this pass.
    pub running_max: MaxCount,

    /// Set when a selection result was merged and a highlight pass may run.
    pub selection_ready: bool,

    pub orphans: Vec<OrphanedNode>,
}

impl ExplorerView {
    pub fn empty(hierarchy: impl Into<String>) -> Self {
        ExplorerView {
            hierarchy: hierarchy.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, unique_name: &str) -> Option<&ExplorerNode> {
        self.nodes.iter().find(|n| n.unique_name == unique_name)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.label.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_derives_depth() {
        let node = ExplorerNode::new("[Race].[Asian].[Japanese]", "Japanese");
        assert_eq!(node.lvl_depth, 2);
        assert_eq!(ExplorerNode::root("[Race]").lvl_depth, 0);
    }

    #[test]
    fn test_max_count_only_grows() {
        let max = MaxCount::new(10);
        let same = max.observe(4);
        assert_eq!(same, max);

        let grown = same.observe(25);
        assert_eq!(grown.value, 25);
        assert_eq!(grown.version, 1);
    }

    #[test]
    fn test_node_serializes_camel_case() {
        let mut node = ExplorerNode::new("[Race].[Asian]", "Asian");
        node.subcount = Some(3);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["lvlDepth"], 1);
        assert_eq!(json["uniqueName"], "[Race].[Asian]");
        assert_eq!(json["subcount"], 3);
        assert!(json.get("maxcount").is_some());

        node.subcount = None;
        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("subcount").is_none());
    }
}
