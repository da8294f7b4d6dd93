//! FILENAME: explorer-engine/src/collapse.rs
//! Collapse policy - decides each node's initial expand state.

use rustc_hash::FxHashMap;

use crate::view::ExplorerNode;

/// Supplies the initial `collapsed` flag for a freshly built node.
pub trait CollapsePolicy {
    fn check_collapse(&self, node: &ExplorerNode) -> bool;
}

/// Keeps the seeded flag as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededCollapse;

impl CollapsePolicy for SeededCollapse {
    fn check_collapse(&self, node: &ExplorerNode) -> bool {
        node.collapsed
    }
}

/// Remembers the user's expand/collapse toggles across passes.
/// Untracked nodes keep their seeded flag.
#[derive(Debug, Clone, Default)]
pub struct CollapseTracker {
    tracked: FxHashMap<String, bool>,
}

impl CollapseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key identifying a node across passes: hierarchy, group and raw member name.
    pub fn collapse_key(node: &ExplorerNode) -> String {
        format!("{}-{}-{}", node.hierarchy, node.level, node.value)
    }

    pub fn set_collapse(&mut self, node: &ExplorerNode, collapsed: bool) {
        self.tracked.insert(Self::collapse_key(node), collapsed);
    }

    pub fn tracked(&self, node: &ExplorerNode) -> Option<bool> {
        self.tracked.get(&Self::collapse_key(node)).copied()
    }
}

impl CollapsePolicy for CollapseTracker {
    fn check_collapse(&self, node: &ExplorerNode) -> bool {
        self.tracked(node).unwrap_or(node.collapsed)
    }
}

impl<F> CollapsePolicy for F
where
    F: Fn(&ExplorerNode) -> bool,
{
    fn check_collapse(&self, node: &ExplorerNode) -> bool {
        self(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(value: &str, collapsed: bool) -> ExplorerNode {
        let mut node = ExplorerNode::new(format!("[Race].[Group].[{}]", value), value);
        node.hierarchy = "[Race]".to_string();
        node.level = "Group".to_string();
        node.collapsed = collapsed;
        node
    }

    #[test]
    fn test_untracked_keeps_seed() {
        let tracker = CollapseTracker::new();
        assert!(tracker.check_collapse(&node("Asian", true)));
        assert!(!tracker.check_collapse(&node("Asian", false)));
    }

    #[test]
    fn test_tracked_overrides_seed() {
        let mut tracker = CollapseTracker::new();
        tracker.set_collapse(&node("Asian", false), true);

        assert!(tracker.check_collapse(&node("Asian", false)));
        assert_eq!(CollapseTracker::collapse_key(&node("Asian", false)), "[Race]-Group-Asian");
        assert!(!tracker.check_collapse(&node("White", false)));
    }

    #[test]
    fn test_closure_policy() {
        let policy = |n: &ExplorerNode| n.is_group;
        assert!(!policy.check_collapse(&node("Asian", true)));
    }
}
