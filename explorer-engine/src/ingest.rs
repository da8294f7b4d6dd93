//! FILENAME: explorer-engine/src/ingest.rs
//! Result Ingestor - turns one query response into a published ExplorerView.
//!
//! Algorithm:
//! 1. Resolve the target levels, the grouping level and the pass-wide sort strategy
//! 2. Scan positions in server order (row 0 is "All" and is skipped)
//! 3. Filter empty, identity-level and null members
//! 4. Classify group vs leaf rows; leaves belong to the last group seen
//! 5. Build the node, insert it into the tree, bucket it, ask the collapse policy
//! 6. Discard group-only passes, otherwise flatten and publish

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::collapse::CollapsePolicy;
use crate::config::ExplorerConfig;
use crate::definition::{Hierarchy, Level, Position, QueryResult};
use crate::error::ExplorerError;
use crate::member;
use crate::sort::SortStrategy;
use crate::tree::{ExplorerTree, NodeId};
use crate::view::{ExplorerNode, ExplorerView, MaxCount, OrphanedNode};

// ============================================================================
// GROUP SCAN
// ============================================================================

/// Which group owns the leaf rows currently being scanned.
/// Only a group-classified row moves the scan to a new group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GroupScan {
    #[default]
    NoActiveGroup,
    ActiveGroup(String),
}

impl GroupScan {
    pub fn enter_group(&mut self, name: &str) {
        *self = GroupScan::ActiveGroup(name.to_string());
    }

    pub fn active_group(&self) -> Option<&str> {
        match self {
            GroupScan::NoActiveGroup => None,
            GroupScan::ActiveGroup(name) => Some(name),
        }
    }

    /// Bucket key for leaves; leaves seen before any group share the "" bucket.
    pub fn bucket_key(&self) -> &str {
        self.active_group().unwrap_or("")
    }
}

// ============================================================================
// LEVEL LAYOUT
// ============================================================================

/// How the target levels split into (All), optional group, leaf and optional
/// subject-identity levels.
#[derive(Debug, Clone, Copy)]
struct LevelLayout<'a> {
    group_level: Option<&'a Level>,
    leaf_level: Option<&'a Level>,
}

impl<'a> LevelLayout<'a> {
    fn new(levels: &'a [Level], subject_level_name: &str) -> Self {
        let has_subject_level = !subject_level_name.is_empty()
            && levels.last().map(|l| l.name.as_str()) == Some(subject_level_name);
        let minimal_len = if has_subject_level { 3 } else { 2 };
        let has_group_level = levels.len() > minimal_len;

        if has_group_level {
            LevelLayout {
                group_level: levels.get(1),
                leaf_level: levels.get(2),
            }
        } else {
            LevelLayout {
                group_level: None,
                leaf_level: levels.get(1),
            }
        }
    }

    fn is_group(&self, position: &Position) -> bool {
        self.group_level
            .map(|group| group.id == position.level.id)
            .unwrap_or(false)
    }

    /// The level whose declared strategy orders the whole pass.
    fn sort_level(&self) -> Option<&'a Level> {
        self.group_level.or(self.leaf_level)
    }
}

/// Levels of the hierarchy being explored. A cross-dimension query carries
/// the explored hierarchy as its second dimension.
fn target_levels<'a>(hierarchy: &'a Hierarchy, base: &'a QueryResult) -> &'a [Level] {
    let dimensions = &base.metadata.cube.dimensions;
    if dimensions.len() > 1 {
        if let Some(h) = dimensions[1].hierarchies.first() {
            return &h.levels;
        }
    }
    &hierarchy.levels
}

// ============================================================================
// SELECTION SUB-COUNTS
// ============================================================================

/// uniqueName -> measure over a selection result.
#[derive(Debug, Default)]
pub struct SelectionIndex<'a> {
    values: FxHashMap<&'a str, i64>,
}

impl<'a> SelectionIndex<'a> {
    pub fn new(result: &'a QueryResult) -> Self {
        let values = (0..result.row_positions().len())
            .filter_map(|x| {
                result
                    .position(x)
                    .map(|p| (p.unique_name.as_str(), result.count_at(x)))
            })
            .collect();
        SelectionIndex { values }
    }

    /// Sum of the selection measures at `unique_name` and below. A selected
    /// member already covers its descendants, so only the shallowest matches count.
    pub fn subcount(&self, unique_name: &str) -> i64 {
        self.values
            .iter()
            .filter(|(name, _)| member::is_self_or_descendant(name, unique_name))
            .filter(|(name, _)| !self.has_selected_ancestor_below(name, unique_name))
            .map(|(_, value)| *value)
            .sum()
    }

    fn has_selected_ancestor_below(&self, name: &str, top: &str) -> bool {
        let mut current = member::parent_unique_name(name);
        while let Some(ancestor) = current {
            if !member::is_self_or_descendant(ancestor, top) {
                return false;
            }
            if self.values.contains_key(ancestor) {
                return true;
            }
            current = member::parent_unique_name(ancestor);
        }
        false
    }
}

// ============================================================================
// INGESTOR
// ============================================================================

/// The inputs of one materialization pass.
#[derive(Debug, Clone, Copy)]
pub struct PassInput<'a> {
    pub hierarchy: &'a Hierarchy,
    pub base: &'a QueryResult,
    pub selection: Option<&'a QueryResult>,
    pub show_empty: bool,
    /// The hierarchy's running max before this pass.
    pub max_count: MaxCount,
}

pub struct ResultIngestor<'a> {
    config: &'a ExplorerConfig,
    collapse: &'a dyn CollapsePolicy,
}

impl<'a> ResultIngestor<'a> {
    pub fn new(config: &'a ExplorerConfig, collapse: &'a dyn CollapsePolicy) -> Self {
        ResultIngestor { config, collapse }
    }

    /// Runs one pass to completion.
    pub fn materialize(&self, input: &PassInput<'_>) -> Result<ExplorerView, ExplorerError> {
        let hierarchy_name = input.hierarchy.unique_name();
        let levels = target_levels(input.hierarchy, input.base);
        if levels.is_empty() {
            return Err(ExplorerError::MissingLevels {
                hierarchy: hierarchy_name.to_string(),
            });
        }

        let layout = LevelLayout::new(levels, &self.config.subject_level_name);
        let strategy = SortStrategy::for_level(layout.sort_level());
        let comparator = strategy.comparator();

        let base = input.base;
        let positions = base.row_positions();
        let running = input.max_count.observe(base.max_member_count());
        let seed_collapsed = positions.len() > self.config.auto_collapse_threshold;
        let selection = input.selection.map(SelectionIndex::new);

        log::debug!(
            target: "EXPLORER",
            "materialize hierarchy={} positions={} strategy={} selection={}",
            hierarchy_name,
            positions.len(),
            strategy,
            selection.is_some()
        );

        let mut tree = ExplorerTree::new(hierarchy_name);
        let mut scan = GroupScan::default();
        let mut buckets: BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
        let mut orphans = Vec::new();
        let mut last_group: Option<NodeId> = None;
        let mut saw_leaf = false;

        for x in 1..positions.len() {
            let Some(position) = base.position(x) else {
                continue;
            };
            let count = base.count_at(x);
            if self.is_hidden(position, count, input.show_empty) {
                continue;
            }

            let is_group = layout.is_group(position);
            if is_group {
                scan.enter_group(&position.name);
            }

            let mut node = ExplorerNode {
                label: member::member_label(&position.name, self.config),
                unique_name: position.unique_name.clone(),
                count,
                maxcount: running.value,
                value: position.name.clone(),
                hierarchy: hierarchy_name.to_string(),
                is_group,
                level: position.name.clone(),
                lvl_depth: member::depth(&position.unique_name),
                collapsed: seed_collapsed && scan.active_group().is_some(),
                ordinal: position.ordinal,
                level_unique_name: position.level.unique_name.clone(),
                subcount: selection.as_ref().map(|s| s.subcount(&position.unique_name)),
                has_select: selection.is_some(),
            };
            if !is_group {
                node.level = scan.bucket_key().to_string();
            }

            let id = match tree.insert(node, comparator) {
                Ok(id) => id,
                Err(ExplorerError::MalformedPosition { unique_name, depth }) => {
                    log::warn!(
                        target: "EXPLORER",
                        "dropping orphan {} (depth {}) in {}",
                        unique_name,
                        depth,
                        hierarchy_name
                    );
                    orphans.push(OrphanedNode {
                        unique_name,
                        lvl_depth: depth,
                    });
                    continue;
                }
                Err(err) => return Err(err),
            };

            if is_group {
                buckets.entry(position.name.clone()).or_default();
            } else {
                saw_leaf = true;
                buckets
                    .entry(scan.bucket_key().to_string())
                    .or_default()
                    .push(id);
            }

            let collapsed = tree
                .get(id)
                .map(|n| self.collapse.check_collapse(n))
                .unwrap_or(false);
            if let Some(n) = tree.get_mut(id) {
                n.collapsed = collapsed;
            }
            if is_group {
                last_group = Some(id);
            } else if let Some(group) = last_group.and_then(|g| tree.get_mut(g)) {
                // Each leaf overwrites its group's flag; the last leaf wins.
                group.collapsed = collapsed;
            }
        }

        let mut view = ExplorerView::empty(hierarchy_name);
        view.running_max = running;
        view.selection_ready = input.selection.is_some();
        view.orphans = orphans;

        if !saw_leaf {
            log::debug!(target: "EXPLORER", "group-only result for {}, discarding", hierarchy_name);
            return Ok(view);
        }

        view.nodes = tree.flatten();
        view.custom_groups = buckets
            .into_iter()
            .map(|(group, ids)| {
                let nodes = ids.iter().filter_map(|&id| tree.get(id).cloned()).collect();
                (group, nodes)
            })
            .collect();
        view.max_count = running.value;

        Ok(view)
    }

    /// Empty rows (unless requested), identity-level rows and the null member never become nodes.
    fn is_hidden(&self, position: &Position, count: i64, show_empty: bool) -> bool {
        let subject = &self.config.subject_level_name;
        (!show_empty && count == 0)
            || (!subject.is_empty() && position.level.name == *subject)
            || position.name == self.config.null_member
    }
}

/// Runs a single pass with the given collapse policy.
pub fn materialize(
    input: &PassInput<'_>,
    config: &ExplorerConfig,
    collapse: &dyn CollapsePolicy,
) -> Result<ExplorerView, ExplorerError> {
    ResultIngestor::new(config, collapse).materialize(input)
}
