//! FILENAME: explorer-engine/src/tree.rs
//! Explorer Tree - rooted member tree rebuilt on every pass.
//!
//! Positions carry no parent pointers; a member's parent is the member one
//! level up whose uniqueName prefixes its own. Nodes live in an arena and a
//! `uniqueName -> NodeId` index makes parent discovery a single lookup.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::ExplorerError;
use crate::member;
use crate::sort::NodeComparator;
use crate::view::ExplorerNode;

/// Index of a node in the tree arena.
pub type NodeId = usize;

/// The synthetic "All" root always occupies the first slot.
pub const ROOT: NodeId = 0;

#[derive(Debug, Clone)]
struct TreeSlot {
    node: ExplorerNode,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 8]>,
}

#[derive(Debug, Clone)]
pub struct ExplorerTree {
    slots: Vec<TreeSlot>,
    index: FxHashMap<String, NodeId>,
}

impl ExplorerTree {
    /// Creates a tree holding only the synthetic depth-0 root.
    pub fn new(root_name: &str) -> Self {
        let root = ExplorerNode::root(root_name);
        let mut index = FxHashMap::default();
        index.insert(root.unique_name.clone(), ROOT);

        ExplorerTree {
            slots: vec![TreeSlot {
                node: root,
                parent: None,
                children: SmallVec::new(),
            }],
            index,
        }
    }

    /// Places `node` under its direct parent and re-sorts that parent's
    /// children with `comparator` (None keeps insertion order).
    ///
    /// Fails with `MalformedPosition` when no member one level up owns the
    /// node's uniqueName; the tree is left untouched in that case.
    pub fn insert(
        &mut self,
        node: ExplorerNode,
        comparator: Option<NodeComparator>,
    ) -> Result<NodeId, ExplorerError> {
        let parent_id = self.find_parent(&node).ok_or_else(|| ExplorerError::MalformedPosition {
            unique_name: node.unique_name.clone(),
            depth: node.lvl_depth,
        })?;

        let id = self.slots.len();
        self.index.entry(node.unique_name.clone()).or_insert(id);
        self.slots.push(TreeSlot {
            node,
            parent: Some(parent_id),
            children: SmallVec::new(),
        });

        let mut siblings = std::mem::take(&mut self.slots[parent_id].children);
        siblings.push(id);
        if let Some(cmp) = comparator {
            let slots = &self.slots;
            siblings.sort_by(|&a, &b| cmp(&slots[a].node, &slots[b].node));
        }
        self.slots[parent_id].children = siblings;

        Ok(id)
    }

    fn find_parent(&self, node: &ExplorerNode) -> Option<NodeId> {
        if node.lvl_depth == 0 {
            return None;
        }
        let parent_name = member::parent_unique_name(&node.unique_name)?;
        let parent_id = *self.index.get(parent_name)?;
        let parent = &self.slots[parent_id].node;

        (parent.lvl_depth + 1 == node.lvl_depth).then_some(parent_id)
    }

    pub fn root(&self) -> &ExplorerNode {
        &self.slots[ROOT].node
    }

    pub fn get(&self, id: NodeId) -> Option<&ExplorerNode> {
        self.slots.get(id).map(|slot| &slot.node)
    }

    /// Mutable access for the collapse pass; structural fields must not change.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut ExplorerNode> {
        self.slots.get_mut(id).map(|slot| &mut slot.node)
    }

    pub fn lookup(&self, unique_name: &str) -> Option<NodeId> {
        self.index.get(unique_name).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(id).and_then(|slot| slot.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slots
            .get(id)
            .map(|slot| slot.children.as_slice())
            .unwrap_or(&[])
    }

    /// Number of inserted nodes, not counting the root.
    pub fn len(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // FLATTENING
    // ========================================================================

    /// Preorder ids of every node except the root, in current child order.
    pub fn flatten_ids(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len());
        self.collect_preorder(ROOT, &mut out);
        out
    }

    /// Preorder render list of every node except the root.
    pub fn flatten(&self) -> Vec<ExplorerNode> {
        self.flatten_ids()
            .into_iter()
            .map(|id| self.slots[id].node.clone())
            .collect()
    }

    fn collect_preorder(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.slots[id].children {
            out.push(child);
            self.collect_preorder(child, out);
        }
    }
}
