// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation and topology management.
//!
//! A *node* is one occurrence of a document object in the projected tree.
//! Several nodes may realize the same object; they share that object's
//! [`ObjectRecord`](crate::record::ObjectRecord). Nodes are addressed by
//! generational [`NodeId`] handles; destroyed slots are recycled via a free
//! list.

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;

use crate::id::{DocumentId, INVALID, NodeId, ObjectId};

/// Whether the UI should draw an expander for a node that has not been
/// populated yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChildIndicator {
    /// The object claims children; show an expander.
    ShowIndicator,
    /// The object claims nothing.
    #[default]
    DontShowIndicator,
}

/// Struct-of-arrays storage for all nodes of a forest.
#[derive(Debug, Default)]
pub(crate) struct NodeStore {
    // -- Identity --
    pub(crate) owner: Vec<DocumentId>,
    pub(crate) object: Vec<ObjectId>,

    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) children: Vec<Vec<u32>>,

    // -- View state --
    pub(crate) populated: Vec<bool>,
    pub(crate) expanded: Vec<bool>,
    pub(crate) indicator: Vec<ChildIndicator>,

    // -- Transient selection annotation --
    pub(crate) selected_whole: Vec<bool>,
    pub(crate) selection_ancestor: Vec<bool>,
    pub(crate) sub_paths: Vec<BTreeSet<String>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Lifecycle tracking --
    pub(crate) pending_created: Vec<NodeId>,
    pub(crate) pending_destroyed: Vec<NodeId>,
}

impl NodeStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocates a detached, unpopulated node.
    pub(crate) fn create_node(&mut self, owner: DocumentId, object: ObjectId) -> u32 {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.owner[i] = owner;
            self.object[i] = object;
            self.parent[i] = INVALID;
            self.children[i].clear();
            self.populated[i] = false;
            self.expanded[i] = false;
            self.indicator[i] = ChildIndicator::default();
            self.selected_whole[i] = false;
            self.selection_ancestor[i] = false;
            self.sub_paths[i].clear();
            self.alive[i] = true;
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.owner.push(owner);
            self.object.push(object);
            self.parent.push(INVALID);
            self.children.push(Vec::new());
            self.populated.push(false);
            self.expanded.push(false);
            self.indicator.push(ChildIndicator::default());
            self.selected_whole.push(false);
            self.selection_ancestor.push(false);
            self.sub_paths.push(BTreeSet::new());
            self.generation.push(0);
            self.alive.push(true);
            idx
        };
        self.pending_created.push(self.id_of(idx));
        idx
    }

    /// Frees a node slot.
    ///
    /// # Panics
    ///
    /// Panics if the node still has children or a parent.
    pub(crate) fn destroy_node(&mut self, idx: u32) {
        let i = idx as usize;
        assert!(self.alive[i], "destroying a dead node slot {idx}");
        assert!(
            self.children[i].is_empty(),
            "cannot destroy node with children"
        );
        assert!(self.parent[i] == INVALID, "cannot destroy attached node");
        self.pending_destroyed.push(self.id_of(idx));
        // Bump generation so old handles immediately fail validation.
        self.generation[i] += 1;
        self.alive[i] = false;
        self.sub_paths[i].clear();
        self.free_list.push(idx);
    }

    /// Returns whether the given handle refers to a live node.
    pub(crate) fn is_alive(&self, id: NodeId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.alive[id.idx as usize]
    }

    /// Returns the current handle of a live slot.
    pub(crate) fn id_of(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            self.is_alive(id),
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Inserts a detached `child` into `parent`'s child list at `pos`
    /// (clamped to the list length).
    #[cfg(test)]
    pub(crate) fn insert_child(&mut self, parent: u32, pos: usize, child: u32) {
        debug_assert!(
            self.parent[child as usize] == INVALID,
            "child already has a parent"
        );
        let kids = &mut self.children[parent as usize];
        let pos = pos.min(kids.len());
        kids.insert(pos, child);
        self.parent[child as usize] = parent;
    }

    /// Removes `child` from its parent's child list, if attached.
    pub(crate) fn unlink_from_parent(&mut self, child: u32) {
        let p = self.parent[child as usize];
        if p == INVALID {
            return;
        }
        self.children[p as usize].retain(|&c| c != child);
        self.parent[child as usize] = INVALID;
    }

    /// Returns whether `ancestor` is `idx` or one of its ancestors.
    pub(crate) fn is_ancestor_or_self(&self, ancestor: u32, idx: u32) -> bool {
        let mut cur = idx;
        while cur != INVALID {
            if cur == ancestor {
                return true;
            }
            cur = self.parent[cur as usize];
        }
        false
    }

    /// Returns the root of the tree `idx` belongs to.
    pub(crate) fn root_of(&self, idx: u32) -> u32 {
        let mut cur = idx;
        while self.parent[cur as usize] != INVALID {
            cur = self.parent[cur as usize];
        }
        cur
    }

    /// Clears the transient selection marks of one node.
    pub(crate) fn clear_selection_marks(&mut self, idx: u32) {
        let i = idx as usize;
        self.selected_whole[i] = false;
        self.selection_ancestor[i] = false;
        self.sub_paths[i].clear();
    }

    /// Clears the transient selection marks of every live node.
    pub(crate) fn clear_all_selection_marks(&mut self) {
        for idx in 0..self.len {
            if self.alive[idx as usize] {
                self.clear_selection_marks(idx);
            }
        }
    }

    /// Returns the subtree rooted at `idx` in depth-first pre-order.
    pub(crate) fn subtree(&self, idx: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let mut stack = alloc::vec![idx];
        while let Some(cur) = stack.pop() {
            out.push(cur);
            for &c in self.children[cur as usize].iter().rev() {
                stack.push(c);
            }
        }
        out
    }
}
