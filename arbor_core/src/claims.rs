// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mirror of the document's claim graph.
//!
//! The claim index keeps the last accepted claim list of every object the
//! forest has seen, plus the inverse "claimed by" relation. It outlives
//! individual [`ObjectRecord`](crate::record::ObjectRecord)s: a record is
//! dropped as soon as its last node goes away, but whether an object must sit
//! at the top level depends on every claimant, populated or not.
//!
//! Claims that would close a cycle are rejected here, which keeps the
//! accepted claim graph a DAG.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::id::{DocumentId, ObjectId};

#[derive(Clone, Debug)]
pub(crate) struct ClaimEntry {
    pub(crate) document: DocumentId,
    pub(crate) children: Vec<ObjectId>,
    pub(crate) rejected: Vec<ObjectId>,
    pub(crate) removes_from_root: bool,
}

/// Result of [`ClaimIndex::update`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ClaimUpdate {
    /// Children whose claimant set changed (claimed or released).
    pub(crate) touched: Vec<ObjectId>,
    /// Newly rejected claims.
    pub(crate) rejected: Vec<ObjectId>,
    /// Whether the remove-children-from-root policy changed.
    pub(crate) policy_changed: bool,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ClaimIndex {
    entries: BTreeMap<ObjectId, ClaimEntry>,
    claimants: BTreeMap<ObjectId, Vec<ObjectId>>,
}

impl ClaimIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn entry(&self, object: ObjectId) -> Option<&ClaimEntry> {
        self.entries.get(&object)
    }

    pub(crate) fn contains(&self, object: ObjectId) -> bool {
        self.entries.contains_key(&object)
    }

    /// Returns the accepted children of `object`.
    pub(crate) fn children(&self, object: ObjectId) -> &[ObjectId] {
        self.entries
            .get(&object)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the objects whose accepted claims include `object`, in the
    /// order their claims were accepted.
    pub(crate) fn claimants(&self, object: ObjectId) -> &[ObjectId] {
        self.claimants
            .get(&object)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns every indexed object of `document`.
    pub(crate) fn objects_in(&self, document: DocumentId) -> Vec<ObjectId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.document == document)
            .map(|(&o, _)| o)
            .collect()
    }

    /// Replaces the claim list of `object`.
    ///
    /// Claims of `object` itself, or of anything `object` is reachable from,
    /// are rejected.
    pub(crate) fn update(
        &mut self,
        object: ObjectId,
        document: DocumentId,
        claims: &[ObjectId],
        removes_from_root: bool,
    ) -> ClaimUpdate {
        let mut update = ClaimUpdate::default();
        let (old_children, old_rejected) = match self.entries.remove(&object) {
            Some(old) => {
                update.policy_changed = old.removes_from_root != removes_from_root;
                (old.children, old.rejected)
            }
            None => (Vec::new(), Vec::new()),
        };

        for &child in &old_children {
            self.release(object, child);
        }

        let mut entry = ClaimEntry {
            document,
            children: Vec::with_capacity(claims.len()),
            rejected: Vec::new(),
            removes_from_root,
        };
        for &child in claims {
            if child == object || self.reaches(child, object) {
                if !old_rejected.contains(&child) {
                    update.rejected.push(child);
                }
                entry.rejected.push(child);
                continue;
            }
            entry.children.push(child);
            let list = self.claimants.entry(child).or_default();
            if !list.contains(&object) {
                list.push(object);
            }
        }

        for &child in old_children.iter().chain(entry.children.iter()) {
            if old_children.contains(&child) != entry.children.contains(&child)
                && !update.touched.contains(&child)
            {
                update.touched.push(child);
            }
        }
        if update.policy_changed {
            for &child in &entry.children {
                if !update.touched.contains(&child) {
                    update.touched.push(child);
                }
            }
        }

        self.entries.insert(object, entry);
        update
    }

    /// Forgets `object` entirely. Returns the children it claimed.
    pub(crate) fn remove(&mut self, object: ObjectId) -> Vec<ObjectId> {
        let Some(entry) = self.entries.remove(&object) else {
            return Vec::new();
        };
        for &child in &entry.children {
            self.release(object, child);
        }
        entry.children
    }

    /// Returns whether `object` must have a top-level node: no accepted
    /// claimant of the same document removes its children from root.
    pub(crate) fn needs_root(&self, object: ObjectId, document: DocumentId) -> bool {
        !self.claimants(object).iter().any(|p| {
            self.entries
                .get(p)
                .is_some_and(|e| e.document == document && e.removes_from_root)
        })
    }

    /// Returns the objects holding a rejected claim that no longer closes a
    /// cycle.
    pub(crate) fn retryable(&self) -> Vec<ObjectId> {
        self.entries
            .iter()
            .filter(|&(&object, ref e)| {
                e.rejected
                    .iter()
                    .any(|&child| child != object && !self.reaches(child, object))
            })
            .map(|(&object, _)| object)
            .collect()
    }

    /// Returns whether `to` is reachable from `from` along accepted claims.
    pub(crate) fn reaches(&self, from: ObjectId, to: ObjectId) -> bool {
        let mut stack = alloc::vec![from];
        let mut seen = alloc::collections::BTreeSet::new();
        while let Some(cur) = stack.pop() {
            if cur == to {
                return true;
            }
            if !seen.insert(cur) {
                continue;
            }
            stack.extend(self.children(cur).iter().copied());
        }
        false
    }

    fn release(&mut self, parent: ObjectId, child: ObjectId) {
        if let Some(list) = self.claimants.get_mut(&child) {
            list.retain(|&p| p != parent);
            if list.is_empty() {
                self.claimants.remove(&child);
            }
        }
    }
}
