// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-document root of the projection.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::id::{DocumentId, NodeId, ObjectId};
use crate::record::ObjectRecord;

/// The projection root of one document.
///
/// A container indexes the [`ObjectRecord`] of every object of its document
/// that currently has at least one node, and holds the top-level nodes in
/// creation-rank order. Nodes realizing objects of *other* documents may
/// appear below this container's nodes; their records stay in their own
/// document's container.
#[derive(Clone, Debug)]
pub struct Container {
    pub(crate) document: DocumentId,
    pub(crate) object_index: BTreeMap<ObjectId, ObjectRecord>,
    pub(crate) top_level: Vec<NodeId>,
    top_ranks: Vec<u64>,
    ranks: BTreeMap<ObjectId, u64>,
    next_rank: u64,
}

impl Container {
    pub(crate) fn new(document: DocumentId) -> Self {
        Self {
            document,
            object_index: BTreeMap::new(),
            top_level: Vec::new(),
            top_ranks: Vec::new(),
            ranks: BTreeMap::new(),
            next_rank: 0,
        }
    }

    /// Returns the document this container projects.
    #[must_use]
    pub fn document(&self) -> DocumentId {
        self.document
    }

    /// Returns the top-level nodes in creation-rank order.
    #[must_use]
    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    /// Returns the record of `object`, if it currently has nodes.
    #[must_use]
    pub fn record(&self, object: ObjectId) -> Option<&ObjectRecord> {
        self.object_index.get(&object)
    }

    /// Returns an iterator over all records, ordered by object handle.
    pub fn records(&self) -> impl Iterator<Item = &ObjectRecord> {
        self.object_index.values()
    }

    /// Returns the creation rank of `object`, assigning the next one on
    /// first sight.
    pub(crate) fn rank_of(&mut self, object: ObjectId) -> u64 {
        if let Some(&rank) = self.ranks.get(&object) {
            return rank;
        }
        let rank = self.next_rank;
        self.next_rank += 1;
        self.ranks.insert(object, rank);
        rank
    }

    /// Forgets the rank of a removed object.
    pub(crate) fn forget_rank(&mut self, object: ObjectId) {
        self.ranks.remove(&object);
    }

    /// Inserts `node` among the top-level nodes, keeping rank order. Nodes
    /// of equal rank keep insertion order.
    pub(crate) fn insert_top_level(&mut self, node: NodeId, rank: u64) {
        let pos = self.top_ranks.partition_point(|&r| r <= rank);
        self.top_level.insert(pos, node);
        self.top_ranks.insert(pos, rank);
    }

    /// Removes `node` from the top level. Returns whether it was there.
    pub(crate) fn remove_top_level(&mut self, node: NodeId) -> bool {
        if let Some(pos) = self.top_level.iter().position(|&n| n == node) {
            self.top_level.remove(pos);
            self.top_ranks.remove(pos);
            true
        } else {
            false
        }
    }

    /// Reassigns ranks to follow `objects` and re-sorts the top level.
    /// `object_of` maps a top-level node to its object.
    pub(crate) fn rerank(&mut self, objects: &[ObjectId], object_of: impl Fn(NodeId) -> ObjectId) {
        self.ranks.clear();
        self.next_rank = 0;
        for &object in objects {
            self.rank_of(object);
        }
        let mut entries: Vec<(u64, NodeId)> = self
            .top_level
            .iter()
            .map(|&node| (self.ranks.get(&object_of(node)).copied().unwrap_or(u64::MAX), node))
            .collect();
        entries.sort_by_key(|&(rank, _)| rank);
        self.top_ranks = entries.iter().map(|&(rank, _)| rank).collect();
        self.top_level = entries.into_iter().map(|(_, node)| node).collect();
    }
}
