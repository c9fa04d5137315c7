// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Expansion snapshots.
//!
//! An [`ExpansionSnapshot`] records which nodes of a document are expanded,
//! as a tree keyed by path segment text (the object name, qualified with its
//! document for cross-document nodes). Only expanded nodes appear, so a
//! collapsed top-level node is simply absent. The storage format is the
//! caller's business; with the `serde` feature the snapshot serializes as a
//! plain nested map.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::ProjectionError;
use crate::forest::Forest;
use crate::id::{DocumentId, NodeId, ObjectId};
use crate::model::DocumentModel;
use crate::path::{SEGMENT_SEPARATOR, segment_text};
use crate::trace::Tracer;

/// Expanded nodes below one level, keyed by segment text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ExpansionSnapshot {
    children: BTreeMap<String, ExpansionSnapshot>,
}

impl ExpansionSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether nothing is expanded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns the number of expanded nodes at every depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.values().map(|c| 1 + c.len()).sum()
    }

    /// Returns the snapshot below the expanded entry `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.children.get(key)
    }

    /// Marks `key` expanded and returns its child snapshot.
    pub fn insert(&mut self, key: impl Into<String>) -> &mut Self {
        self.children.entry(key.into()).or_default()
    }

    /// Returns the expanded entries of this level.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Self)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Forest {
    /// Captures which nodes of `document` are expanded.
    pub fn expansion_snapshot(
        &self,
        model: &dyn DocumentModel,
        document: DocumentId,
    ) -> Result<ExpansionSnapshot, ProjectionError> {
        let container = self
            .containers
            .get(&document)
            .filter(|_| self.attached.contains(&document))
            .ok_or(ProjectionError::UnknownDocument(document))?;
        let mut snapshot = ExpansionSnapshot::new();
        for &top in container.top_level() {
            if self.nodes.expanded[top.idx as usize] {
                let key = model.name(self.nodes.object[top.idx as usize]);
                self.capture(model, top.idx, snapshot.insert(key));
            }
        }
        Ok(snapshot)
    }

    fn capture(&self, model: &dyn DocumentModel, idx: u32, into: &mut ExpansionSnapshot) {
        let parent = self.nodes.object[idx as usize];
        for &child in &self.nodes.children[idx as usize] {
            if self.nodes.expanded[child as usize] {
                let key = child_key(model, self.nodes.object[child as usize], parent);
                self.capture(model, child, into.insert(key));
            }
        }
    }

    /// Expands the nodes of `document` recorded in `snapshot`, populating
    /// them. Entries that no longer match a node are ignored. Returns the
    /// number of nodes expanded.
    pub fn restore_expansion(
        &mut self,
        model: &dyn DocumentModel,
        document: DocumentId,
        snapshot: &ExpansionSnapshot,
    ) -> Result<usize, ProjectionError> {
        if !self.attached.contains(&document) {
            return Err(ProjectionError::UnknownDocument(document));
        }
        let tops: Vec<NodeId> = self.roots(document).to_vec();
        let mut tracer = Tracer::none();
        let mut expanded = 0;
        for top in tops {
            if !self.nodes.is_alive(top) {
                continue;
            }
            let key = model.name(self.nodes.object[top.idx as usize]);
            if let Some(level) = snapshot.get(&key) {
                expanded += self.restore_level(model, top.idx, level, &mut tracer);
            }
        }
        self.stabilize(model, Vec::new(), &mut tracer);
        tracing::debug!(?document, expanded, "expansion restored");
        Ok(expanded)
    }

    fn restore_level(
        &mut self,
        model: &dyn DocumentModel,
        idx: u32,
        level: &ExpansionSnapshot,
        tracer: &mut Tracer<'_>,
    ) -> usize {
        self.nodes.expanded[idx as usize] = true;
        self.populate_idx(model, idx, true, tracer);
        let mut expanded = 1;
        let parent = self.nodes.object[idx as usize];
        let children = self.nodes.children[idx as usize].clone();
        for child in children {
            if !self.nodes.alive[child as usize] || self.nodes.parent[child as usize] != idx {
                continue;
            }
            let key = child_key(model, self.nodes.object[child as usize], parent);
            if let Some(next) = level.get(&key) {
                expanded += self.restore_level(model, child, next, tracer);
            }
        }
        expanded
    }
}

fn child_key(model: &dyn DocumentModel, object: ObjectId, parent: ObjectId) -> String {
    let mut key = segment_text(model, object, parent);
    if key.ends_with(SEGMENT_SEPARATOR) {
        key.pop();
    }
    key
}
