// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Selection synchronization.
//!
//! The external selection is a list of [`SelectionEntry`]s, each naming a
//! top object and a [sub path](crate::path). Applying it marks nodes:
//!
//! - a path that ends at an object marks that node *selected whole*;
//! - a path that ends in an element name adds the element to the node's
//!   sub paths instead, so one node can carry a partial selection;
//! - every ancestor of a marked node gets the *selection ancestor* mark,
//!   which views use to expand down to the selection.
//!
//! [`Forest::get_selection`] derives entries back out of the marks. Applying
//! the derived entries marks the same nodes again.

use alloc::collections::{BTreeSet, VecDeque};
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::ProjectionError;
use crate::forest::Forest;
use crate::id::{INVALID, NodeId, ObjectId};
use crate::model::DocumentModel;
use crate::path::{PathSegment, SubPath};
use crate::trace::{SelectionEvent, Tracer};

/// Selection marks of every marked node: whole, ancestor, sub paths.
pub(crate) type MarkSignature = Vec<(NodeId, bool, bool, Vec<String>)>;

/// One entry of the external selection.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectionEntry {
    /// The top object the path starts from.
    pub object: ObjectId,
    /// Dotted path below `object`; empty selects `object` itself.
    pub sub_path: String,
}

impl SelectionEntry {
    /// Creates an entry selecting `sub_path` below `object`.
    #[must_use]
    pub fn new(object: ObjectId, sub_path: impl Into<String>) -> Self {
        Self {
            object,
            sub_path: sub_path.into(),
        }
    }

    /// Creates an entry selecting `object` as a whole.
    #[must_use]
    pub fn whole(object: ObjectId) -> Self {
        Self::new(object, String::new())
    }
}

/// The node a path resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathMatch {
    /// The deepest node reached by object descent.
    pub node: NodeId,
    /// The part of the path the node absorbs: the trailing element name,
    /// or the verbatim unresolved remainder. `None` selects the node whole.
    pub element: Option<String>,
    /// Whether descent stopped at a segment the object does not know.
    pub partial: bool,
}

/// Outcome of [`Forest::set_selection`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionReport {
    /// Nodes that received a selection mark, in match order.
    pub matched_nodes: Vec<NodeId>,
    /// Matches that degraded to a partial match.
    pub partial: usize,
    /// Entries that matched no node.
    pub unresolved: Vec<SelectionEntry>,
}

impl Forest {
    /// Replaces the selection and re-derives every node's selection marks.
    ///
    /// The entries are kept and, with
    /// [`reselect_after_flush`](crate::config::ProjectorConfig::reselect_after_flush),
    /// re-applied after every flush.
    pub fn set_selection(
        &mut self,
        model: &dyn DocumentModel,
        entries: &[SelectionEntry],
    ) -> SelectionReport {
        self.selection = entries.to_vec();
        let mut tracer = Tracer::none();
        self.apply_selection(model, &mut tracer)
    }

    /// Clears the selection and every selection mark.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.nodes.clear_all_selection_marks();
    }

    /// Returns the last applied selection entries.
    #[must_use]
    pub fn selection(&self) -> &[SelectionEntry] {
        &self.selection
    }

    /// Returns the nodes carrying a whole or sub-path selection, in
    /// depth-first order.
    #[must_use]
    pub fn selected_nodes(&self) -> Vec<NodeId> {
        self.walk_marked()
            .into_iter()
            .map(|idx| self.nodes.id_of(idx))
            .collect()
    }

    /// Derives selection entries from the node marks, in depth-first order,
    /// without duplicates.
    ///
    /// An entry starts at the nearest non-grouping ancestor whose object has
    /// a single node, or at the top level, so that applying it marks the
    /// same node and no other instance of a shared object.
    #[must_use]
    pub fn get_selection(&self, model: &dyn DocumentModel) -> Vec<SelectionEntry> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for idx in self.walk_marked() {
            let i = idx as usize;
            let name = self.unique_sub_name(model, idx);
            if self.nodes.selected_whole[i] {
                let entry = SelectionEntry::new(name.top, name.path.clone());
                if seen.insert(entry.clone()) {
                    out.push(entry);
                }
            }
            for element in &self.nodes.sub_paths[i] {
                let mut path = name.path.clone();
                path.push_str(element);
                let entry = SelectionEntry::new(name.top, path);
                if seen.insert(entry.clone()) {
                    out.push(entry);
                }
            }
        }
        out
    }

    /// Resolves `path` from every attached node of `top`, root instance
    /// first.
    ///
    /// Lazy nodes along the way are populated when
    /// [`populate_on_select`](crate::config::ProjectorConfig::populate_on_select)
    /// is set.
    pub fn find_node_by_path(
        &mut self,
        model: &dyn DocumentModel,
        top: ObjectId,
        path: &str,
    ) -> Vec<PathMatch> {
        let mut tracer = Tracer::none();
        let mut matches = self.find_matches(model, top, path, &mut tracer);
        self.stabilize(model, Vec::new(), &mut tracer);
        matches.retain(|m| self.nodes.is_alive(m.node));
        matches
    }

    /// Resolves `path` from one start node.
    pub fn resolve_path(
        &mut self,
        model: &dyn DocumentModel,
        start: NodeId,
        path: &str,
    ) -> Result<PathMatch, ProjectionError> {
        if !self.nodes.is_alive(start) {
            return Err(ProjectionError::StaleNode(start));
        }
        let mut tracer = Tracer::none();
        let found = self.resolve_from(model, start.idx, path, &mut tracer);
        self.stabilize(model, Vec::new(), &mut tracer);
        Ok(found)
    }

    /// Re-applies the stored selection.
    pub(crate) fn reapply_selection(&mut self, model: &dyn DocumentModel, tracer: &mut Tracer<'_>) {
        let report = self.apply_selection(model, tracer);
        tracing::trace!(
            matched = report.matched_nodes.len(),
            unresolved = report.unresolved.len(),
            "selection re-applied"
        );
    }

    fn apply_selection(
        &mut self,
        model: &dyn DocumentModel,
        tracer: &mut Tracer<'_>,
    ) -> SelectionReport {
        self.nodes.clear_all_selection_marks();

        let entries = self.selection.clone();
        let mut report = SelectionReport::default();
        let mut resolved = Vec::new();
        for entry in &entries {
            let matches = self.find_matches(model, entry.object, &entry.sub_path, tracer);
            if matches.is_empty() {
                tracing::debug!(
                    object = ?entry.object,
                    path = %entry.sub_path,
                    "selection entry unresolved"
                );
                report.unresolved.push(entry.clone());
            }
            resolved.extend(matches);
        }
        self.stabilize(model, Vec::new(), tracer);

        for m in resolved {
            if !self.nodes.is_alive(m.node) {
                continue;
            }
            if m.partial {
                report.partial += 1;
            }
            self.mark(&m);
            if !report.matched_nodes.contains(&m.node) {
                report.matched_nodes.push(m.node);
            }
        }

        tracer.selection(&SelectionEvent {
            entries: entries.len(),
            matched_nodes: report.matched_nodes.len(),
            partial: report.partial,
            unresolved: report.unresolved.len(),
        });
        report
    }

    fn find_matches(
        &mut self,
        model: &dyn DocumentModel,
        top: ObjectId,
        path: &str,
        tracer: &mut Tracer<'_>,
    ) -> Vec<PathMatch> {
        let Some(record) = self.record(top) else {
            return Vec::new();
        };
        let mut starts: Vec<NodeId> = record.root_instance.into_iter().collect();
        starts.extend(
            record
                .instances
                .iter()
                .copied()
                .filter(|&n| Some(n) != record.root_instance),
        );

        let mut matches: Vec<PathMatch> = Vec::new();
        for start in starts {
            if !self.nodes.is_alive(start) || !self.is_attached(start.idx) {
                continue;
            }
            let found = self.resolve_from(model, start.idx, path, tracer);
            if !matches.iter().any(|m| m.node == found.node && m.element == found.element) {
                matches.push(found);
            }
        }
        matches
    }

    fn resolve_from(
        &mut self,
        model: &dyn DocumentModel,
        start: u32,
        path: &str,
        tracer: &mut Tracer<'_>,
    ) -> PathMatch {
        let parsed = SubPath::parse(path);
        let mut cur = start;
        for (i, segment) in parsed.segments().iter().enumerate() {
            if self.config.populate_on_select {
                self.populate_idx(model, cur, true, tracer);
            }
            if let Some(next) = self.child_matching(model, cur, segment) {
                cur = next;
                continue;
            }
            if self.config.search_reachable_on_miss {
                if let Some(next) = self.search_reachable(model, cur, segment, tracer) {
                    cur = next;
                    continue;
                }
            }
            let exists = model.sub_object_exists(self.nodes.object[cur as usize], segment.name);
            return PathMatch {
                node: self.nodes.id_of(cur),
                element: Some(parsed.remainder_from(i).into()),
                partial: !exists,
            };
        }
        PathMatch {
            node: self.nodes.id_of(cur),
            element: parsed.element().map(Into::into),
            partial: false,
        }
    }

    fn child_matching(
        &self,
        model: &dyn DocumentModel,
        idx: u32,
        segment: &PathSegment<'_>,
    ) -> Option<u32> {
        let parent = self.nodes.object[idx as usize];
        self.nodes.children[idx as usize]
            .iter()
            .copied()
            .find(|&c| segment.matches(model, self.nodes.object[c as usize], parent))
    }

    /// Breadth-first search for a node matching `segment` anywhere below the
    /// children of `from`, bounded by `max_search_nodes`.
    fn search_reachable(
        &mut self,
        model: &dyn DocumentModel,
        from: u32,
        segment: &PathSegment<'_>,
        tracer: &mut Tracer<'_>,
    ) -> Option<u32> {
        let mut queue: VecDeque<u32> = self.nodes.children[from as usize].iter().copied().collect();
        let mut visited = 0;
        while let Some(idx) = queue.pop_front() {
            visited += 1;
            if visited > self.config.max_search_nodes {
                tracing::debug!(visited, "reachable search bound hit");
                return None;
            }
            if self.config.populate_on_select {
                self.populate_idx(model, idx, true, tracer);
            }
            if let Some(found) = self.child_matching(model, idx, segment) {
                return Some(found);
            }
            queue.extend(self.nodes.children[idx as usize].iter().copied());
        }
        None
    }

    fn mark(&mut self, m: &PathMatch) {
        let idx = m.node.idx;
        match &m.element {
            None => self.nodes.selected_whole[idx as usize] = true,
            Some(element) => {
                self.nodes.sub_paths[idx as usize].insert(element.clone());
            }
        }
        let mut cur = self.nodes.parent[idx as usize];
        while cur != INVALID {
            self.nodes.selection_ancestor[cur as usize] = true;
            cur = self.nodes.parent[cur as usize];
        }
    }

    /// Attached nodes carrying a selection mark, depth-first.
    fn walk_marked(&self) -> Vec<u32> {
        let mut out = Vec::new();
        for container in self.containers.values() {
            for &top in container.top_level() {
                for idx in self.nodes.subtree(top.idx) {
                    let i = idx as usize;
                    if self.nodes.selected_whole[i] || !self.nodes.sub_paths[i].is_empty() {
                        out.push(idx);
                    }
                }
            }
        }
        out
    }

    /// Every selection mark, for change detection across a flush.
    pub(crate) fn mark_signature(&self) -> MarkSignature {
        (0..self.nodes.len)
            .filter(|&idx| {
                let i = idx as usize;
                self.nodes.alive[i]
                    && (self.nodes.selected_whole[i]
                        || self.nodes.selection_ancestor[i]
                        || !self.nodes.sub_paths[i].is_empty())
            })
            .map(|idx| {
                let i = idx as usize;
                (
                    self.nodes.id_of(idx),
                    self.nodes.selected_whole[i],
                    self.nodes.selection_ancestor[i],
                    self.nodes.sub_paths[i].iter().cloned().collect(),
                )
            })
            .collect()
    }
}
