// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental projection: populate and flush.
//!
//! A flush drains the pending notifications in a fixed order:
//!
//! ```text
//! closed documents ──► reset documents ──► removed objects
//!        │
//!        ▼
//! refresh claims of dirty objects (claim index + dependency edges)
//!        │
//!        ▼
//! drain CLAIMS in claimant-before-claimed order
//!        │  populate every attached node of each dirty object
//!        ▼
//! stabilize: root reconciliation ◄──► settle parked nodes
//!        │
//!        ▼
//! labels ──► selection ──► FlushReport
//! ```
//!
//! [`Forest::flush`] borrows the forest mutably for its whole duration, so a
//! notification can only be posted before or after it; one posted after lands
//! in the next flush.
//!
//! # Laziness
//!
//! A node materializes its children only when it is expanded, when it was
//! populated before, when a refresh is forced, or when one of its claimed
//! objects is *root-displaced*: the object has no attached node at all, or it
//! sits at the top level although a claimant removes it from there. In every
//! other case only the [`ChildIndicator`] is recomputed.

use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::vec::Vec;
use core::mem;

use crate::dirty;
use crate::error::{ProjectionError, StructuralError};
use crate::forest::{FlushReport, Forest};
use crate::id::{DocumentId, INVALID, NodeId, ObjectId};
use crate::model::DocumentModel;
use crate::node::ChildIndicator;
use crate::trace::{FlushBeginEvent, FlushSummary, PopulateEvent, Tracer};

/// Upper bound on reconcile/settle rounds per stabilization.
const MAX_STABILIZE_PASSES: usize = 16;

enum Adoption {
    /// The root instance was detached and may be attached by the caller.
    Adopted(u32),
    /// Adoption would put a node below its own descendant.
    Cycle,
    /// Nothing to adopt.
    None,
}

impl Forest {
    /// Applies every pending notification and returns what changed.
    pub fn flush(&mut self, model: &dyn DocumentModel) -> FlushReport {
        self.flush_traced(model, &mut Tracer::none())
    }

    /// Like [`flush`](Self::flush), emitting trace events to `tracer`.
    pub fn flush_traced(
        &mut self,
        model: &dyn DocumentModel,
        tracer: &mut Tracer<'_>,
    ) -> FlushReport {
        self.flush_index += 1;
        let marks_before = (self.config.reselect_after_flush && !self.selection.is_empty())
            .then(|| self.mark_signature());
        let closed = mem::take(&mut self.pending_closed);
        let resets = mem::take(&mut self.pending_resets);
        let removed = mem::take(&mut self.pending_removed);
        let mut explicit = mem::take(&mut self.dirty_claims);
        self.labels_pending = false;

        tracer.flush_begin(&FlushBeginEvent {
            flush_index: self.flush_index,
            dirty_objects: explicit.len(),
            removed_objects: removed.len(),
            reset_documents: resets.len() + closed.len(),
        });
        tracing::debug!(
            flush = self.flush_index,
            dirty = explicit.len(),
            removed = removed.len(),
            resets = resets.len(),
            closed = closed.len(),
            "flush begin"
        );

        for document in closed {
            self.close_document(document);
        }
        for document in resets {
            self.reset_document(model, document, &mut explicit);
        }
        for object in removed {
            explicit.remove(&object);
            self.remove_object(object);
        }

        // Claims first, so the drain below orders by the new edges.
        let candidates: Vec<ObjectId> = explicit.iter().copied().collect();
        for object in candidates {
            if !model.contains(object) {
                explicit.remove(&object);
                self.remove_object(object);
                continue;
            }
            let update = self.refresh_claims(model, object);
            self.touched.insert(object);
            self.touched.extend(update.touched);
        }
        // A dropped claim can make a claim rejected earlier acceptable.
        for object in self.claims.retryable() {
            if !model.contains(object) {
                continue;
            }
            tracing::trace!(?object, "retrying rejected claims");
            let update = self.refresh_claims(model, object);
            self.dirty.mark(object, dirty::CLAIMS);
            explicit.insert(object);
            self.touched.insert(object);
            self.touched.extend(update.touched);
        }

        let mut order: Vec<ObjectId> = self
            .dirty
            .drain(dirty::CLAIMS)
            .affected()
            .deterministic()
            .run()
            .filter(|o| explicit.contains(o))
            .collect();
        if order.len() < explicit.len() {
            let seen: BTreeSet<ObjectId> = order.iter().copied().collect();
            order.extend(explicit.iter().copied().filter(|o| !seen.contains(o)));
        }

        for &object in &order {
            let instances = self.nodes_of(object).to_vec();
            for node in instances {
                if self.nodes.is_alive(node) && self.is_attached(node.idx) {
                    self.populate_idx(model, node.idx, false, tracer);
                }
            }
        }

        self.stabilize(model, order.clone(), tracer);

        let relabeled = self.refresh_labels(model);

        let selection_changed = match marks_before {
            Some(before) => {
                self.reapply_selection(model, tracer);
                before != self.mark_signature()
            }
            None => false,
        };

        let mut report = FlushReport {
            flush_index: self.flush_index,
            processed: order,
            relabeled,
            selection_changed,
            ..FlushReport::default()
        };
        mem::swap(&mut self.nodes.pending_created, &mut report.created);
        mem::swap(&mut self.nodes.pending_destroyed, &mut report.destroyed);
        mem::swap(&mut self.records_gone, &mut report.records_gone);
        mem::swap(&mut self.structural_errors, &mut report.structural_errors);

        // Nodes that came and went within one flush were never visible.
        let created: BTreeSet<NodeId> = report.created.iter().copied().collect();
        report.destroyed.retain(|n| !created.contains(n));
        report.created.retain(|&n| self.nodes.is_alive(n));
        let mut gone = BTreeSet::new();
        report
            .records_gone
            .retain(|&o| self.record(o).is_none() && gone.insert(o));

        for error in &report.structural_errors {
            tracer.structural_error(error);
        }
        for &object in &report.records_gone {
            tracer.record_gone(object);
        }
        tracer.flush_summary(&FlushSummary {
            flush_index: report.flush_index,
            dirty_objects: report.processed.len(),
            nodes_created: report.created.len(),
            nodes_destroyed: report.destroyed.len(),
            records_gone: report.records_gone.len(),
            structural_errors: report.structural_errors.len(),
            selection_changed,
        });
        tracing::debug!(
            flush = report.flush_index,
            created = report.created.len(),
            destroyed = report.destroyed.len(),
            errors = report.structural_errors.len(),
            "flush end"
        );
        report
    }

    /// Synchronizes the children of `node` with its object's claims.
    ///
    /// A collapsed, never populated node is only materialized when `refresh`
    /// is set or one of its claimed objects is root-displaced.
    pub fn populate(
        &mut self,
        model: &dyn DocumentModel,
        node: NodeId,
        refresh: bool,
    ) -> Result<(), ProjectionError> {
        if !self.nodes.is_alive(node) {
            return Err(ProjectionError::StaleNode(node));
        }
        let mut tracer = Tracer::none();
        self.populate_idx(model, node.idx, refresh, &mut tracer);
        self.stabilize(model, Vec::new(), &mut tracer);
        Ok(())
    }

    pub(crate) fn populate_idx(
        &mut self,
        model: &dyn DocumentModel,
        idx: u32,
        refresh: bool,
        tracer: &mut Tracer<'_>,
    ) {
        let i = idx as usize;
        let object = self.nodes.object[i];
        let owner = self.nodes.owner[i];
        let Some(record) = self.record(object) else {
            return;
        };
        let removes = record.remove_children_from_root;
        let claims: Vec<ObjectId> = record
            .claimed_children
            .iter()
            .copied()
            .filter(|&c| model.contains(c))
            .collect();

        self.nodes.indicator[i] = if claims.is_empty() {
            ChildIndicator::DontShowIndicator
        } else {
            ChildIndicator::ShowIndicator
        };
        if !self.nodes.populated[i]
            && !self.nodes.expanded[i]
            && !refresh
            && !claims.iter().any(|&c| self.is_root_displaced(model, c))
        {
            return;
        }
        self.nodes.populated[i] = true;

        let node = self.nodes.id_of(idx);
        let old = mem::take(&mut self.nodes.children[i]);
        let mut pool: BTreeMap<ObjectId, VecDeque<(usize, u32)>> = BTreeMap::new();
        for (pos, &child) in old.iter().enumerate() {
            pool.entry(self.nodes.object[child as usize])
                .or_default()
                .push_back((pos, child));
        }

        let mut event = PopulateEvent {
            node,
            object,
            children: 0,
            moved: 0,
            created: 0,
            adopted: 0,
            reused: 0,
            parked: 0,
        };
        let mut next = Vec::with_capacity(claims.len());
        let mut fresh = Vec::new();
        for (pos, &child_object) in claims.iter().enumerate() {
            let reused = pool.get_mut(&child_object).and_then(VecDeque::pop_front);
            if let Some((old_pos, child)) = reused {
                if old_pos != pos {
                    self.nodes.clear_selection_marks(child);
                    event.moved += 1;
                }
                next.push(child);
                continue;
            }
            if removes {
                match self.try_adopt(model, child_object, idx) {
                    Adoption::Adopted(child) => {
                        self.nodes.parent[child as usize] = idx;
                        next.push(child);
                        fresh.push(child);
                        event.adopted += 1;
                        continue;
                    }
                    Adoption::Cycle => continue,
                    Adoption::None => {}
                }
            }
            if let Some(child) = self.take_parked(child_object, owner, idx) {
                self.nodes.parent[child as usize] = idx;
                next.push(child);
                fresh.push(child);
                event.reused += 1;
                continue;
            }
            if let Some(child) = self.take_released(child_object, owner, idx) {
                self.nodes.parent[child as usize] = idx;
                next.push(child);
                fresh.push(child);
                event.reused += 1;
                continue;
            }
            let Some(child) = self.create_instance(model, child_object, owner) else {
                continue;
            };
            self.nodes.parent[child as usize] = idx;
            next.push(child);
            fresh.push(child);
            event.created += 1;
        }
        self.nodes.children[i] = next;

        // Leftovers keep their relative order so settling is deterministic.
        let mut leftovers: Vec<(usize, u32)> = pool.into_values().flatten().collect();
        leftovers.sort_unstable();
        for (_, child) in leftovers {
            self.nodes.parent[child as usize] = INVALID;
            self.nodes.clear_selection_marks(child);
            let id = self.nodes.id_of(child);
            self.parked
                .entry(self.nodes.object[child as usize])
                .or_default()
                .push(id);
            self.touched.insert(self.nodes.object[child as usize]);
            event.parked += 1;
        }

        event.children = self.nodes.children[i].len();
        tracing::trace!(
            ?node,
            ?object,
            children = event.children,
            created = event.created,
            parked = event.parked,
            "populated"
        );
        tracer.populate(&event);

        for child in fresh {
            if self.nodes.alive[child as usize] && self.nodes.parent[child as usize] == idx {
                self.populate_idx(model, child, false, tracer);
            }
        }
    }

    /// Returns whether `object` must be materialized below a claimant.
    fn is_root_displaced(&self, model: &dyn DocumentModel, object: ObjectId) -> bool {
        let Some(record) = self.record(object) else {
            return true;
        };
        if record.root_instance.is_some()
            && !self.claims.needs_root(object, model.document_of(object))
        {
            return true;
        }
        !record.instances.iter().any(|n| self.is_attached(n.idx))
    }

    fn try_adopt(
        &mut self,
        model: &dyn DocumentModel,
        object: ObjectId,
        parent: u32,
    ) -> Adoption {
        let Some(root) = self.record(object).and_then(|r| r.root_instance) else {
            return Adoption::None;
        };
        if self.nodes.owner[root.idx as usize] != self.nodes.owner[parent as usize]
            || self.claims.needs_root(object, model.document_of(object))
        {
            return Adoption::None;
        }
        if self.nodes.is_ancestor_or_self(root.idx, parent) {
            self.report_structural(StructuralError::AdoptionCycle {
                object,
                node: root,
                parent: self.nodes.id_of(parent),
            });
            return Adoption::Cycle;
        }
        self.detach_root(root.idx);
        self.nodes.clear_selection_marks(root.idx);
        Adoption::Adopted(root.idx)
    }

    /// Takes a parked node of `object` owned by `owner` for relocation below
    /// `destination`.
    fn take_parked(
        &mut self,
        object: ObjectId,
        owner: DocumentId,
        destination: u32,
    ) -> Option<u32> {
        let list = self.parked.get_mut(&object)?;
        let pos = list
            .iter()
            .position(|n| self.nodes.owner[n.idx as usize] == owner)?;
        let id = list.remove(pos);
        if list.is_empty() {
            self.parked.remove(&object);
        }
        if self.nodes.is_ancestor_or_self(id.idx, destination) {
            self.report_structural(StructuralError::RelocationCycle {
                object,
                node: id,
                destination: self.nodes.id_of(destination),
            });
            self.orphaned.push(id);
            return None;
        }
        Some(id.idx)
    }

    /// Takes an attached node of `object` whose parent no longer claims it,
    /// ahead of that parent's own refresh.
    fn take_released(
        &mut self,
        object: ObjectId,
        owner: DocumentId,
        destination: u32,
    ) -> Option<u32> {
        let record = self.record(object)?;
        let idx = record.instances.iter().map(|n| n.idx).find(|&n| {
            let parent = self.nodes.parent[n as usize];
            parent != INVALID
                && self.nodes.owner[n as usize] == owner
                && !self
                    .claims
                    .children(self.nodes.object[parent as usize])
                    .contains(&object)
                && !self.nodes.is_ancestor_or_self(n, destination)
        })?;
        self.nodes.unlink_from_parent(idx);
        self.nodes.clear_selection_marks(idx);
        Some(idx)
    }

    /// Takes a parked node of `object` that can become its root instance.
    fn take_parked_root(&mut self, object: ObjectId, document: DocumentId) -> Option<u32> {
        let list = self.parked.get_mut(&object)?;
        let pos = list
            .iter()
            .position(|n| self.nodes.owner[n.idx as usize] == document)?;
        let id = list.remove(pos);
        if list.is_empty() {
            self.parked.remove(&object);
        }
        Some(id.idx)
    }

    /// Alternates root reconciliation and parked-node settling until no
    /// object is left touched.
    pub(crate) fn stabilize(
        &mut self,
        model: &dyn DocumentModel,
        first: Vec<ObjectId>,
        tracer: &mut Tracer<'_>,
    ) {
        let mut queue = first;
        for _ in 0..MAX_STABILIZE_PASSES {
            let mut seen: BTreeSet<ObjectId> = queue.iter().copied().collect();
            for object in mem::take(&mut self.touched) {
                if seen.insert(object) {
                    queue.push(object);
                }
            }
            if queue.is_empty() && self.parked.is_empty() && self.orphaned.is_empty() {
                return;
            }
            for object in mem::take(&mut queue) {
                self.reconcile_root(model, object, tracer);
            }
            self.settle_parked(model, tracer);
        }
        tracing::warn!(
            touched = self.touched.len(),
            "projection did not settle; remaining objects deferred"
        );
        self.settle_parked(model, tracer);
    }

    /// Brings the root instance of `object` in line with its claimants.
    fn reconcile_root(
        &mut self,
        model: &dyn DocumentModel,
        object: ObjectId,
        tracer: &mut Tracer<'_>,
    ) {
        if !model.contains(object) {
            return;
        }
        let document = model.document_of(object);
        if !self.attached.contains(&document) {
            return;
        }
        let root = self.record(object).and_then(|r| r.root_instance);

        if self.claims.needs_root(object, document) {
            if root.is_none() {
                let idx = match self.take_parked_root(object, document) {
                    Some(idx) => Some(idx),
                    None => self.create_instance(model, object, document),
                };
                if let Some(idx) = idx {
                    self.attach_root(object, idx);
                    self.populate_idx(model, idx, false, tracer);
                }
            }
            if let Some(record) = self.record_mut(object) {
                record.forced_root = false;
            }
            return;
        }

        if self.has_attached_nested(object, root) {
            if let Some(root) = root {
                tracing::trace!(?object, node = ?root, "dropping redundant root instance");
                self.destroy_subtree(root.idx);
            }
            return;
        }

        self.populate_claimants(model, object, tracer);
        let root = self.record(object).and_then(|r| r.root_instance);
        if self.has_attached_nested(object, root) {
            if let Some(root) = root {
                self.destroy_subtree(root.idx);
            }
            return;
        }

        // No claimant can host the object; keep it reachable from the top.
        let root = match root {
            Some(root) => Some(root.idx),
            None => {
                let idx = match self.take_parked_root(object, document) {
                    Some(idx) => Some(idx),
                    None => self.create_instance(model, object, document),
                };
                if let Some(idx) = idx {
                    self.attach_root(object, idx);
                    self.populate_idx(model, idx, false, tracer);
                }
                idx
            }
        };
        if root.is_some() {
            tracing::debug!(?object, "forced root instance");
            if let Some(record) = self.record_mut(object) {
                record.forced_root = true;
            }
        }
    }

    /// Returns whether `object` has an attached node other than `root`.
    fn has_attached_nested(&self, object: ObjectId, root: Option<NodeId>) -> bool {
        self.nodes_of(object)
            .iter()
            .any(|&n| Some(n) != root && self.is_attached(n.idx))
    }

    /// Populates attached nodes of same-document claimants that remove
    /// `object` from the top level, until one of them hosts it.
    fn populate_claimants(
        &mut self,
        model: &dyn DocumentModel,
        object: ObjectId,
        tracer: &mut Tracer<'_>,
    ) {
        let document = model.document_of(object);
        let claimants: Vec<ObjectId> = self
            .claims
            .claimants(object)
            .iter()
            .copied()
            .filter(|&p| {
                self.claims
                    .entry(p)
                    .is_some_and(|e| e.document == document && e.removes_from_root)
            })
            .collect();
        for claimant in claimants {
            let instances = self.nodes_of(claimant).to_vec();
            for node in instances {
                if !self.nodes.is_alive(node) || !self.is_attached(node.idx) {
                    continue;
                }
                self.populate_idx(model, node.idx, false, tracer);
                let root = self.record(object).and_then(|r| r.root_instance);
                if self.has_attached_nested(object, root) {
                    return;
                }
            }
        }
    }

    /// Relocates or destroys every parked node nobody picked up.
    fn settle_parked(&mut self, model: &dyn DocumentModel, tracer: &mut Tracer<'_>) {
        let parked = mem::take(&mut self.parked);
        let orphaned = mem::take(&mut self.orphaned);
        for (object, list) in parked {
            for id in list {
                if !self.nodes.is_alive(id) || self.nodes.parent[id.idx as usize] != INVALID {
                    continue;
                }
                let document = model.contains(object).then(|| model.document_of(object));
                let relocate = document.is_some_and(|d| {
                    self.attached.contains(&d)
                        && self.nodes.owner[id.idx as usize] == d
                        && self.claims.needs_root(object, d)
                        && self.record(object).is_some_and(|r| r.root_instance.is_none())
                });
                if relocate {
                    tracing::trace!(?object, node = ?id, "relocated to top level");
                    self.attach_root(object, id.idx);
                    self.populate_idx(model, id.idx, false, tracer);
                } else {
                    self.destroy_subtree(id.idx);
                }
            }
        }
        for id in orphaned {
            if self.nodes.is_alive(id) && self.nodes.parent[id.idx as usize] == INVALID {
                self.destroy_subtree(id.idx);
            }
        }
    }

    /// Destroys every node of a removed object and forgets its claims.
    fn remove_object(&mut self, object: ObjectId) {
        let instances = self.nodes_of(object).to_vec();
        for node in instances {
            if self.nodes.is_alive(node) {
                self.destroy_subtree(node.idx);
            }
        }
        for child in self.claims.remove(object) {
            self.dirty.remove_dependency(child, object, dirty::CLAIMS);
            self.touched.insert(child);
        }
        self.dirty.remove_key(object);
        for container in self.containers.values_mut() {
            container.forget_rank(object);
        }
        tracing::trace!(?object, "object removed");
    }

    /// Re-queries every object of `document`, forgetting objects that are
    /// gone. Existing nodes are kept and re-synchronized; the top level is
    /// re-sorted by the document's current object order.
    fn reset_document(
        &mut self,
        model: &dyn DocumentModel,
        document: DocumentId,
        explicit: &mut BTreeSet<ObjectId>,
    ) {
        self.ensure_container(document);
        let objects = model.objects(document);
        let present: BTreeSet<ObjectId> = objects.iter().copied().collect();
        for stale in self.claims.objects_in(document) {
            if !present.contains(&stale) {
                explicit.remove(&stale);
                self.remove_object(stale);
            }
        }
        let nodes = &self.nodes;
        if let Some(container) = self.containers.get_mut(&document) {
            container.rerank(&objects, |n| nodes.object[n.idx as usize]);
        }
        for object in objects {
            self.dirty.mark(object, dirty::CLAIMS);
            self.dirty.mark(object, dirty::LABEL);
            explicit.insert(object);
        }
        tracing::debug!(?document, objects = present.len(), "document reset");
    }

    /// Discards the container of `document` and every node realizing one of
    /// its objects.
    fn close_document(&mut self, document: DocumentId) {
        self.attached.remove(&document);
        let Some(container) = self.containers.get(&document) else {
            return;
        };
        let mut doomed: Vec<NodeId> = container.top_level.clone();
        doomed.extend(container.records().flat_map(|r| r.instances.iter().copied()));
        for node in doomed {
            if self.nodes.is_alive(node) {
                self.destroy_subtree(node.idx);
            }
        }
        for object in self.claims.objects_in(document) {
            self.remove_object(object);
        }
        self.containers.remove(&document);
        self.homes.retain(|_, d| *d != document);
        tracing::debug!(?document, "document closed");
    }

    /// Refreshes cached labels of objects marked on the label channel.
    fn refresh_labels(&mut self, model: &dyn DocumentModel) -> Vec<ObjectId> {
        let marked: Vec<ObjectId> = self
            .dirty
            .drain(dirty::LABEL)
            .deterministic()
            .run()
            .collect();
        let mut relabeled = Vec::new();
        for object in marked {
            if !model.contains(object) || self.record(object).is_none() {
                continue;
            }
            let label = model.label(object);
            let label2 = model.label2(object);
            if let Some(record) = self.record_mut(object) {
                if record.label != label || record.label2 != label2 {
                    record.label = label;
                    record.label2 = label2;
                    relabeled.push(object);
                }
            }
        }
        relabeled
    }
}
