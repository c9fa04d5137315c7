// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The projection registry.
//!
//! A [`Forest`] owns every piece of projection state: the node arena, one
//! [`Container`] per attached document, the claim index, and the queue of
//! pending document notifications. There is no global registry; each view
//! owns its own forest.
//!
//! Document notifications only enqueue (see [`Forest::post`]). Structural
//! work happens in [`Forest::flush`], which is implemented in the `project`
//! module.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;

use understory_dirty::{CycleHandling, DirtyTracker};

use crate::claims::{ClaimIndex, ClaimUpdate};
use crate::config::ProjectorConfig;
use crate::container::Container;
use crate::dirty;
use crate::error::{ProjectionError, StructuralError};
use crate::id::{DocumentId, INVALID, NodeId, ObjectId};
use crate::model::DocumentModel;
use crate::node::{ChildIndicator, NodeStore};
use crate::record::ObjectRecord;
use crate::select::SelectionEntry;
use crate::trace::Tracer;
use crate::traverse::{Ancestors, Children};

/// A document notification.
///
/// Events are coalesced per object until the next [`Forest::flush`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProjectionEvent {
    /// An object was created.
    ObjectAdded(ObjectId),
    /// An object was deleted.
    ObjectRemoved(ObjectId),
    /// The claimed children of an object (or its remove-from-root policy)
    /// changed.
    ClaimsChanged(ObjectId),
    /// The display labels of an object changed.
    ObjectRenamed(ObjectId),
    /// A document's content was replaced wholesale; every object is
    /// re-queried.
    DocumentReset(DocumentId),
    /// A document was closed; its container and every node realizing one of
    /// its objects are discarded.
    DocumentClosed(DocumentId),
}

/// What changed during one [`Forest::flush`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Monotonic flush counter.
    pub flush_index: u64,
    /// Objects processed, in claimant-before-claimed order.
    pub processed: Vec<ObjectId>,
    /// Nodes created, in creation order.
    pub created: Vec<NodeId>,
    /// Nodes destroyed, in destruction order. Their handles are stale.
    pub destroyed: Vec<NodeId>,
    /// Objects whose record was dropped with its last node.
    pub records_gone: Vec<ObjectId>,
    /// Structural anomalies detected and skipped.
    pub structural_errors: Vec<StructuralError>,
    /// Objects whose cached labels were refreshed.
    pub relabeled: Vec<ObjectId>,
    /// Whether the selection marks changed.
    pub selection_changed: bool,
}

impl FlushReport {
    /// Returns whether the flush changed nothing visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.destroyed.is_empty()
            && self.records_gone.is_empty()
            && self.structural_errors.is_empty()
            && self.relabeled.is_empty()
            && !self.selection_changed
    }
}

/// Tree projection of one or more documents.
#[derive(Debug)]
pub struct Forest {
    pub(crate) config: ProjectorConfig,
    pub(crate) nodes: NodeStore,
    pub(crate) containers: BTreeMap<DocumentId, Container>,
    /// Documents whose top level is projected.
    pub(crate) attached: BTreeSet<DocumentId>,
    /// Document of every object that currently has a record.
    pub(crate) homes: BTreeMap<ObjectId, DocumentId>,
    pub(crate) claims: ClaimIndex,

    // -- Pending notifications --
    pub(crate) dirty: DirtyTracker<ObjectId>,
    pub(crate) dirty_claims: BTreeSet<ObjectId>,
    pub(crate) pending_removed: Vec<ObjectId>,
    pub(crate) pending_resets: Vec<DocumentId>,
    pub(crate) pending_closed: Vec<DocumentId>,
    pub(crate) labels_pending: bool,

    // -- Per-flush scratch --
    /// Detached nodes waiting to be reused by another parent.
    pub(crate) parked: BTreeMap<ObjectId, Vec<NodeId>>,
    /// Detached nodes that may not be reused.
    pub(crate) orphaned: Vec<NodeId>,
    /// Objects that lost or gained nodes and need root reconciliation.
    pub(crate) touched: BTreeSet<ObjectId>,
    pub(crate) records_gone: Vec<ObjectId>,
    pub(crate) structural_errors: Vec<StructuralError>,

    pub(crate) selection: Vec<SelectionEntry>,
    pub(crate) flush_index: u64,
}

impl Default for Forest {
    fn default() -> Self {
        Self::new(ProjectorConfig::default())
    }
}

impl Forest {
    /// Creates an empty forest.
    #[must_use]
    pub fn new(config: ProjectorConfig) -> Self {
        Self {
            config,
            nodes: NodeStore::new(),
            containers: BTreeMap::new(),
            attached: BTreeSet::new(),
            homes: BTreeMap::new(),
            claims: ClaimIndex::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            dirty_claims: BTreeSet::new(),
            pending_removed: Vec::new(),
            pending_resets: Vec::new(),
            pending_closed: Vec::new(),
            labels_pending: false,
            parked: BTreeMap::new(),
            orphaned: Vec::new(),
            touched: BTreeSet::new(),
            records_gone: Vec::new(),
            structural_errors: Vec::new(),
            selection: Vec::new(),
            flush_index: 0,
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    /// Replaces the configuration. Takes effect on the next call that
    /// consults it.
    pub fn set_config(&mut self, config: ProjectorConfig) {
        self.config = config;
    }

    // -- Documents --

    /// Starts projecting `document`. Its objects are projected by the next
    /// flush. Attaching an already attached document re-queries it.
    pub fn attach_document(&mut self, document: DocumentId) {
        self.attached.insert(document);
        self.containers
            .entry(document)
            .or_insert_with(|| Container::new(document));
        self.post(ProjectionEvent::DocumentReset(document));
    }

    /// Stops projecting `document` at the next flush.
    pub fn detach_document(&mut self, document: DocumentId) {
        self.post(ProjectionEvent::DocumentClosed(document));
    }

    /// Returns whether `document` is attached.
    #[must_use]
    pub fn is_attached_document(&self, document: DocumentId) -> bool {
        self.attached.contains(&document)
    }

    /// Returns the container of `document`, if it has one.
    ///
    /// Documents that are not attached still get a container holding the
    /// records of objects shown below another document's nodes.
    #[must_use]
    pub fn container(&self, document: DocumentId) -> Option<&Container> {
        self.containers.get(&document)
    }

    /// Returns an iterator over all containers, ordered by document.
    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    /// Returns the top-level nodes of `document`, or an empty slice if it is
    /// not attached.
    #[must_use]
    pub fn roots(&self, document: DocumentId) -> &[NodeId] {
        self.containers
            .get(&document)
            .map(Container::top_level)
            .unwrap_or(&[])
    }

    // -- Notifications --

    /// Enqueues a document notification.
    ///
    /// Nothing structural happens until the next [`flush`](Self::flush).
    /// Notifications for the same object coalesce.
    pub fn post(&mut self, event: ProjectionEvent) {
        match event {
            ProjectionEvent::ObjectAdded(object) | ProjectionEvent::ClaimsChanged(object) => {
                self.pending_removed.retain(|&o| o != object);
                self.dirty.mark(object, dirty::CLAIMS);
                self.dirty.mark(object, dirty::LABEL);
                self.labels_pending = true;
                self.dirty_claims.insert(object);
            }
            ProjectionEvent::ObjectRemoved(object) => {
                self.dirty_claims.remove(&object);
                if !self.pending_removed.contains(&object) {
                    self.pending_removed.push(object);
                }
            }
            ProjectionEvent::ObjectRenamed(object) => {
                self.dirty.mark(object, dirty::LABEL);
                self.labels_pending = true;
            }
            ProjectionEvent::DocumentReset(document) => {
                if !self.pending_resets.contains(&document) {
                    self.pending_resets.push(document);
                }
            }
            ProjectionEvent::DocumentClosed(document) => {
                self.pending_resets.retain(|&d| d != document);
                if !self.pending_closed.contains(&document) {
                    self.pending_closed.push(document);
                }
            }
        }
    }

    /// Shorthand for posting [`ProjectionEvent::ObjectAdded`].
    pub fn on_object_added(&mut self, object: ObjectId) {
        self.post(ProjectionEvent::ObjectAdded(object));
    }

    /// Shorthand for posting [`ProjectionEvent::ObjectRemoved`].
    pub fn on_object_removed(&mut self, object: ObjectId) {
        self.post(ProjectionEvent::ObjectRemoved(object));
    }

    /// Shorthand for posting [`ProjectionEvent::ClaimsChanged`].
    pub fn on_claims_changed(&mut self, object: ObjectId) {
        self.post(ProjectionEvent::ClaimsChanged(object));
    }

    /// Shorthand for posting [`ProjectionEvent::ObjectRenamed`].
    pub fn on_object_renamed(&mut self, object: ObjectId) {
        self.post(ProjectionEvent::ObjectRenamed(object));
    }

    /// Shorthand for posting [`ProjectionEvent::DocumentReset`].
    pub fn on_document_reset(&mut self, document: DocumentId) {
        self.post(ProjectionEvent::DocumentReset(document));
    }

    /// Returns whether any notification, or any object a previous flush
    /// could not settle, awaits a flush.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.dirty_claims.is_empty()
            || !self.touched.is_empty()
            || !self.pending_removed.is_empty()
            || !self.pending_resets.is_empty()
            || !self.pending_closed.is_empty()
            || self.labels_pending
    }

    // -- Records --

    /// Returns the record of `object`, if it currently has nodes.
    #[must_use]
    pub fn record(&self, object: ObjectId) -> Option<&ObjectRecord> {
        let document = self.homes.get(&object)?;
        self.containers.get(document)?.record(object)
    }

    /// Returns every node realizing `object`.
    #[must_use]
    pub fn nodes_of(&self, object: ObjectId) -> &[NodeId] {
        self.record(object)
            .map(ObjectRecord::instances)
            .unwrap_or(&[])
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.alive.iter().filter(|&&a| a).count()
    }

    // -- Node accessors --

    /// Returns whether `node` refers to a live node.
    #[must_use]
    pub fn is_alive(&self, node: NodeId) -> bool {
        self.nodes.is_alive(node)
    }

    /// Returns the object `node` realizes.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    #[must_use]
    pub fn object(&self, node: NodeId) -> ObjectId {
        self.nodes.validate(node);
        self.nodes.object[node.idx as usize]
    }

    /// Returns the document whose container `node` belongs to.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    #[must_use]
    pub fn owner(&self, node: NodeId) -> DocumentId {
        self.nodes.validate(node);
        self.nodes.owner[node.idx as usize]
    }

    /// Returns the parent of `node`, or `None` for a top-level node.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.validate(node);
        let p = self.nodes.parent[node.idx as usize];
        (p != INVALID).then(|| self.nodes.id_of(p))
    }

    /// Returns an iterator over the children of `node`, in claim order.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Children<'_> {
        self.nodes.validate(node);
        Children::new(&self.nodes, node.idx)
    }

    /// Returns an iterator over the ancestors of `node`, nearest first.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    #[must_use]
    pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
        self.nodes.validate(node);
        Ancestors::new(&self.nodes, node.idx)
    }

    /// Returns whether the children of `node` have been materialized.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    #[must_use]
    pub fn is_populated(&self, node: NodeId) -> bool {
        self.nodes.validate(node);
        self.nodes.populated[node.idx as usize]
    }

    /// Returns whether `node` is expanded in the view.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    #[must_use]
    pub fn is_expanded(&self, node: NodeId) -> bool {
        self.nodes.validate(node);
        self.nodes.expanded[node.idx as usize]
    }

    /// Returns whether the view should draw an expander for `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    #[must_use]
    pub fn indicator(&self, node: NodeId) -> ChildIndicator {
        self.nodes.validate(node);
        self.nodes.indicator[node.idx as usize]
    }

    /// Returns whether `node` is selected as a whole.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    #[must_use]
    pub fn is_selected(&self, node: NodeId) -> bool {
        self.nodes.validate(node);
        self.nodes.selected_whole[node.idx as usize]
    }

    /// Returns whether a selected node or sub path lies below `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    #[must_use]
    pub fn is_selection_ancestor(&self, node: NodeId) -> bool {
        self.nodes.validate(node);
        self.nodes.selection_ancestor[node.idx as usize]
    }

    /// Returns the selected element sub paths of `node`, in sorted order.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    pub fn sub_paths(&self, node: NodeId) -> impl Iterator<Item = &str> {
        self.nodes.validate(node);
        self.nodes.sub_paths[node.idx as usize]
            .iter()
            .map(String::as_str)
    }

    /// Sets the expansion flag of `node`. Expanding populates the node.
    pub fn set_expanded(
        &mut self,
        model: &dyn DocumentModel,
        node: NodeId,
        expanded: bool,
    ) -> Result<(), ProjectionError> {
        if !self.nodes.is_alive(node) {
            return Err(ProjectionError::StaleNode(node));
        }
        self.nodes.expanded[node.idx as usize] = expanded;
        if expanded {
            let mut tracer = Tracer::none();
            self.populate_idx(model, node.idx, true, &mut tracer);
            self.stabilize(model, Vec::new(), &mut tracer);
        }
        Ok(())
    }

    // -- Record bookkeeping --

    pub(crate) fn record_mut(&mut self, object: ObjectId) -> Option<&mut ObjectRecord> {
        let document = self.homes.get(&object)?;
        self.containers
            .get_mut(document)?
            .object_index
            .get_mut(&object)
    }

    pub(crate) fn ensure_container(&mut self, document: DocumentId) -> &mut Container {
        self.containers
            .entry(document)
            .or_insert_with(|| Container::new(document))
    }

    /// Re-reads the claims of `object` into the claim index, mirrors them as
    /// dependency edges, and refreshes the record baseline.
    pub(crate) fn refresh_claims(
        &mut self,
        model: &dyn DocumentModel,
        object: ObjectId,
    ) -> ClaimUpdate {
        let document = model.document_of(object);
        let claimed: Vec<ObjectId> = model
            .claimed_children(object)
            .into_iter()
            .filter(|&c| model.contains(c))
            .collect();
        let removes = model.remove_children_from_root(object);
        let old: Vec<ObjectId> = self.claims.children(object).to_vec();
        let update = self.claims.update(object, document, &claimed, removes);

        let accepted = self.claims.children(object);
        for &child in &old {
            if !accepted.contains(&child) {
                self.dirty.remove_dependency(child, object, dirty::CLAIMS);
            }
        }
        for &child in accepted {
            if !old.contains(&child) {
                let _ = self.dirty.add_dependency(child, object, dirty::CLAIMS);
            }
        }
        let accepted = accepted.to_vec();

        for &child in &update.rejected {
            self.report_structural(StructuralError::ClaimCycle {
                parent: object,
                child,
            });
        }
        if let Some(record) = self.record_mut(object) {
            record.claimed_children = accepted;
            record.remove_children_from_root = removes;
        }
        update
    }

    /// Creates the record of `object` if needed. Returns `false` if the
    /// object no longer resolves.
    pub(crate) fn acquire_record(&mut self, model: &dyn DocumentModel, object: ObjectId) -> bool {
        if self.homes.contains_key(&object) {
            return true;
        }
        if !model.contains(object) {
            return false;
        }
        if !self.claims.contains(object) {
            self.refresh_claims(model, object);
        }
        let document = model.document_of(object);
        let mut record = ObjectRecord::new(object);
        record.label = model.label(object);
        record.label2 = model.label2(object);
        record.claimed_children = self.claims.children(object).to_vec();
        record.remove_children_from_root = self
            .claims
            .entry(object)
            .is_none_or(|e| e.removes_from_root);
        self.ensure_container(document)
            .object_index
            .insert(object, record);
        self.homes.insert(object, document);
        true
    }

    /// Allocates a detached node for `object` owned by `owner`'s container.
    pub(crate) fn create_instance(
        &mut self,
        model: &dyn DocumentModel,
        object: ObjectId,
        owner: DocumentId,
    ) -> Option<u32> {
        if !self.acquire_record(model, object) {
            return None;
        }
        let idx = self.nodes.create_node(owner, object);
        let id = self.nodes.id_of(idx);
        if let Some(record) = self.record_mut(object) {
            record.add_instance(id);
        }
        self.touched.insert(object);
        Some(idx)
    }

    /// Attaches a detached node of `object` to its document's top level and
    /// makes it the root instance.
    pub(crate) fn attach_root(&mut self, object: ObjectId, idx: u32) {
        let id = self.nodes.id_of(idx);
        let Some(&document) = self.homes.get(&object) else {
            return;
        };
        let container = self.ensure_container(document);
        let rank = container.rank_of(object);
        container.insert_top_level(id, rank);
        if let Some(record) = self.record_mut(object) {
            record.root_instance = Some(id);
        }
    }

    /// Detaches a root instance from its container's top level.
    pub(crate) fn detach_root(&mut self, idx: u32) {
        let id = self.nodes.id_of(idx);
        let object = self.nodes.object[idx as usize];
        let owner = self.nodes.owner[idx as usize];
        if let Some(container) = self.containers.get_mut(&owner) {
            container.remove_top_level(id);
        }
        if let Some(record) = self.record_mut(object) {
            if record.root_instance == Some(id) {
                record.root_instance = None;
                record.forced_root = false;
            }
        }
    }

    /// Destroys `idx` and its whole subtree, releasing records as their
    /// last node goes away.
    pub(crate) fn destroy_subtree(&mut self, idx: u32) {
        self.nodes.unlink_from_parent(idx);
        let kids = core::mem::take(&mut self.nodes.children[idx as usize]);
        for kid in kids {
            self.nodes.parent[kid as usize] = INVALID;
            self.destroy_subtree(kid);
        }
        self.release_instance(idx);
    }

    /// Frees one detached, childless node.
    fn release_instance(&mut self, idx: u32) {
        let id = self.nodes.id_of(idx);
        let object = self.nodes.object[idx as usize];
        self.detach_root(idx);
        let empty = self
            .record_mut(object)
            .is_some_and(|record| record.remove_instance(id));
        if empty {
            if let Some(document) = self.homes.remove(&object) {
                if let Some(container) = self.containers.get_mut(&document) {
                    container.object_index.remove(&object);
                }
            }
            tracing::debug!(?object, "record gone");
            self.records_gone.push(object);
        }
        if let Some(list) = self.parked.get_mut(&object) {
            list.retain(|&p| p != id);
        }
        self.orphaned.retain(|&p| p != id);
        self.touched.insert(object);
        self.nodes.destroy_node(idx);
    }

    /// Records and logs a structural anomaly.
    pub(crate) fn report_structural(&mut self, error: StructuralError) {
        tracing::warn!(%error, "structural error");
        self.structural_errors.push(error);
    }

    /// Returns whether `idx` hangs (transitively) below a top-level node.
    pub(crate) fn is_attached(&self, idx: u32) -> bool {
        let root = self.nodes.root_of(idx);
        let object = self.nodes.object[root as usize];
        self.record(object)
            .is_some_and(|r| r.root_instance == Some(self.nodes.id_of(root)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posting_coalesces_per_object() {
        let mut forest = Forest::default();
        assert!(!forest.has_pending());
        forest.on_object_added(ObjectId(1));
        forest.on_claims_changed(ObjectId(1));
        forest.on_claims_changed(ObjectId(1));
        assert!(forest.has_pending());
        assert_eq!(forest.dirty_claims.len(), 1);
    }

    #[test]
    fn unsettled_objects_keep_a_flush_pending() {
        let mut forest = Forest::default();
        forest.touched.insert(ObjectId(4));
        assert!(forest.has_pending());
    }

    #[test]
    fn removal_cancels_pending_claims() {
        let mut forest = Forest::default();
        forest.on_claims_changed(ObjectId(1));
        forest.on_object_removed(ObjectId(1));
        forest.on_object_removed(ObjectId(1));
        assert!(forest.dirty_claims.is_empty());
        assert_eq!(forest.pending_removed, [ObjectId(1)]);

        // Re-adding resurrects the object.
        forest.on_object_added(ObjectId(1));
        assert!(forest.pending_removed.is_empty());
    }

    #[test]
    fn close_supersedes_reset() {
        let mut forest = Forest::default();
        forest.attach_document(DocumentId(3));
        assert!(forest.container(DocumentId(3)).is_some());
        forest.detach_document(DocumentId(3));
        assert!(forest.pending_resets.is_empty());
        assert_eq!(forest.pending_closed, [DocumentId(3)]);
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn stale_node_access_panics() {
        let forest = Forest::default();
        let _ = forest.object(NodeId {
            idx: 0,
            generation: 0,
        });
    }
}
