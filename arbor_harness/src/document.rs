// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory document model.
//!
//! [`MemoryDocument`] holds any number of documents and their objects in
//! plain maps. Every change, whether made through the builder methods or
//! through [`GraphMutator::apply`], queues the [`ProjectionEvent`]s a real
//! document would emit; [`MemoryDocument::drain_events`] hands them over so
//! a test can post them to a [`Forest`](arbor_core::forest::Forest).

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use arbor_core::drop::MutationRequest;
use arbor_core::error::MutationError;
use arbor_core::forest::ProjectionEvent;
use arbor_core::id::{DocumentId, INVALID, ObjectId};
use arbor_core::model::{DocumentModel, GraphMutator};

#[derive(Clone, Debug)]
struct ObjectSpec {
    document: DocumentId,
    name: String,
    label: String,
    label2: String,
    claims: Vec<ObjectId>,
    removes_from_root: bool,
    grouping: bool,
    accepts_drops: bool,
    reorderable: bool,
    replaceable: bool,
    sub_objects: Vec<String>,
}

/// Documents and objects held in memory.
///
/// Builder methods panic when handed an object that does not exist;
/// [`GraphMutator::apply`] reports it as a [`MutationError`] instead.
#[derive(Clone, Debug, Default)]
pub struct MemoryDocument {
    documents: BTreeMap<DocumentId, String>,
    objects: BTreeMap<ObjectId, ObjectSpec>,
    /// Creation order across all documents.
    order: Vec<ObjectId>,
    next_document: u32,
    next_object: u64,
    events: Vec<ProjectionEvent>,
    applied: Vec<MutationRequest>,
    read_only: bool,
}

impl MemoryDocument {
    /// Creates an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Building --

    /// Adds a document called `name`.
    pub fn add_document(&mut self, name: &str) -> DocumentId {
        let id = DocumentId(self.next_document);
        self.next_document += 1;
        self.documents.insert(id, name.to_string());
        id
    }

    /// Adds an object called `name` to `document`. Its label is its name.
    ///
    /// # Panics
    ///
    /// Panics if `document` is unknown or already holds an object of that
    /// name.
    pub fn add_object(&mut self, document: DocumentId, name: &str) -> ObjectId {
        assert!(
            self.documents.contains_key(&document),
            "unknown document {document:?}"
        );
        assert!(
            self.object_named(document, name).is_none(),
            "duplicate object name {name:?}"
        );
        self.insert_object(ObjectSpec {
            document,
            name: name.to_string(),
            label: name.to_string(),
            label2: String::new(),
            claims: Vec::new(),
            removes_from_root: true,
            grouping: false,
            accepts_drops: true,
            reorderable: true,
            replaceable: false,
            sub_objects: Vec::new(),
        })
    }

    /// Appends `child` to the claims of `parent`.
    pub fn claim(&mut self, parent: ObjectId, child: ObjectId) {
        self.spec_mut(parent).claims.push(child);
        self.events.push(ProjectionEvent::ClaimsChanged(parent));
    }

    /// Removes every claim of `parent` on `child`.
    pub fn unclaim(&mut self, parent: ObjectId, child: ObjectId) {
        self.spec_mut(parent).claims.retain(|&c| c != child);
        self.events.push(ProjectionEvent::ClaimsChanged(parent));
    }

    /// Replaces the claims of `parent`.
    pub fn set_claims(&mut self, parent: ObjectId, claims: &[ObjectId]) {
        self.spec_mut(parent).claims = claims.to_vec();
        self.events.push(ProjectionEvent::ClaimsChanged(parent));
    }

    /// Sets whether objects claimed by `object` leave the top level.
    pub fn set_removes_from_root(&mut self, object: ObjectId, removes: bool) {
        self.spec_mut(object).removes_from_root = removes;
        self.events.push(ProjectionEvent::ClaimsChanged(object));
    }

    /// Marks `object` as a grouping, transparent for sub paths.
    pub fn set_grouping(&mut self, object: ObjectId, grouping: bool) {
        self.spec_mut(object).grouping = grouping;
    }

    /// Sets the primary label of `object`.
    pub fn set_label(&mut self, object: ObjectId, label: &str) {
        self.spec_mut(object).label = label.to_string();
        self.events.push(ProjectionEvent::ObjectRenamed(object));
    }

    /// Sets the secondary label of `object`.
    pub fn set_label2(&mut self, object: ObjectId, label2: &str) {
        self.spec_mut(object).label2 = label2.to_string();
        self.events.push(ProjectionEvent::ObjectRenamed(object));
    }

    /// Sets whether `object` accepts dropped children.
    pub fn set_accepts_drops(&mut self, object: ObjectId, accepts: bool) {
        self.spec_mut(object).accepts_drops = accepts;
    }

    /// Sets whether `object` may be reordered among its siblings.
    pub fn set_reorderable(&mut self, object: ObjectId, reorderable: bool) {
        self.spec_mut(object).reorderable = reorderable;
    }

    /// Sets whether `object` lets its children be replaced by drops.
    pub fn set_replaceable(&mut self, object: ObjectId, replaceable: bool) {
        self.spec_mut(object).replaceable = replaceable;
    }

    /// Declares an element `name` (a face, an edge) on `object`.
    pub fn add_sub_object(&mut self, object: ObjectId, name: &str) {
        self.spec_mut(object).sub_objects.push(name.to_string());
    }

    /// Deletes `object` and every claim on it.
    pub fn remove_object(&mut self, object: ObjectId) {
        if self.objects.remove(&object).is_none() {
            return;
        }
        self.order.retain(|&o| o != object);
        let claimants: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, spec)| spec.claims.contains(&object))
            .map(|(&o, _)| o)
            .collect();
        for claimant in claimants {
            self.spec_mut(claimant).claims.retain(|&c| c != object);
            self.events.push(ProjectionEvent::ClaimsChanged(claimant));
        }
        self.events.push(ProjectionEvent::ObjectRemoved(object));
    }

    /// Deletes every object of `document` and queues a reset. Claims other
    /// documents hold on them are removed silently, as a reloaded document
    /// would.
    pub fn clear_document(&mut self, document: DocumentId) {
        let doomed: Vec<ObjectId> = self.objects_of(document);
        for object in &doomed {
            self.objects.remove(object);
        }
        self.order.retain(|o| !doomed.contains(o));
        for spec in self.objects.values_mut() {
            spec.claims.retain(|c| !doomed.contains(c));
        }
        self.events.push(ProjectionEvent::DocumentReset(document));
    }

    /// Makes [`GraphMutator::apply`] fail until cleared.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    // -- Queries --

    /// Returns the object of `document` called `name`.
    #[must_use]
    pub fn object_named(&self, document: DocumentId, name: &str) -> Option<ObjectId> {
        self.order.iter().copied().find(|o| {
            self.objects
                .get(o)
                .is_some_and(|s| s.document == document && s.name == name)
        })
    }

    /// Returns the current claims of `object`.
    #[must_use]
    pub fn claims(&self, object: ObjectId) -> &[ObjectId] {
        self.objects
            .get(&object)
            .map(|s| s.claims.as_slice())
            .unwrap_or(&[])
    }

    /// Returns every request applied so far, in order.
    #[must_use]
    pub fn applied(&self) -> &[MutationRequest] {
        &self.applied
    }

    /// Takes the notifications queued since the last call.
    pub fn drain_events(&mut self) -> Vec<ProjectionEvent> {
        core::mem::take(&mut self.events)
    }

    // -- Internals --

    fn insert_object(&mut self, spec: ObjectSpec) -> ObjectId {
        let id = ObjectId(self.next_object);
        self.next_object += 1;
        self.objects.insert(id, spec);
        self.order.push(id);
        self.events.push(ProjectionEvent::ObjectAdded(id));
        id
    }

    fn spec(&self, object: ObjectId) -> Option<&ObjectSpec> {
        self.objects.get(&object)
    }

    fn spec_mut(&mut self, object: ObjectId) -> &mut ObjectSpec {
        match self.objects.get_mut(&object) {
            Some(spec) => spec,
            None => panic!("unknown object {object:?}"),
        }
    }

    fn objects_of(&self, document: DocumentId) -> Vec<ObjectId> {
        self.order
            .iter()
            .copied()
            .filter(|o| self.objects.get(o).is_some_and(|s| s.document == document))
            .collect()
    }

    /// Returns `base`, or `base` with the smallest numeric suffix that is
    /// free in `document`.
    fn unique_name(&self, document: DocumentId, base: &str) -> String {
        if self.object_named(document, base).is_none() {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}{n:03}"))
            .find(|name| self.object_named(document, name).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    fn check(&self, object: ObjectId) -> Result<(), MutationError> {
        if self.objects.contains_key(&object) {
            Ok(())
        } else {
            Err(MutationError::new(format!("unknown object {object:?}")))
        }
    }

    fn reparent(
        &mut self,
        object: ObjectId,
        from: Option<ObjectId>,
        to: Option<ObjectId>,
        index: Option<usize>,
    ) -> Result<(), MutationError> {
        self.check(object)?;
        if let Some(to) = to {
            self.check(to)?;
        }
        if let Some(from) = from {
            self.check(from)?;
            self.spec_mut(from).claims.retain(|&c| c != object);
            self.events.push(ProjectionEvent::ClaimsChanged(from));
        }
        if let Some(to) = to {
            let claims = &mut self.spec_mut(to).claims;
            match index {
                Some(i) => claims.insert(i.min(claims.len()), object),
                None => claims.push(object),
            }
            self.events.push(ProjectionEvent::ClaimsChanged(to));
        }
        Ok(())
    }

    fn add_reference(
        &mut self,
        object: ObjectId,
        into: Option<ObjectId>,
        document: DocumentId,
    ) -> Result<(), MutationError> {
        self.check(object)?;
        match into {
            Some(into) => {
                self.check(into)?;
                let claims = &mut self.spec_mut(into).claims;
                if !claims.contains(&object) {
                    claims.push(object);
                }
                self.events.push(ProjectionEvent::ClaimsChanged(into));
            }
            None => {
                // A top-level reference is a link object of its own.
                let Some(source) = self.spec(object).cloned() else {
                    return Err(MutationError::new("source vanished"));
                };
                let name = self.unique_name(document, &format!("{}_Link", source.name));
                self.insert_object(ObjectSpec {
                    document,
                    label: source.label,
                    label2: String::new(),
                    claims: alloc::vec![object],
                    removes_from_root: false,
                    grouping: false,
                    sub_objects: Vec::new(),
                    name,
                    ..source
                });
            }
        }
        Ok(())
    }

    fn duplicate(
        &mut self,
        object: ObjectId,
        into: Option<ObjectId>,
        document: DocumentId,
    ) -> Result<(), MutationError> {
        self.check(object)?;
        if let Some(into) = into {
            self.check(into)?;
        }
        let Some(source) = self.spec(object).cloned() else {
            return Err(MutationError::new("source vanished"));
        };
        let name = self.unique_name(document, &source.name);
        let claims = if source.document == document {
            source.claims.clone()
        } else {
            Vec::new()
        };
        let copy = self.insert_object(ObjectSpec {
            document,
            name,
            claims,
            ..source
        });
        if let Some(into) = into {
            self.spec_mut(into).claims.push(copy);
            self.events.push(ProjectionEvent::ClaimsChanged(into));
        }
        Ok(())
    }

    fn reorder(
        &mut self,
        parent: Option<ObjectId>,
        document: DocumentId,
        order: &[ObjectId],
    ) -> Result<(), MutationError> {
        match parent {
            Some(parent) => {
                self.check(parent)?;
                let claims = &mut self.spec_mut(parent).claims;
                *claims = follow_order(claims, order);
                self.events.push(ProjectionEvent::ClaimsChanged(parent));
            }
            None => {
                self.order = follow_order(&self.order, order);
                self.events.push(ProjectionEvent::DocumentReset(document));
            }
        }
        Ok(())
    }
}

/// Rewrites the slots of `current` that hold a member of `order` so they
/// follow `order`, leaving every other slot in place.
fn follow_order(current: &[ObjectId], order: &[ObjectId]) -> Vec<ObjectId> {
    let mut next = order.iter().copied().filter(|o| current.contains(o));
    current
        .iter()
        .map(|&o| {
            if order.contains(&o) {
                next.next().unwrap_or(o)
            } else {
                o
            }
        })
        .collect()
}

impl DocumentModel for MemoryDocument {
    fn contains(&self, object: ObjectId) -> bool {
        self.objects.contains_key(&object)
    }

    fn document_of(&self, object: ObjectId) -> DocumentId {
        self.spec(object)
            .map_or(DocumentId(INVALID), |s| s.document)
    }

    fn document_name(&self, document: DocumentId) -> String {
        self.documents.get(&document).cloned().unwrap_or_default()
    }

    fn objects(&self, document: DocumentId) -> Vec<ObjectId> {
        self.objects_of(document)
    }

    fn name(&self, object: ObjectId) -> String {
        self.spec(object).map(|s| s.name.clone()).unwrap_or_default()
    }

    fn label(&self, object: ObjectId) -> String {
        self.spec(object).map(|s| s.label.clone()).unwrap_or_default()
    }

    fn label2(&self, object: ObjectId) -> String {
        self.spec(object).map(|s| s.label2.clone()).unwrap_or_default()
    }

    fn claimed_children(&self, object: ObjectId) -> Vec<ObjectId> {
        self.claims(object).to_vec()
    }

    fn remove_children_from_root(&self, object: ObjectId) -> bool {
        self.spec(object).is_none_or(|s| s.removes_from_root)
    }

    fn can_drop_object(&self, target: ObjectId, source: ObjectId) -> bool {
        target != source && self.spec(target).is_some_and(|s| s.accepts_drops)
    }

    fn can_replace(&self, owner: ObjectId, target: ObjectId, source: ObjectId) -> bool {
        target != source && self.spec(owner).is_some_and(|s| s.replaceable)
    }

    fn can_reorder(&self, target: ObjectId, source: ObjectId) -> bool {
        target != source && self.spec(source).is_some_and(|s| s.reorderable)
    }

    fn is_grouping(&self, object: ObjectId) -> bool {
        self.spec(object).is_some_and(|s| s.grouping)
    }

    fn sub_object_exists(&self, object: ObjectId, name: &str) -> bool {
        self.spec(object)
            .is_some_and(|s| s.sub_objects.iter().any(|n| n == name))
    }
}

impl GraphMutator for MemoryDocument {
    fn apply(&mut self, request: &MutationRequest) -> Result<(), MutationError> {
        if self.read_only {
            return Err(MutationError::new("document is read-only"));
        }
        match request {
            MutationRequest::Reparent {
                object,
                from,
                to,
                index,
                ..
            } => self.reparent(*object, *from, *to, *index)?,
            MutationRequest::AddReference {
                object,
                into,
                document,
            } => self.add_reference(*object, *into, *document)?,
            MutationRequest::Duplicate {
                object,
                into,
                document,
            } => self.duplicate(*object, *into, *document)?,
            MutationRequest::Detach { object, from } => {
                self.check(*from)?;
                self.spec_mut(*from).claims.retain(|c| c != object);
                self.events.push(ProjectionEvent::ClaimsChanged(*from));
            }
            MutationRequest::Reorder {
                parent,
                document,
                order,
            } => self.reorder(*parent, *document, order)?,
        }
        tracing::debug!(?request, "mutation applied");
        self.applied.push(request.clone());
        Ok(())
    }
}
