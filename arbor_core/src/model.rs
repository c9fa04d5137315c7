// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborator contracts for the document model.
//!
//! The projection never owns document objects. Everything it knows about
//! them is obtained through two narrow traits:
//!
//! - [`DocumentModel`] — read-only queries: which objects exist, what they
//!   claim, how they are named, and the per-type drag/drop and addressing
//!   predicates.
//!
//! - [`GraphMutator`] — applies the primitive [`MutationRequest`]s produced
//!   by the drag-and-drop planner. The mutator changes the document; the
//!   caller then posts the resulting events back to the
//!   [`Forest`](crate::forest::Forest).
//!
//! # Event loop pseudocode
//!
//! ```rust,ignore
//! fn on_document_changed(event: ProjectionEvent) {
//!     // Mutation callbacks only enqueue; repeated changes coalesce.
//!     forest.post(event);
//! }
//!
//! fn on_idle() {
//!     // One deferred flush per UI tick.
//!     if forest.has_pending() {
//!         let report = forest.flush(&document);
//!         view.refresh(&forest, &report);
//!     }
//! }
//!
//! fn on_drop(request: DropRequest) {
//!     let plan = forest.plan_drop(&document, &request);
//!     if !plan.is_rejected() {
//!         execute_plan(&plan, &mut document)?;
//!     }
//! }
//! ```

use alloc::string::String;
use alloc::vec::Vec;

use crate::drop::MutationRequest;
use crate::error::MutationError;
use crate::id::{DocumentId, ObjectId};

/// Read-only view of the document graph consumed by the projection.
///
/// Implementations must be deterministic: the same graph state must always
/// produce the same answers in the same order.
pub trait DocumentModel {
    /// Returns whether `object` still resolves in its document.
    ///
    /// Objects that no longer resolve are treated as removed.
    fn contains(&self, object: ObjectId) -> bool;

    /// Returns the document that owns `object`.
    fn document_of(&self, object: ObjectId) -> DocumentId;

    /// Returns the display name of a document, used to qualify
    /// cross-document path segments.
    fn document_name(&self, document: DocumentId) -> String;

    /// Returns all objects of `document` in creation order.
    fn objects(&self, document: DocumentId) -> Vec<ObjectId>;

    /// Returns the internal name of `object`, unique within its document.
    fn name(&self, object: ObjectId) -> String;

    /// Returns the primary display label of `object`.
    fn label(&self, object: ObjectId) -> String;

    /// Returns the secondary display label of `object`.
    fn label2(&self, object: ObjectId) -> String {
        _ = object;
        String::new()
    }

    /// Returns the ordered list of objects claimed by `object`.
    fn claimed_children(&self, object: ObjectId) -> Vec<ObjectId>;

    /// Returns whether children claimed by `object` are removed from the
    /// document's top level.
    fn remove_children_from_root(&self, object: ObjectId) -> bool {
        _ = object;
        true
    }

    /// Returns whether `target` accepts `source` as a dropped child.
    fn can_drop_object(&self, target: ObjectId, source: ObjectId) -> bool;

    /// Returns whether `owner` allows `source` to replace its child `target`.
    fn can_replace(&self, owner: ObjectId, target: ObjectId, source: ObjectId) -> bool {
        _ = (owner, target, source);
        false
    }

    /// Returns whether `source` may be reordered next to its sibling `target`.
    fn can_reorder(&self, target: ObjectId, source: ObjectId) -> bool {
        _ = (target, source);
        false
    }

    /// Returns whether `object` is a grouping node, transparent for
    /// sub-path addressing.
    fn is_grouping(&self, object: ObjectId) -> bool;

    /// Returns whether `object` exposes a sub-object called `name`.
    fn sub_object_exists(&self, object: ObjectId, name: &str) -> bool {
        _ = (object, name);
        false
    }
}

/// Applies primitive graph mutations produced by the drag-and-drop planner.
///
/// See [`execute_plan`](crate::drop::execute_plan).
pub trait GraphMutator {
    /// Applies one request to the document graph.
    fn apply(&mut self, request: &MutationRequest) -> Result<(), MutationError>;
}
