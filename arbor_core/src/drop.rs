// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drag-and-drop planning.
//!
//! [`Forest::plan_drop`] validates a gesture against the projected tree, the
//! claim graph and the model's drop predicates, and produces a [`DropPlan`]:
//! an ordered list of primitive [`MutationRequest`]s, or a rejection reason.
//! Planning never mutates anything, so it can run on every pointer move for
//! cursor feedback. [`execute_plan`] hands an accepted plan to a
//! [`GraphMutator`].
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. stale handles;
//! 2. cycle guard (a source is the target or one of its ancestors, or the
//!    drop would make an object claim one of its own claimants);
//! 3. the target accepts every source ([`DocumentModel::can_drop_object`]),
//!    for move, copy and link;
//! 4. reorder: every source shares the target's parent and may be reordered;
//! 5. replace: exactly one source and the owner allows the replacement.

use alloc::vec::Vec;

use crate::error::ProjectionError;
use crate::forest::Forest;
use crate::id::{DocumentId, INVALID, NodeId, ObjectId};
use crate::model::{DocumentModel, GraphMutator};
use crate::path::RelativeParent;

/// Modifier-key intent of a drop gesture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DropIntent {
    /// No modifier: the planner picks an operation.
    #[default]
    Auto,
    /// Move the sources into the target.
    Move,
    /// Copy the sources into the target.
    Copy,
    /// Link the sources into the target without moving them.
    Link,
    /// Replace the target with the single source.
    Replace,
    /// Reorder the sources before the target sibling.
    ReorderBefore,
    /// Reorder the sources after the target sibling.
    ReorderAfter,
}

/// Vertical direction of the drag gesture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DragDirection {
    /// Dragged upward; an automatic reorder lands before the target.
    Up,
    /// Dragged downward; an automatic reorder lands after the target.
    #[default]
    Down,
}

/// Where the sources are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropTarget {
    /// Onto a node.
    Node(NodeId),
    /// Onto a document's top level.
    Document(DocumentId),
}

/// The operation a plan performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropOperation {
    /// Reparent the sources.
    Move,
    /// Duplicate the sources into the target.
    Copy,
    /// Add references to the sources.
    Link,
    /// Put the source in the target's place.
    Replace,
    /// Reorder siblings.
    Reorder,
}

/// A drop gesture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropRequest {
    /// Dragged nodes.
    pub sources: Vec<NodeId>,
    /// Drop location.
    pub target: DropTarget,
    /// Modifier-key intent.
    pub intent: DropIntent,
    /// Gesture direction, used by automatic reordering.
    pub direction: DragDirection,
}

impl DropRequest {
    /// Creates a plain downward drop.
    #[must_use]
    pub fn new(sources: Vec<NodeId>, target: DropTarget) -> Self {
        Self {
            sources,
            target,
            intent: DropIntent::Auto,
            direction: DragDirection::Down,
        }
    }

    /// Sets the intent.
    #[must_use]
    pub fn with_intent(mut self, intent: DropIntent) -> Self {
        self.intent = intent;
        self
    }

    /// Sets the gesture direction.
    #[must_use]
    pub fn with_direction(mut self, direction: DragDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// Why a drop was rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DropRejection {
    /// The request has no sources.
    #[error("nothing to drop")]
    NoSources,
    /// A source handle is stale.
    #[error("source node {0:?} is stale")]
    StaleSource(NodeId),
    /// The target handle is stale.
    #[error("target node {0:?} is stale")]
    StaleTarget(NodeId),
    /// The target document is not attached.
    #[error("document {0:?} is not attached")]
    UnknownDocument(DocumentId),
    /// The drop would create a cycle.
    #[error("dropping {object:?} onto {target:?} would create a cycle")]
    Cycle {
        /// The dragged object.
        object: ObjectId,
        /// The object that would end up claiming it.
        target: ObjectId,
    },
    /// The target does not accept a source.
    #[error("{target:?} does not accept {object:?}")]
    NotAccepted {
        /// The refused object.
        object: ObjectId,
        /// The refusing target.
        target: ObjectId,
    },
    /// An explicit move would cross documents.
    #[error("{0:?} cannot be moved to another document")]
    CrossDocumentMove(ObjectId),
    /// A source already sits directly under the target.
    #[error("{0:?} already is a child of the target")]
    SameParent(ObjectId),
    /// Reorder sources do not share the target's parent.
    #[error("{0:?} is not a sibling of the target")]
    NotSiblings(ObjectId),
    /// The model refuses to reorder a source.
    #[error("{object:?} cannot be reordered next to {target:?}")]
    ReorderNotAllowed {
        /// The dragged object.
        object: ObjectId,
        /// The sibling it was dropped on.
        target: ObjectId,
    },
    /// Replace needs exactly one source.
    #[error("replace takes exactly one source, got {0}")]
    ReplaceArity(usize),
    /// The replaced node sits at the top level.
    #[error("{0:?} has no parent to be replaced in")]
    ReplaceWithoutParent(ObjectId),
    /// The owner refuses the replacement.
    #[error("{owner:?} does not allow replacing {target:?} with {object:?}")]
    ReplaceNotAllowed {
        /// The parent of the replaced node.
        owner: ObjectId,
        /// The replaced object.
        target: ObjectId,
        /// The replacement.
        object: ObjectId,
    },
    /// The operation needs a node target.
    #[error("{0:?} needs a node target")]
    NeedsNodeTarget(DropOperation),
}

/// A primitive graph mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationRequest {
    /// Move `object` out of `from` (`None`: the top level) into `to`
    /// (`None`: the top level of `document`).
    Reparent {
        /// The moved object.
        object: ObjectId,
        /// Current claimant, or `None` at the top level.
        from: Option<ObjectId>,
        /// New claimant, or `None` for the top level.
        to: Option<ObjectId>,
        /// Document receiving the object.
        document: DocumentId,
        /// Position among the new claimant's claims; `None` appends.
        index: Option<usize>,
        /// Where the dragged node sat relative to the drop target.
        anchor: Option<RelativeParent>,
    },
    /// Add a reference to `object` without moving it.
    AddReference {
        /// The referenced object.
        object: ObjectId,
        /// Claimant receiving the reference, or `None` for the top level.
        into: Option<ObjectId>,
        /// Document receiving the reference.
        document: DocumentId,
    },
    /// Duplicate `object`.
    Duplicate {
        /// The copied object.
        object: ObjectId,
        /// Claimant receiving the copy, or `None` for the top level.
        into: Option<ObjectId>,
        /// Document receiving the copy.
        document: DocumentId,
    },
    /// Remove the claim `from -> object`.
    Detach {
        /// The released object.
        object: ObjectId,
        /// Its claimant.
        from: ObjectId,
    },
    /// Replace the order of `parent`'s claims (or of the top level).
    Reorder {
        /// The claimant, or `None` for the top level.
        parent: Option<ObjectId>,
        /// Document of the reordered level.
        document: DocumentId,
        /// New order.
        order: Vec<ObjectId>,
    },
}

/// The outcome of [`Forest::plan_drop`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DropPlan {
    /// Chosen operation; `None` when rejected.
    pub operation: Option<DropOperation>,
    /// Requests to apply in order; empty when rejected.
    pub requests: Vec<MutationRequest>,
    /// Rejection reason.
    pub rejection: Option<DropRejection>,
}

impl DropPlan {
    fn rejected(reason: DropRejection) -> Self {
        tracing::trace!(%reason, "drop rejected");
        Self {
            operation: None,
            requests: Vec::new(),
            rejection: Some(reason),
        }
    }

    fn accepted(operation: DropOperation, requests: Vec<MutationRequest>) -> Self {
        Self {
            operation: Some(operation),
            requests,
            rejection: None,
        }
    }

    /// Returns whether the drop was rejected.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }
}

/// Applies an accepted plan through `mutator`. Returns the number of
/// requests applied.
///
/// Stops at the first failing request; earlier requests stay applied.
pub fn execute_plan(
    plan: &DropPlan,
    mutator: &mut dyn GraphMutator,
) -> Result<usize, ProjectionError> {
    if let Some(reason) = &plan.rejection {
        return Err(ProjectionError::Rejected(reason.clone()));
    }
    for (index, request) in plan.requests.iter().enumerate() {
        mutator
            .apply(request)
            .map_err(|source| ProjectionError::Mutation { index, source })?;
    }
    tracing::debug!(
        operation = ?plan.operation,
        requests = plan.requests.len(),
        "drop plan executed"
    );
    Ok(plan.requests.len())
}

/// Moves `sources` (a subset of `siblings`) next to `target`, keeping their
/// relative order.
fn reordered<T: Copy + PartialEq>(siblings: &[T], sources: &[T], target: T, after: bool) -> Vec<T> {
    let moving: Vec<T> = siblings
        .iter()
        .copied()
        .filter(|s| sources.contains(s))
        .collect();
    let mut rest: Vec<T> = siblings
        .iter()
        .copied()
        .filter(|s| !sources.contains(s))
        .collect();
    let pos = match rest.iter().position(|&s| s == target) {
        Some(p) if after => p + 1,
        Some(p) => p,
        None => rest.len(),
    };
    for (offset, s) in moving.into_iter().enumerate() {
        rest.insert(pos + offset, s);
    }
    rest
}

impl Forest {
    /// Validates a drop gesture and plans its mutations.
    #[must_use]
    pub fn plan_drop(&self, model: &dyn DocumentModel, request: &DropRequest) -> DropPlan {
        if request.sources.is_empty() {
            return DropPlan::rejected(DropRejection::NoSources);
        }
        let mut sources: Vec<NodeId> = Vec::with_capacity(request.sources.len());
        for &source in &request.sources {
            if !self.nodes.is_alive(source) {
                return DropPlan::rejected(DropRejection::StaleSource(source));
            }
            if !sources.contains(&source) {
                sources.push(source);
            }
        }

        let (target_node, target_object, document) = match request.target {
            DropTarget::Node(node) => {
                if !self.nodes.is_alive(node) {
                    return DropPlan::rejected(DropRejection::StaleTarget(node));
                }
                let object = self.nodes.object[node.idx as usize];
                (Some(node), Some(object), model.document_of(object))
            }
            DropTarget::Document(document) => {
                if !self.attached.contains(&document) {
                    return DropPlan::rejected(DropRejection::UnknownDocument(document));
                }
                (None, None, document)
            }
        };

        if let (Some(node), Some(target)) = (target_node, target_object) {
            for &source in &sources {
                if self.nodes.is_ancestor_or_self(source.idx, node.idx) {
                    return DropPlan::rejected(DropRejection::Cycle {
                        object: self.nodes.object[source.idx as usize],
                        target,
                    });
                }
            }
        }

        let operation = match request.intent {
            DropIntent::Auto => self.auto_operation(model, &sources, target_node, document),
            DropIntent::Move => DropOperation::Move,
            DropIntent::Copy => DropOperation::Copy,
            DropIntent::Link => DropOperation::Link,
            DropIntent::Replace => DropOperation::Replace,
            DropIntent::ReorderBefore | DropIntent::ReorderAfter => DropOperation::Reorder,
        };
        let after = match request.intent {
            DropIntent::ReorderBefore => false,
            DropIntent::ReorderAfter => true,
            _ => request.direction == DragDirection::Down,
        };

        match operation {
            DropOperation::Move | DropOperation::Copy | DropOperation::Link => {
                self.plan_into(model, &sources, target_node, target_object, document, operation)
            }
            DropOperation::Reorder => match target_node {
                Some(node) => self.plan_reorder(model, &sources, node, after),
                None => DropPlan::rejected(DropRejection::NeedsNodeTarget(operation)),
            },
            DropOperation::Replace => match target_node {
                Some(node) => self.plan_replace(model, &sources, node),
                None => DropPlan::rejected(DropRejection::NeedsNodeTarget(operation)),
            },
        }
    }

    /// Picks the operation of a plain drop: reorder among reorderable
    /// siblings, copy (or the configured default) across documents, move
    /// otherwise.
    fn auto_operation(
        &self,
        model: &dyn DocumentModel,
        sources: &[NodeId],
        target: Option<NodeId>,
        document: DocumentId,
    ) -> DropOperation {
        if let Some(target) = target {
            let target_object = self.nodes.object[target.idx as usize];
            let reorderable = sources.iter().all(|s| {
                self.are_siblings(s.idx, target.idx)
                    && model.can_reorder(target_object, self.nodes.object[s.idx as usize])
            });
            if reorderable {
                return DropOperation::Reorder;
            }
        }
        let crosses = sources
            .iter()
            .any(|s| model.document_of(self.nodes.object[s.idx as usize]) != document);
        if crosses {
            self.config.cross_document_default
        } else {
            DropOperation::Move
        }
    }

    fn are_siblings(&self, a: u32, b: u32) -> bool {
        let parent = self.nodes.parent[a as usize];
        parent == self.nodes.parent[b as usize]
            && (parent != INVALID || self.nodes.owner[a as usize] == self.nodes.owner[b as usize])
    }

    fn parent_object(&self, idx: u32) -> Option<ObjectId> {
        let parent = self.nodes.parent[idx as usize];
        (parent != INVALID).then(|| self.nodes.object[parent as usize])
    }

    fn plan_into(
        &self,
        model: &dyn DocumentModel,
        sources: &[NodeId],
        target_node: Option<NodeId>,
        target_object: Option<ObjectId>,
        document: DocumentId,
        operation: DropOperation,
    ) -> DropPlan {
        if let Some(target) = target_object {
            for &source in sources {
                let object = self.nodes.object[source.idx as usize];
                if object == target || self.claims.reaches(object, target) {
                    return DropPlan::rejected(DropRejection::Cycle { object, target });
                }
            }
            for &source in sources {
                let object = self.nodes.object[source.idx as usize];
                if !model.can_drop_object(target, object) {
                    return DropPlan::rejected(DropRejection::NotAccepted { object, target });
                }
            }
        }

        let mut requests = Vec::with_capacity(sources.len());
        for &source in sources {
            let object = self.nodes.object[source.idx as usize];
            let request = match operation {
                DropOperation::Move => {
                    if model.document_of(object) != document {
                        return DropPlan::rejected(DropRejection::CrossDocumentMove(object));
                    }
                    let from = self.parent_object(source.idx);
                    let same_parent = match target_node {
                        Some(_) => from == target_object,
                        None => from.is_none(),
                    };
                    if same_parent {
                        return DropPlan::rejected(DropRejection::SameParent(object));
                    }
                    MutationRequest::Reparent {
                        object,
                        from,
                        to: target_object,
                        document,
                        index: None,
                        anchor: target_node.and_then(|t| self.relative_parent(model, source, t)),
                    }
                }
                DropOperation::Copy => MutationRequest::Duplicate {
                    object,
                    into: target_object,
                    document,
                },
                _ => MutationRequest::AddReference {
                    object,
                    into: target_object,
                    document,
                },
            };
            requests.push(request);
        }
        DropPlan::accepted(operation, requests)
    }

    fn plan_reorder(
        &self,
        model: &dyn DocumentModel,
        sources: &[NodeId],
        target: NodeId,
        after: bool,
    ) -> DropPlan {
        let target_object = self.nodes.object[target.idx as usize];
        for &source in sources {
            let object = self.nodes.object[source.idx as usize];
            if !self.are_siblings(source.idx, target.idx) {
                return DropPlan::rejected(DropRejection::NotSiblings(object));
            }
            if !model.can_reorder(target_object, object) {
                return DropPlan::rejected(DropRejection::ReorderNotAllowed {
                    object,
                    target: target_object,
                });
            }
        }

        let parent = self.nodes.parent[target.idx as usize];
        let siblings: Vec<u32> = if parent == INVALID {
            let owner = self.nodes.owner[target.idx as usize];
            self.roots(owner).iter().map(|n| n.idx).collect()
        } else {
            self.nodes.children[parent as usize].clone()
        };
        let moving: Vec<u32> = sources.iter().map(|s| s.idx).collect();
        let order = reordered(&siblings, &moving, target.idx, after)
            .into_iter()
            .map(|idx| self.nodes.object[idx as usize])
            .collect();
        DropPlan::accepted(
            DropOperation::Reorder,
            alloc::vec![MutationRequest::Reorder {
                parent: self.parent_object(target.idx),
                document: self.nodes.owner[target.idx as usize],
                order,
            }],
        )
    }

    fn plan_replace(
        &self,
        model: &dyn DocumentModel,
        sources: &[NodeId],
        target: NodeId,
    ) -> DropPlan {
        let [source] = sources else {
            return DropPlan::rejected(DropRejection::ReplaceArity(sources.len()));
        };
        let target_object = self.nodes.object[target.idx as usize];
        let object = self.nodes.object[source.idx as usize];
        let parent = self.nodes.parent[target.idx as usize];
        if parent == INVALID {
            return DropPlan::rejected(DropRejection::ReplaceWithoutParent(target_object));
        }
        let owner = self.nodes.object[parent as usize];
        if object == owner || self.claims.reaches(object, owner) {
            return DropPlan::rejected(DropRejection::Cycle {
                object,
                target: owner,
            });
        }
        if !model.can_replace(owner, target_object, object) {
            return DropPlan::rejected(DropRejection::ReplaceNotAllowed {
                owner,
                target: target_object,
                object,
            });
        }
        let index = self.nodes.children[parent as usize]
            .iter()
            .position(|&c| c == target.idx);
        DropPlan::accepted(
            DropOperation::Replace,
            alloc::vec![
                MutationRequest::Reparent {
                    object,
                    from: self.parent_object(source.idx),
                    to: Some(owner),
                    document: model.document_of(owner),
                    index,
                    anchor: self.relative_parent(model, *source, target),
                },
                MutationRequest::Detach {
                    object: target_object,
                    from: owner,
                },
            ],
        )
    }
}
