// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Document-driven anomalies never surface here: structural problems are
//! reported as [`StructuralError`] values in the flush report, stale
//! references behave like removals, and rejected drops are ordinary
//! [`DropPlan`](crate::drop::DropPlan)s. [`ProjectionError`] is reserved for
//! calls whose caller has to react.

use alloc::string::String;

use crate::drop::DropRejection;
use crate::id::{DocumentId, NodeId, ObjectId};

/// Errors returned by fallible projection calls.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    /// A rejected plan was passed to
    /// [`execute_plan`](crate::drop::execute_plan).
    #[error("drop plan was rejected: {0}")]
    Rejected(DropRejection),
    /// The graph mutator failed while applying a request.
    #[error("mutation request {index} failed")]
    Mutation {
        /// Position of the failing request within the plan.
        index: usize,
        /// The mutator's error.
        #[source]
        source: MutationError,
    },
    /// A node handle no longer refers to a live node.
    #[error("stale node handle {0:?}")]
    StaleNode(NodeId),
    /// The document has no container in this forest.
    #[error("unknown document {0:?}")]
    UnknownDocument(DocumentId),
}

/// Error reported by a [`GraphMutator`](crate::model::GraphMutator).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct MutationError {
    /// Human-readable failure description.
    pub message: String,
}

impl MutationError {
    /// Creates a mutation error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A structural anomaly detected while projecting.
///
/// These are logged and collected; the offending edge or node is left out
/// of the tree rather than failing the projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// A claim would close a cycle in the claim graph and was ignored.
    #[error("claim {parent:?} -> {child:?} closes a cycle")]
    ClaimCycle {
        /// The claiming object.
        parent: ObjectId,
        /// The claimed object.
        child: ObjectId,
    },
    /// A root instance could not be adopted because it is an ancestor of
    /// (or equal to) the adopting node.
    #[error("cannot adopt {node:?} ({object:?}) under its own descendant {parent:?}")]
    AdoptionCycle {
        /// Object of the root instance.
        object: ObjectId,
        /// The root instance.
        node: NodeId,
        /// The node that tried to adopt it.
        parent: NodeId,
    },
    /// A node could not be relocated under its own descendant and was
    /// detached instead.
    #[error("cannot relocate {node:?} ({object:?}) under its own descendant {destination:?}")]
    RelocationCycle {
        /// Object of the relocated node.
        object: ObjectId,
        /// The node being relocated.
        node: NodeId,
        /// The rejected destination.
        destination: NodeId,
    },
}
