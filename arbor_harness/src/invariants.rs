// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural checks for a quiescent forest.
//!
//! [`check_invariants`] walks every materialized node and verifies:
//!
//! - no object has more than one top-level node;
//! - every object reachable from a top-level node through claims has at
//!   least one node;
//! - no node is its own ancestor, and parent and child links agree;
//! - populated nodes list their children in claim order;
//! - records list exactly the nodes that realize their object;
//! - a record kept at the top level only as a fallback still has its
//!   top-level node.
//!
//! Call it after a flush. Between a notification and the next flush the
//! projection is expected to lag behind the model.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;

use arbor_core::forest::Forest;
use arbor_core::id::{DocumentId, NodeId, ObjectId};
use arbor_core::model::DocumentModel;

/// One broken invariant.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// An object has several top-level nodes.
    #[error("{object:?} has {roots} top-level nodes")]
    DuplicateRoot {
        /// The object.
        object: ObjectId,
        /// Number of top-level nodes.
        roots: usize,
    },
    /// An object reachable through claims has no node.
    #[error("{object:?} is reachable from the top level but has no node")]
    Uncovered {
        /// The object.
        object: ObjectId,
    },
    /// A node appears among its own ancestors.
    #[error("{node:?} is its own ancestor")]
    Cycle {
        /// The node.
        node: NodeId,
    },
    /// A child does not point back at the parent listing it.
    #[error("{node:?} does not point back at its parent")]
    BrokenLink {
        /// The child.
        node: NodeId,
    },
    /// A populated node's children differ from its object's claims.
    #[error("children of {node:?} do not follow the claims of {object:?}")]
    ChildrenOutOfSync {
        /// The node.
        node: NodeId,
        /// Its object.
        object: ObjectId,
    },
    /// A record marked as forced to the top level has no top-level node.
    #[error("{object:?} is forced to the top level but has no top-level node")]
    MissingForcedRoot {
        /// The object.
        object: ObjectId,
    },
    /// A record and a node disagree about each other.
    #[error("record of {object:?} disagrees with {node:?}")]
    RecordMismatch {
        /// The object.
        object: ObjectId,
        /// The node.
        node: NodeId,
    },
}

/// Returns every invariant the forest currently breaks.
#[must_use]
pub fn check_invariants(forest: &Forest, model: &dyn DocumentModel) -> Vec<Violation> {
    let mut out = Vec::new();
    let bound = forest.node_count() + 1;
    let mut visited: BTreeSet<NodeId> = BTreeSet::new();
    let mut roots: BTreeMap<ObjectId, usize> = BTreeMap::new();
    let mut reachable_from: Vec<ObjectId> = Vec::new();

    for container in forest.containers() {
        for &top in container.top_level() {
            if !forest.is_alive(top) {
                out.push(Violation::BrokenLink { node: top });
                continue;
            }
            let object = forest.object(top);
            *roots.entry(object).or_default() += 1;
            reachable_from.push(object);
            if forest.parent(top).is_some() {
                out.push(Violation::BrokenLink { node: top });
            }
            check_subtree(forest, model, top, bound, &mut visited, &mut out);
        }
    }

    for (object, count) in roots {
        if count > 1 {
            out.push(Violation::DuplicateRoot {
                object,
                roots: count,
            });
        }
    }

    for container in forest.containers() {
        for record in container.records() {
            let object = record.object();
            for &node in record.instances() {
                if !forest.is_alive(node) || forest.object(node) != object {
                    out.push(Violation::RecordMismatch { object, node });
                }
            }
            if record.is_forced_root() && record.root_instance().is_none() {
                out.push(Violation::MissingForcedRoot { object });
            }
            if let Some(root) = record.root_instance() {
                if !forest.is_alive(root) {
                    out.push(Violation::RecordMismatch { object, node: root });
                    continue;
                }
                let listed = forest
                    .container(forest.owner(root))
                    .is_some_and(|c| c.top_level().contains(&root));
                if !listed || forest.parent(root).is_some() {
                    out.push(Violation::RecordMismatch { object, node: root });
                }
            }
        }
    }

    let mut seen: BTreeSet<ObjectId> = BTreeSet::new();
    let mut stack = reachable_from;
    while let Some(object) = stack.pop() {
        if !seen.insert(object) || !model.contains(object) {
            continue;
        }
        if forest.nodes_of(object).is_empty() {
            out.push(Violation::Uncovered { object });
        }
        stack.extend(model.claimed_children(object));
    }

    out
}

fn check_subtree(
    forest: &Forest,
    model: &dyn DocumentModel,
    top: NodeId,
    bound: usize,
    visited: &mut BTreeSet<NodeId>,
    out: &mut Vec<Violation>,
) {
    let mut stack = alloc::vec![top];
    while let Some(node) = stack.pop() {
        if !visited.insert(node) || forest.ancestors(node).take(bound).count() == bound {
            out.push(Violation::Cycle { node });
            continue;
        }
        let object = forest.object(node);
        if !forest.nodes_of(object).contains(&node) {
            out.push(Violation::RecordMismatch { object, node });
        }
        let children: Vec<NodeId> = forest.children(node).collect();
        for &child in &children {
            if forest.parent(child) != Some(node) {
                out.push(Violation::BrokenLink { node: child });
            }
        }
        if forest.is_populated(node) {
            let expected: Vec<ObjectId> = forest
                .record(object)
                .map(|r| {
                    r.claimed_children()
                        .iter()
                        .copied()
                        .filter(|&c| model.contains(c))
                        .collect()
                })
                .unwrap_or_default();
            let actual: Vec<ObjectId> = children.iter().map(|&c| forest.object(c)).collect();
            if actual != expected {
                out.push(Violation::ChildrenOutOfSync { node, object });
            }
        }
        stack.extend(children.into_iter().rev());
    }
}

/// Panics with every violation if the forest breaks an invariant.
///
/// # Panics
///
/// Panics if [`check_invariants`] reports anything.
pub fn assert_invariants(forest: &Forest, model: &dyn DocumentModel) {
    let violations = check_invariants(forest, model);
    assert!(
        violations.is_empty(),
        "invariant violations: {violations:#?}"
    );
}

/// Renders the materialized nodes of `document` as an indented outline,
/// one object name per line.
#[must_use]
pub fn outline(forest: &Forest, model: &dyn DocumentModel, document: DocumentId) -> String {
    let mut out = String::new();
    for &top in forest.roots(document) {
        write_node(forest, model, top, 0, &mut out);
    }
    out
}

fn write_node(
    forest: &Forest,
    model: &dyn DocumentModel,
    node: NodeId,
    depth: usize,
    out: &mut String,
) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(&model.name(forest.object(node)));
    out.push('\n');
    for child in forest.children(node) {
        write_node(forest, model, child, depth + 1, out);
    }
}
