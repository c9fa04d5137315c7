// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-object shared state.

use alloc::string::String;
use alloc::vec::Vec;

use crate::id::{NodeId, ObjectId};

/// State shared by every node that realizes one document object.
///
/// A record exists exactly as long as at least one node realizes its object.
/// It caches the display labels and the claimed-children list last applied
/// to its nodes, which is the baseline the projector diffs against.
#[derive(Clone, Debug)]
pub struct ObjectRecord {
    pub(crate) object: ObjectId,
    pub(crate) label: String,
    pub(crate) label2: String,
    pub(crate) claimed_children: Vec<ObjectId>,
    pub(crate) instances: Vec<NodeId>,
    pub(crate) root_instance: Option<NodeId>,
    pub(crate) remove_children_from_root: bool,
    pub(crate) forced_root: bool,
}

impl ObjectRecord {
    pub(crate) fn new(object: ObjectId) -> Self {
        Self {
            object,
            label: String::new(),
            label2: String::new(),
            claimed_children: Vec::new(),
            instances: Vec::new(),
            root_instance: None,
            remove_children_from_root: true,
            forced_root: false,
        }
    }

    /// Returns the object this record describes.
    #[must_use]
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// Returns the cached primary label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the cached secondary label.
    #[must_use]
    pub fn label2(&self) -> &str {
        &self.label2
    }

    /// Returns the accepted claimed children, in claim order.
    #[must_use]
    pub fn claimed_children(&self) -> &[ObjectId] {
        &self.claimed_children
    }

    /// Returns every node realizing this object, in creation order.
    #[must_use]
    pub fn instances(&self) -> &[NodeId] {
        &self.instances
    }

    /// Returns the node sitting directly under the container, if any.
    #[must_use]
    pub fn root_instance(&self) -> Option<NodeId> {
        self.root_instance
    }

    /// Returns whether this object removes the children it claims from the
    /// top level.
    #[must_use]
    pub fn removes_children_from_root(&self) -> bool {
        self.remove_children_from_root
    }

    /// Returns whether the root instance exists only because no claimant
    /// could host the object.
    #[must_use]
    pub fn is_forced_root(&self) -> bool {
        self.forced_root
    }

    pub(crate) fn add_instance(&mut self, node: NodeId) {
        debug_assert!(!self.instances.contains(&node), "instance added twice");
        self.instances.push(node);
    }

    /// Removes `node` from the instance set, clearing root status if it was
    /// the root instance. Returns whether the record is now empty.
    pub(crate) fn remove_instance(&mut self, node: NodeId) -> bool {
        self.instances.retain(|&n| n != node);
        if self.root_instance == Some(node) {
            self.root_instance = None;
        }
        self.instances.is_empty()
    }
}
