// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use core::slice;

use crate::id::{INVALID, NodeId};
use crate::node::NodeStore;

/// An iterator over the direct children of a node.
///
/// Created by [`Forest::children`](crate::forest::Forest::children).
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a NodeStore,
    inner: slice::Iter<'a, u32>,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a NodeStore, idx: u32) -> Self {
        Self {
            store,
            inner: store.children[idx as usize].iter(),
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.inner.next().map(|&idx| self.store.id_of(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Children<'_> {}

/// An iterator over the strict ancestors of a node, nearest first.
///
/// Created by [`Forest::ancestors`](crate::forest::Forest::ancestors).
#[derive(Debug)]
pub struct Ancestors<'a> {
    store: &'a NodeStore,
    current: u32,
}

impl<'a> Ancestors<'a> {
    pub(crate) fn new(store: &'a NodeStore, idx: u32) -> Self {
        Self {
            store,
            current: store.parent[idx as usize],
        }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.parent[idx as usize];
        Some(self.store.id_of(idx))
    }
}
