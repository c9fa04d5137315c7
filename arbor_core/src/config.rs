// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Projection configuration.

use crate::drop::DropOperation;

/// Tunables for a [`Forest`](crate::forest::Forest).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProjectorConfig {
    /// Whether path lookups may populate lazy nodes to find their target.
    pub populate_on_select: bool,
    /// Whether an unmatched object segment is retried against every node
    /// reachable below the current one, not only its direct children.
    pub search_reachable_on_miss: bool,
    /// Upper bound on nodes visited by one reachable-node retry.
    pub max_search_nodes: usize,
    /// Operation chosen for a plain drop onto another document. Must be
    /// [`DropOperation::Copy`] or [`DropOperation::Link`].
    pub cross_document_default: DropOperation,
    /// Whether each flush re-derives node selection marks from the last
    /// applied selection.
    pub reselect_after_flush: bool,
}

impl ProjectorConfig {
    /// Configuration for an interactive tree view.
    #[must_use]
    pub const fn interactive() -> Self {
        Self {
            populate_on_select: true,
            search_reachable_on_miss: true,
            max_search_nodes: 4096,
            cross_document_default: DropOperation::Copy,
            reselect_after_flush: true,
        }
    }

    /// Configuration for headless batch use: selection never materializes
    /// lazy nodes and is not re-derived on flush.
    #[must_use]
    pub const fn batch() -> Self {
        Self {
            populate_on_select: false,
            search_reachable_on_miss: true,
            max_search_nodes: 1024,
            cross_document_default: DropOperation::Copy,
            reselect_after_flush: false,
        }
    }
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self::interactive()
    }
}
