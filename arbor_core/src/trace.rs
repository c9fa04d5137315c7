// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the projection.
//!
//! This module provides a [`ProjectionSink`] trait with per-event methods
//! that the flush and selection passes call at each stage. All method bodies
//! default to no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn ProjectionSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing (zero
//! overhead). When **on**, each method performs a single `Option` branch
//! before dispatching.
//!
//! Independently of the sink, structural errors are always logged through
//! `tracing` at `warn` level.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).

use crate::error::StructuralError;
use crate::id::{NodeId, ObjectId};

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a flush starts draining the event queue.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlushBeginEvent {
    /// Monotonic flush counter.
    pub flush_index: u64,
    /// Objects marked dirty since the previous flush.
    pub dirty_objects: usize,
    /// Objects removed since the previous flush.
    pub removed_objects: usize,
    /// Documents reset since the previous flush.
    pub reset_documents: usize,
}

/// Emitted after a node's children were reconciled with its claim list.
#[derive(Clone, Copy, Debug)]
pub struct PopulateEvent {
    /// The populated node.
    pub node: NodeId,
    /// Its object.
    pub object: ObjectId,
    /// Number of children after reconciliation.
    pub children: usize,
    /// Existing children that changed position.
    pub moved: usize,
    /// Children created as fresh instances.
    pub created: usize,
    /// Children adopted from the top level.
    pub adopted: usize,
    /// Children reused from nodes detached elsewhere in the same pass.
    pub reused: usize,
    /// Leftover children detached for reuse. Those not picked up by
    /// another parent are relocated to the top level or destroyed.
    pub parked: usize,
}

/// Emitted after the selection was re-derived.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelectionEvent {
    /// Selection entries applied.
    pub entries: usize,
    /// Nodes marked selected.
    pub matched_nodes: usize,
    /// Matches that degraded to a partial match.
    pub partial: usize,
    /// Entries that matched no node at all.
    pub unresolved: usize,
}

/// Per-flush summary.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlushSummary {
    /// Flush counter.
    pub flush_index: u64,
    /// Objects processed in ancestor-before-descendant order.
    pub dirty_objects: usize,
    /// Nodes created during the flush.
    pub nodes_created: usize,
    /// Nodes destroyed during the flush.
    pub nodes_destroyed: usize,
    /// Records dropped because their last node went away.
    pub records_gone: usize,
    /// Structural errors detected.
    pub structural_errors: usize,
    /// Whether the selection marks changed.
    pub selection_changed: bool,
}

// ---------------------------------------------------------------------------
// ProjectionSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the projection.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait ProjectionSink {
    /// Called when a flush begins.
    fn on_flush_begin(&mut self, e: &FlushBeginEvent) {
        _ = e;
    }

    /// Called after a node was populated.
    fn on_populate(&mut self, e: &PopulateEvent) {
        _ = e;
    }

    /// Called for every structural error.
    fn on_structural_error(&mut self, e: &StructuralError) {
        _ = e;
    }

    /// Called when a record is dropped with its last node.
    fn on_record_gone(&mut self, object: ObjectId) {
        _ = object;
    }

    /// Called after the selection was re-derived.
    fn on_selection(&mut self, e: &SelectionEvent) {
        _ = e;
    }

    /// Called with the summary at the end of a flush.
    fn on_flush_summary(&mut self, s: &FlushSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`ProjectionSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl ProjectionSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`ProjectionSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn ProjectionSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn ProjectionSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn ProjectionSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FlushBeginEvent`].
    #[inline]
    pub fn flush_begin(&mut self, e: &FlushBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_flush_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PopulateEvent`].
    #[inline]
    pub fn populate(&mut self, e: &PopulateEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_populate(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`StructuralError`].
    #[inline]
    pub fn structural_error(&mut self, e: &StructuralError) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_structural_error(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a record-gone notification.
    #[inline]
    pub fn record_gone(&mut self, object: ObjectId) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_record_gone(object);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = object;
        }
    }

    /// Emits a [`SelectionEvent`].
    #[inline]
    pub fn selection(&mut self, e: &SelectionEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_selection(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FlushSummary`].
    #[inline]
    pub fn flush_summary(&mut self, s: &FlushSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_flush_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}
