// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`ProjectionSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. [`decode`] reads them back as an
//! iterator of [`RecordedEvent`].
//!
//! Node handles are recorded as plain index and generation pairs
//! ([`NodeRef`]): a decoded recording describes nodes of a forest that may
//! no longer exist, so it never hands out live [`NodeId`]s.

use arbor_core::error::StructuralError;
use arbor_core::id::{NodeId, ObjectId};
use arbor_core::trace::{
    FlushBeginEvent, FlushSummary, PopulateEvent, ProjectionSink, SelectionEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FLUSH_BEGIN: u8 = 1;
const TAG_POPULATE: u8 = 2;
const TAG_STRUCTURAL_ERROR: u8 = 3;
const TAG_RECORD_GONE: u8 = 4;
const TAG_SELECTION: u8 = 5;
const TAG_FLUSH_SUMMARY: u8 = 6;

const KIND_CLAIM_CYCLE: u8 = 0;
const KIND_ADOPTION_CYCLE: u8 = 1;
const KIND_RELOCATION_CYCLE: u8 = 2;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`ProjectionSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, v: usize) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "counts capped at u32::MAX for recording"
        )]
        self.write_u32(v.min(u32::MAX as usize) as u32);
    }

    fn write_object(&mut self, o: ObjectId) {
        self.write_u64(o.0);
    }

    fn write_node(&mut self, n: NodeId) {
        self.write_u32(n.index());
        self.write_u32(n.generation());
    }
}

impl ProjectionSink for RecorderSink {
    fn on_flush_begin(&mut self, e: &FlushBeginEvent) {
        self.write_u8(TAG_FLUSH_BEGIN);
        self.write_u64(e.flush_index);
        self.write_count(e.dirty_objects);
        self.write_count(e.removed_objects);
        self.write_count(e.reset_documents);
    }

    fn on_populate(&mut self, e: &PopulateEvent) {
        self.write_u8(TAG_POPULATE);
        self.write_node(e.node);
        self.write_object(e.object);
        self.write_count(e.children);
        self.write_count(e.moved);
        self.write_count(e.created);
        self.write_count(e.adopted);
        self.write_count(e.reused);
        self.write_count(e.parked);
    }

    fn on_structural_error(&mut self, e: &StructuralError) {
        self.write_u8(TAG_STRUCTURAL_ERROR);
        match *e {
            StructuralError::ClaimCycle { parent, child } => {
                self.write_u8(KIND_CLAIM_CYCLE);
                self.write_object(parent);
                self.write_object(child);
            }
            StructuralError::AdoptionCycle {
                object,
                node,
                parent,
            } => {
                self.write_u8(KIND_ADOPTION_CYCLE);
                self.write_object(object);
                self.write_node(node);
                self.write_node(parent);
            }
            StructuralError::RelocationCycle {
                object,
                node,
                destination,
            } => {
                self.write_u8(KIND_RELOCATION_CYCLE);
                self.write_object(object);
                self.write_node(node);
                self.write_node(destination);
            }
        }
    }

    fn on_record_gone(&mut self, object: ObjectId) {
        self.write_u8(TAG_RECORD_GONE);
        self.write_object(object);
    }

    fn on_selection(&mut self, e: &SelectionEvent) {
        self.write_u8(TAG_SELECTION);
        self.write_count(e.entries);
        self.write_count(e.matched_nodes);
        self.write_count(e.partial);
        self.write_count(e.unresolved);
    }

    fn on_flush_summary(&mut self, s: &FlushSummary) {
        self.write_u8(TAG_FLUSH_SUMMARY);
        self.write_u64(s.flush_index);
        self.write_count(s.dirty_objects);
        self.write_count(s.nodes_created);
        self.write_count(s.nodes_destroyed);
        self.write_count(s.records_gone);
        self.write_count(s.structural_errors);
        self.write_u8(u8::from(s.selection_changed));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A node handle as recorded: slot index and generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef {
    /// Slot index.
    pub index: u32,
    /// Slot generation.
    pub generation: u32,
}

impl From<NodeId> for NodeRef {
    fn from(id: NodeId) -> Self {
        Self {
            index: id.index(),
            generation: id.generation(),
        }
    }
}

/// A decoded [`PopulateEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedPopulate {
    /// The populated node.
    pub node: NodeRef,
    /// Its object.
    pub object: ObjectId,
    /// Number of children after reconciliation.
    pub children: u32,
    /// Existing children that changed position.
    pub moved: u32,
    /// Children created as fresh instances.
    pub created: u32,
    /// Children adopted from the top level.
    pub adopted: u32,
    /// Children reused from detached nodes.
    pub reused: u32,
    /// Leftover children detached for reuse.
    pub parked: u32,
}

/// A decoded [`StructuralError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedStructural {
    /// See [`StructuralError::ClaimCycle`].
    ClaimCycle {
        /// The claiming object.
        parent: ObjectId,
        /// The claimed object.
        child: ObjectId,
    },
    /// See [`StructuralError::AdoptionCycle`].
    AdoptionCycle {
        /// Object of the root instance.
        object: ObjectId,
        /// The root instance.
        node: NodeRef,
        /// The node that tried to adopt it.
        parent: NodeRef,
    },
    /// See [`StructuralError::RelocationCycle`].
    RelocationCycle {
        /// Object of the relocated node.
        object: ObjectId,
        /// The node being relocated.
        node: NodeRef,
        /// The rejected destination.
        destination: NodeRef,
    },
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FlushBeginEvent`].
    FlushBegin(FlushBeginEvent),
    /// A [`PopulateEvent`].
    Populate(RecordedPopulate),
    /// A [`StructuralError`].
    StructuralError(RecordedStructural),
    /// An object lost its last node.
    RecordGone(ObjectId),
    /// A [`SelectionEvent`].
    Selection(SelectionEvent),
    /// A [`FlushSummary`].
    FlushSummary(FlushSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_count(&mut self) -> Option<usize> {
        self.read_u32().map(|v| v as usize)
    }

    fn read_object(&mut self) -> Option<ObjectId> {
        self.read_u64().map(ObjectId)
    }

    fn read_node(&mut self) -> Option<NodeRef> {
        Some(NodeRef {
            index: self.read_u32()?,
            generation: self.read_u32()?,
        })
    }

    fn decode_flush_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FlushBegin(FlushBeginEvent {
            flush_index: self.read_u64()?,
            dirty_objects: self.read_count()?,
            removed_objects: self.read_count()?,
            reset_documents: self.read_count()?,
        }))
    }

    fn decode_populate(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Populate(RecordedPopulate {
            node: self.read_node()?,
            object: self.read_object()?,
            children: self.read_u32()?,
            moved: self.read_u32()?,
            created: self.read_u32()?,
            adopted: self.read_u32()?,
            reused: self.read_u32()?,
            parked: self.read_u32()?,
        }))
    }

    fn decode_structural_error(&mut self) -> Option<RecordedEvent> {
        let error = match self.read_u8()? {
            KIND_CLAIM_CYCLE => RecordedStructural::ClaimCycle {
                parent: self.read_object()?,
                child: self.read_object()?,
            },
            KIND_ADOPTION_CYCLE => RecordedStructural::AdoptionCycle {
                object: self.read_object()?,
                node: self.read_node()?,
                parent: self.read_node()?,
            },
            KIND_RELOCATION_CYCLE => RecordedStructural::RelocationCycle {
                object: self.read_object()?,
                node: self.read_node()?,
                destination: self.read_node()?,
            },
            _ => return None,
        };
        Some(RecordedEvent::StructuralError(error))
    }

    fn decode_selection(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Selection(SelectionEvent {
            entries: self.read_count()?,
            matched_nodes: self.read_count()?,
            partial: self.read_count()?,
            unresolved: self.read_count()?,
        }))
    }

    fn decode_flush_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FlushSummary(FlushSummary {
            flush_index: self.read_u64()?,
            dirty_objects: self.read_count()?,
            nodes_created: self.read_count()?,
            nodes_destroyed: self.read_count()?,
            records_gone: self.read_count()?,
            structural_errors: self.read_count()?,
            selection_changed: self.read_u8()? != 0,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_FLUSH_BEGIN => self.decode_flush_begin(),
            TAG_POPULATE => self.decode_populate(),
            TAG_STRUCTURAL_ERROR => self.decode_structural_error(),
            TAG_RECORD_GONE => self.read_object().map(RecordedEvent::RecordGone),
            TAG_SELECTION => self.decode_selection(),
            TAG_FLUSH_SUMMARY => self.decode_flush_summary(),
            _ => None, // unknown tag ends the recording
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
