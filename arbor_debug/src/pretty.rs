// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`ProjectionSink`] and writes one line per
//! event to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use arbor_core::error::StructuralError;
use arbor_core::id::{NodeId, ObjectId};
use arbor_core::trace::{
    FlushBeginEvent, FlushSummary, PopulateEvent, ProjectionSink, SelectionEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    populate_lines: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("populate_lines", &self.populate_lines)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            populate_lines: true,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self {
            writer,
            populate_lines: true,
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            populate_lines: true,
        }
    }

    /// Skips the per-node `[populate]` lines, which dominate large flushes.
    #[must_use]
    pub fn without_populate_lines(mut self) -> Self {
        self.populate_lines = false;
        self
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn node(n: NodeId) -> String {
    format!("{}v{}", n.index(), n.generation())
}

fn object(o: ObjectId) -> u64 {
    o.0
}

impl<W: Write> ProjectionSink for PrettyPrintSink<W> {
    fn on_flush_begin(&mut self, e: &FlushBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[flush:begin] flush={} dirty={} removed={} resets={}",
            e.flush_index, e.dirty_objects, e.removed_objects, e.reset_documents,
        );
    }

    fn on_populate(&mut self, e: &PopulateEvent) {
        if !self.populate_lines {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[populate] node={} object={} children={} moved={} created={} \
             adopted={} reused={} parked={}",
            node(e.node),
            object(e.object),
            e.children,
            e.moved,
            e.created,
            e.adopted,
            e.reused,
            e.parked,
        );
    }

    fn on_structural_error(&mut self, e: &StructuralError) {
        let line = match *e {
            StructuralError::ClaimCycle { parent, child } => format!(
                "claim-cycle parent={} child={}",
                object(parent),
                object(child)
            ),
            StructuralError::AdoptionCycle {
                object: o,
                node: n,
                parent,
            } => format!(
                "adoption-cycle object={} node={} parent={}",
                object(o),
                node(n),
                node(parent)
            ),
            StructuralError::RelocationCycle {
                object: o,
                node: n,
                destination,
            } => format!(
                "relocation-cycle object={} node={} destination={}",
                object(o),
                node(n),
                node(destination)
            ),
        };
        let _ = writeln!(self.writer, "[structural] {line}");
    }

    fn on_record_gone(&mut self, o: ObjectId) {
        let _ = writeln!(self.writer, "[record:gone] object={}", object(o));
    }

    fn on_selection(&mut self, e: &SelectionEvent) {
        let _ = writeln!(
            self.writer,
            "[selection] entries={} matched={} partial={} unresolved={}",
            e.entries, e.matched_nodes, e.partial, e.unresolved,
        );
    }

    fn on_flush_summary(&mut self, s: &FlushSummary) {
        let selection = if s.selection_changed { "changed" } else { "same" };
        let _ = writeln!(
            self.writer,
            "[summary] flush={} dirty={} created={} destroyed={} gone={} \
             errors={} selection={selection}",
            s.flush_index,
            s.dirty_objects,
            s.nodes_created,
            s.nodes_destroyed,
            s.records_gone,
            s.structural_errors,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_print_flush_begin() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_flush_begin(&FlushBeginEvent {
            flush_index: 3,
            dirty_objects: 2,
            removed_objects: 1,
            reset_documents: 0,
        });
        let output = String::from_utf8(sink.writer).unwrap();
        assert!(output.contains("[flush:begin]"), "got: {output}");
        assert!(output.contains("flush=3"), "got: {output}");
        assert!(output.contains("dirty=2"), "got: {output}");
    }

    #[test]
    fn pretty_print_claim_cycle() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_structural_error(&StructuralError::ClaimCycle {
            parent: ObjectId(4),
            child: ObjectId(9),
        });
        sink.on_record_gone(ObjectId(9));
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            output,
            "[structural] claim-cycle parent=4 child=9\n[record:gone] object=9\n"
        );
    }

    #[test]
    fn summary_reports_selection_change() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_flush_summary(&FlushSummary {
            flush_index: 1,
            selection_changed: true,
            ..FlushSummary::default()
        });
        let output = String::from_utf8(sink.writer).unwrap();
        assert!(output.starts_with("[summary] flush=1"), "got: {output}");
        assert!(output.contains("selection=changed"), "got: {output}");
    }
}
