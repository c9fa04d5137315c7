// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON exporter for recorded events.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes one JSON object per event. Every object carries the flush it
//! belongs to, so a recording spanning many flushes can be filtered with
//! ordinary JSON tools.

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{NodeRef, RecordedEvent, RecordedStructural, decode};

/// Exports recorded events as a pretty-printed JSON array.
///
/// Events between a flush begin and its summary are tagged with that
/// flush's index. Events outside a flush (for example a selection applied
/// directly) get `"flush": null`.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let events = to_values(bytes);
    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

/// Converts recorded events to JSON values.
#[must_use]
pub fn to_values(bytes: &[u8]) -> Vec<Value> {
    let mut events: Vec<Value> = Vec::new();
    let mut flush: Option<u64> = None;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::FlushBegin(e) => {
                flush = Some(e.flush_index);
                events.push(json!({
                    "name": "FlushBegin",
                    "flush": e.flush_index,
                    "args": {
                        "dirty_objects": e.dirty_objects,
                        "removed_objects": e.removed_objects,
                        "reset_documents": e.reset_documents,
                    }
                }));
            }
            RecordedEvent::Populate(e) => {
                events.push(json!({
                    "name": "Populate",
                    "flush": flush,
                    "args": {
                        "node": node(e.node),
                        "object": e.object.0,
                        "children": e.children,
                        "moved": e.moved,
                        "created": e.created,
                        "adopted": e.adopted,
                        "reused": e.reused,
                        "parked": e.parked,
                    }
                }));
            }
            RecordedEvent::StructuralError(error) => {
                let args = match error {
                    RecordedStructural::ClaimCycle { parent, child } => json!({
                        "kind": "ClaimCycle",
                        "parent": parent.0,
                        "child": child.0,
                    }),
                    RecordedStructural::AdoptionCycle {
                        object,
                        node: n,
                        parent,
                    } => json!({
                        "kind": "AdoptionCycle",
                        "object": object.0,
                        "node": node(n),
                        "parent": node(parent),
                    }),
                    RecordedStructural::RelocationCycle {
                        object,
                        node: n,
                        destination,
                    } => json!({
                        "kind": "RelocationCycle",
                        "object": object.0,
                        "node": node(n),
                        "destination": node(destination),
                    }),
                };
                events.push(json!({
                    "name": "StructuralError",
                    "flush": flush,
                    "args": args,
                }));
            }
            RecordedEvent::RecordGone(object) => {
                events.push(json!({
                    "name": "RecordGone",
                    "flush": flush,
                    "args": { "object": object.0 }
                }));
            }
            RecordedEvent::Selection(e) => {
                events.push(json!({
                    "name": "Selection",
                    "flush": flush,
                    "args": {
                        "entries": e.entries,
                        "matched_nodes": e.matched_nodes,
                        "partial": e.partial,
                        "unresolved": e.unresolved,
                    }
                }));
            }
            RecordedEvent::FlushSummary(s) => {
                events.push(json!({
                    "name": "FlushSummary",
                    "flush": s.flush_index,
                    "args": {
                        "dirty_objects": s.dirty_objects,
                        "nodes_created": s.nodes_created,
                        "nodes_destroyed": s.nodes_destroyed,
                        "records_gone": s.records_gone,
                        "structural_errors": s.structural_errors,
                        "selection_changed": s.selection_changed,
                    }
                }));
                flush = None;
            }
        }
    }

    events
}

fn node(n: NodeRef) -> Value {
    json!({ "index": n.index, "generation": n.generation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use arbor_core::error::StructuralError;
    use arbor_core::id::ObjectId;
    use arbor_core::trace::{FlushBeginEvent, FlushSummary, ProjectionSink, SelectionEvent};

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_flush_begin(&FlushBeginEvent {
            flush_index: 2,
            dirty_objects: 1,
            ..FlushBeginEvent::default()
        });
        rec.on_structural_error(&StructuralError::ClaimCycle {
            parent: ObjectId(1),
            child: ObjectId(0),
        });
        rec.on_flush_summary(&FlushSummary {
            flush_index: 2,
            structural_errors: 1,
            ..FlushSummary::default()
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        let events = parsed.as_array().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1]["name"], "StructuralError");
        assert_eq!(events[1]["flush"], 2);
        assert_eq!(events[1]["args"]["kind"], "ClaimCycle");
        assert_eq!(events[1]["args"]["parent"], 1);
        assert_eq!(events[2]["args"]["structural_errors"], 1);
    }

    #[test]
    fn events_outside_a_flush_have_no_flush_index() {
        let mut rec = RecorderSink::new();
        rec.on_selection(&SelectionEvent {
            entries: 1,
            matched_nodes: 1,
            ..SelectionEvent::default()
        });
        let events = to_values(rec.as_bytes());
        assert_eq!(events.len(), 1);
        assert!(events[0]["flush"].is_null());
        assert_eq!(events[0]["args"]["matched_nodes"], 1);
    }
}
