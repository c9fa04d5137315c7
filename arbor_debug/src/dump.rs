// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON views of projection state.
//!
//! [`tree`] and [`all_documents`] render the materialized nodes with their view
//! state; useful for attaching to bug reports or diffing two runs.
//! Expansion snapshots and selections round-trip through their `serde`
//! representation.

use serde_json::{Value, json};

use arbor_core::forest::Forest;
use arbor_core::id::{DocumentId, NodeId};
use arbor_core::model::DocumentModel;
use arbor_core::node::ChildIndicator;
use arbor_core::select::SelectionEntry;
use arbor_core::snapshot::ExpansionSnapshot;

/// Renders the top-level nodes of `document` and everything materialized
/// below them.
#[must_use]
pub fn tree(forest: &Forest, model: &dyn DocumentModel, document: DocumentId) -> Value {
    Value::Array(
        forest
            .roots(document)
            .iter()
            .map(|&top| node(forest, model, top))
            .collect(),
    )
}

/// Renders every container of `forest`.
#[must_use]
pub fn all_documents(forest: &Forest, model: &dyn DocumentModel) -> Value {
    Value::Array(
        forest
            .containers()
            .map(|c| {
                let document = c.document();
                json!({
                    "document": document.0,
                    "name": model.document_name(document),
                    "records": c.records().count(),
                    "roots": tree(forest, model, document),
                })
            })
            .collect(),
    )
}

fn node(forest: &Forest, model: &dyn DocumentModel, id: NodeId) -> Value {
    let object = forest.object(id);
    let label = forest.record(object).map(|r| r.label().to_owned());
    let indicator = match forest.indicator(id) {
        ChildIndicator::ShowIndicator => "show",
        ChildIndicator::DontShowIndicator => "none",
    };
    let children: Vec<Value> = forest
        .children(id)
        .map(|child| node(forest, model, child))
        .collect();
    json!({
        "node": { "index": id.index(), "generation": id.generation() },
        "object": object.0,
        "name": model.name(object),
        "label": label,
        "expanded": forest.is_expanded(id),
        "populated": forest.is_populated(id),
        "indicator": indicator,
        "selected": forest.is_selected(id),
        "selection_ancestor": forest.is_selection_ancestor(id),
        "sub_paths": forest.sub_paths(id).collect::<Vec<_>>(),
        "children": children,
    })
}

/// Serializes an expansion snapshot.
pub fn snapshot_to_json(snapshot: &ExpansionSnapshot) -> serde_json::Result<Value> {
    serde_json::to_value(snapshot)
}

/// Deserializes an expansion snapshot written by [`snapshot_to_json`].
pub fn snapshot_from_json(value: Value) -> serde_json::Result<ExpansionSnapshot> {
    serde_json::from_value(value)
}

/// Serializes selection entries.
pub fn selection_to_json(entries: &[SelectionEntry]) -> serde_json::Result<Value> {
    serde_json::to_value(entries)
}

/// Deserializes selection entries written by [`selection_to_json`].
pub fn selection_from_json(value: Value) -> serde_json::Result<Vec<SelectionEntry>> {
    serde_json::from_value(value)
}
