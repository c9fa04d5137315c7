// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end scenarios: a [`MemoryDocument`] drives a [`Forest`] through
//! notifications and flushes, and every quiescent state is checked.

use arbor_core::config::ProjectorConfig;
use arbor_core::drop::{
    DragDirection, DropIntent, DropOperation, DropRejection, DropRequest, DropTarget,
    MutationRequest, execute_plan,
};
use arbor_core::error::{ProjectionError, StructuralError};
use arbor_core::forest::Forest;
use arbor_core::id::{DocumentId, NodeId, ObjectId};
use arbor_core::model::DocumentModel;
use arbor_core::node::ChildIndicator;
use arbor_core::path::{RelativeParent, SubName};
use arbor_core::select::SelectionEntry;
use arbor_harness::{MemoryDocument, assert_invariants, outline, sync};

fn forest_for(doc: &mut MemoryDocument, documents: &[DocumentId]) -> Forest {
    let mut forest = Forest::default();
    for &d in documents {
        forest.attach_document(d);
    }
    sync(&mut forest, doc);
    assert_invariants(&forest, doc);
    forest
}

fn root_of(forest: &Forest, object: ObjectId) -> NodeId {
    forest
        .record(object)
        .and_then(|r| r.root_instance())
        .expect("object has a top-level node")
}

fn child_of(forest: &Forest, parent: NodeId, object: ObjectId) -> NodeId {
    forest
        .children(parent)
        .find(|&c| forest.object(c) == object)
        .expect("child node exists")
}

/// `P1` and `P2` both claim `X`.
fn shared_child() -> (MemoryDocument, DocumentId, [ObjectId; 3]) {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let p1 = doc.add_object(d, "P1");
    let p2 = doc.add_object(d, "P2");
    let x = doc.add_object(d, "X");
    doc.claim(p1, x);
    doc.claim(p2, x);
    (doc, d, [p1, p2, x])
}

// -- Projection --

#[test]
fn shared_child_appears_under_every_claimant() {
    let (mut doc, d, [p1, p2, x]) = shared_child();
    let mut forest = Forest::default();
    forest.attach_document(d);
    let report = sync(&mut forest, &mut doc);
    assert_eq!(report.created.len(), 3);
    assert!(report.structural_errors.is_empty());

    // P2 stays lazy: X is already visible under P1.
    let p2_node = root_of(&forest, p2);
    assert!(!forest.is_populated(p2_node));
    assert_eq!(forest.indicator(p2_node), ChildIndicator::ShowIndicator);
    assert_eq!(outline(&forest, &doc, d), "P1\n  X\nP2\n");

    forest.set_expanded(&doc, p2_node, true).unwrap();
    assert_eq!(outline(&forest, &doc, d), "P1\n  X\nP2\n  X\n");
    let record = forest.record(x).unwrap();
    assert_eq!(record.instances().len(), 2);
    assert_eq!(record.root_instance(), None);
    let parents: Vec<_> = forest
        .nodes_of(x)
        .iter()
        .map(|&n| forest.parent(n).map(|p| forest.object(p)))
        .collect();
    assert!(parents.contains(&Some(p1)));
    assert!(parents.contains(&Some(p2)));
    assert_invariants(&forest, &doc);
}

#[test]
fn unclaimed_object_has_a_single_root() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let y = doc.add_object(d, "Y");
    let forest = forest_for(&mut doc, &[d]);

    let nodes = forest.nodes_of(y);
    assert_eq!(nodes.len(), 1);
    assert_eq!(forest.record(y).unwrap().root_instance(), Some(nodes[0]));
    assert_eq!(forest.parent(nodes[0]), None);
    assert_eq!(forest.indicator(nodes[0]), ChildIndicator::DontShowIndicator);
}

#[test]
fn dropping_one_claim_keeps_the_other_instance() {
    let (mut doc, d, [p1, p2, x]) = shared_child();
    let mut forest = forest_for(&mut doc, &[d]);
    let p1_node = root_of(&forest, p1);
    let p2_node = root_of(&forest, p2);
    forest.set_expanded(&doc, p2_node, true).unwrap();
    let under_p1 = child_of(&forest, p1_node, x);
    let under_p2 = child_of(&forest, p2_node, x);

    doc.unclaim(p1, x);
    let report = sync(&mut forest, &mut doc);

    assert!(report.destroyed.contains(&under_p1));
    assert!(!forest.is_alive(under_p1));
    assert_eq!(forest.nodes_of(x), &[under_p2]);
    assert_eq!(forest.parent(under_p2), Some(p2_node));
    assert_eq!(forest.children(p1_node).count(), 0);
    assert_eq!(forest.record(x).unwrap().root_instance(), None);
    assert!(report.records_gone.is_empty());
    assert_invariants(&forest, &doc);
}

#[test]
fn claim_that_keeps_root_shows_object_twice() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let group = doc.add_object(d, "Group");
    let part = doc.add_object(d, "Part");
    doc.set_removes_from_root(group, false);
    doc.claim(group, part);
    let mut forest = forest_for(&mut doc, &[d]);

    let group_node = root_of(&forest, group);
    forest.set_expanded(&doc, group_node, true).unwrap();
    assert_eq!(outline(&forest, &doc, d), "Group\n  Part\nPart\n");
    assert_invariants(&forest, &doc);

    // Switching the policy moves the top-level node under its claimant.
    let root = root_of(&forest, part);
    doc.set_removes_from_root(group, true);
    sync(&mut forest, &mut doc);
    assert_eq!(outline(&forest, &doc, d), "Group\n  Part\n");
    assert_eq!(forest.record(part).unwrap().root_instance(), None);
    assert!(!forest.is_alive(root) || forest.parent(root) == Some(group_node));
    assert_invariants(&forest, &doc);
}

#[test]
fn populate_is_idempotent() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let p = doc.add_object(d, "P");
    let q = doc.add_object(d, "Q");
    let a = doc.add_object(d, "A");
    let b = doc.add_object(d, "B");
    doc.set_claims(p, &[a, b]);
    doc.claim(q, a);
    let mut forest = forest_for(&mut doc, &[d]);

    let p_node = root_of(&forest, p);
    forest.populate(&doc, p_node, false).unwrap();
    let first: Vec<_> = forest.children(p_node).collect();
    forest.populate(&doc, p_node, false).unwrap();
    forest.populate(&doc, p_node, true).unwrap();
    let second: Vec<_> = forest.children(p_node).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_invariants(&forest, &doc);
}

#[test]
fn invariants_hold_under_claim_churn() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let mut objects: Vec<ObjectId> = (0..6)
        .map(|i| doc.add_object(d, &format!("O{i}")))
        .collect();
    let mut forest = forest_for(&mut doc, &[d]);

    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = |bound: usize| {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((state >> 33) as usize) % bound
    };

    for step in 0..150 {
        let a = objects[next(objects.len())];
        let b = objects[next(objects.len())];
        match next(6) {
            0 | 1 => {
                if a != b && !doc.claims(a).contains(&b) {
                    doc.claim(a, b);
                }
            }
            2 => {
                if doc.claims(a).contains(&b) {
                    doc.unclaim(a, b);
                }
            }
            3 => {
                let removes = doc.remove_children_from_root(a);
                doc.set_removes_from_root(a, !removes);
            }
            4 => {
                if let Some(&node) = forest.nodes_of(a).first() {
                    forest.set_expanded(&doc, node, true).unwrap();
                }
            }
            _ => {
                if step % 4 == 0 && objects.len() > 3 {
                    doc.remove_object(a);
                    objects.retain(|&o| o != a);
                } else {
                    let fresh = doc.add_object(d, &format!("N{step}"));
                    doc.claim(a, fresh);
                    objects.push(fresh);
                }
            }
        }
        sync(&mut forest, &mut doc);
        assert_invariants(&forest, &doc);
        assert!(!forest.has_pending());
    }
}

#[test]
fn claim_cycle_is_reported_and_retried() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let a = doc.add_object(d, "A");
    let b = doc.add_object(d, "B");
    doc.claim(a, b);
    doc.claim(b, a);
    let mut forest = Forest::default();
    forest.attach_document(d);
    let report = sync(&mut forest, &mut doc);

    assert_eq!(
        report.structural_errors,
        vec![StructuralError::ClaimCycle {
            parent: b,
            child: a,
        }]
    );
    assert_eq!(outline(&forest, &doc, d), "A\n  B\n");
    assert_invariants(&forest, &doc);
    let a_node = root_of(&forest, a);
    let b_node = child_of(&forest, a_node, b);

    // Once A lets go, B's claim on A no longer closes a cycle. B is refreshed
    // first, while it still hangs below A, so A is only adopted once B has
    // moved to the top level.
    doc.unclaim(a, b);
    let report = sync(&mut forest, &mut doc);
    assert_eq!(
        report.structural_errors,
        vec![StructuralError::AdoptionCycle {
            object: a,
            node: a_node,
            parent: b_node,
        }]
    );
    assert_eq!(outline(&forest, &doc, d), "B\n  A\n");
    assert_eq!(forest.parent(a_node), Some(b_node));
    assert_invariants(&forest, &doc);
}

#[test]
fn parent_and_child_swap_in_one_flush() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let x = doc.add_object(d, "X");
    let p = doc.add_object(d, "P");
    doc.claim(x, p);
    let mut forest = forest_for(&mut doc, &[d]);
    assert_eq!(outline(&forest, &doc, d), "X\n  P\n");
    let x_node = root_of(&forest, x);
    let p_node = child_of(&forest, x_node, p);

    doc.set_claims(x, &[]);
    doc.claim(p, x);
    let report = sync(&mut forest, &mut doc);

    // P still hangs below X when it is refreshed; adopting X there would
    // put X below itself.
    assert_eq!(
        report.structural_errors,
        vec![StructuralError::AdoptionCycle {
            object: x,
            node: x_node,
            parent: p_node,
        }]
    );
    assert_eq!(outline(&forest, &doc, d), "P\n  X\n");
    assert_eq!(root_of(&forest, p), p_node);
    assert_eq!(forest.parent(x_node), Some(p_node));
    assert_eq!(forest.nodes_of(x), &[x_node]);
    assert!(report.created.is_empty());
    assert!(report.destroyed.is_empty());
    let x_record = forest.record(x).unwrap();
    assert_eq!(x_record.root_instance(), None);
    assert!(!x_record.is_forced_root());
    assert!(!forest.has_pending());
    assert_invariants(&forest, &doc);
}

#[test]
fn removed_object_disappears_everywhere() {
    let (mut doc, d, [p1, p2, x]) = shared_child();
    let mut forest = forest_for(&mut doc, &[d]);
    forest.set_expanded(&doc, root_of(&forest, p2), true).unwrap();

    doc.remove_object(x);
    let report = sync(&mut forest, &mut doc);
    assert_eq!(report.records_gone, vec![x]);
    assert!(forest.nodes_of(x).is_empty());
    assert_eq!(forest.children(root_of(&forest, p1)).count(), 0);
    assert_eq!(forest.children(root_of(&forest, p2)).count(), 0);
    assert_eq!(outline(&forest, &doc, d), "P1\nP2\n");
    assert_invariants(&forest, &doc);
}

#[test]
fn rename_refreshes_label() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let y = doc.add_object(d, "Y");
    let mut forest = forest_for(&mut doc, &[d]);

    doc.set_label(y, "Renamed");
    let report = sync(&mut forest, &mut doc);
    assert_eq!(report.relabeled, vec![y]);
    assert_eq!(forest.record(y).unwrap().label(), "Renamed");
    assert!(report.created.is_empty());
}

#[test]
fn document_reset_rebuilds_content() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let a = doc.add_object(d, "A");
    let b = doc.add_object(d, "B");
    doc.claim(a, b);
    let mut forest = forest_for(&mut doc, &[d]);

    doc.clear_document(d);
    let n = doc.add_object(d, "N");
    let report = sync(&mut forest, &mut doc);
    assert!(report.records_gone.contains(&a));
    assert!(report.records_gone.contains(&b));
    assert_eq!(outline(&forest, &doc, d), "N\n");
    assert_eq!(forest.node_count(), 1);
    assert_eq!(forest.nodes_of(n).len(), 1);
    assert_invariants(&forest, &doc);
}

#[test]
fn closing_a_document_discards_its_nodes() {
    let (mut doc, d, [p1, ..]) = shared_child();
    let mut forest = forest_for(&mut doc, &[d]);
    let old = root_of(&forest, p1);

    forest.detach_document(d);
    sync(&mut forest, &mut doc);
    assert!(forest.roots(d).is_empty());
    assert!(forest.container(d).is_none());
    assert_eq!(forest.node_count(), 0);
    assert!(!forest.is_alive(old));
}

#[test]
fn cross_document_claim_keeps_root_in_its_own_document() {
    let mut doc = MemoryDocument::new();
    let assembly_doc = doc.add_document("Doc");
    let lib = doc.add_document("Lib");
    let asm = doc.add_object(assembly_doc, "Asm");
    let bolt = doc.add_object(lib, "Bolt");
    doc.claim(asm, bolt);
    let mut forest = forest_for(&mut doc, &[assembly_doc, lib]);

    let asm_node = root_of(&forest, asm);
    forest.set_expanded(&doc, asm_node, true).unwrap();
    let bolt_root = root_of(&forest, bolt);
    assert_eq!(forest.owner(bolt_root), lib);
    assert!(forest.roots(lib).contains(&bolt_root));
    let under_asm = child_of(&forest, asm_node, bolt);
    assert_eq!(
        forest.sub_name_from_root(&doc, under_asm),
        SubName {
            top: asm,
            path: "Lib#Bolt.".into(),
        }
    );
    let found = forest.find_node_by_path(&doc, asm, "Lib#Bolt.");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].node, under_asm);
    assert_eq!(found[0].element, None);

    let to_assembly = DropRequest::new(vec![bolt_root], DropTarget::Document(assembly_doc));
    let plan = forest.plan_drop(&doc, &to_assembly);
    assert_eq!(plan.operation, Some(DropOperation::Copy));
    assert_eq!(
        plan.requests,
        vec![MutationRequest::Duplicate {
            object: bolt,
            into: None,
            document: assembly_doc,
        }]
    );
    let plan = forest.plan_drop(&doc, &to_assembly.with_intent(DropIntent::Move));
    assert_eq!(plan.rejection, Some(DropRejection::CrossDocumentMove(bolt)));
    assert_invariants(&forest, &doc);
}

// -- Addressing and selection --

/// `Y` claims `sub1`, which exposes the element `sub2`.
fn element_fixture() -> (MemoryDocument, DocumentId, ObjectId, ObjectId) {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let y = doc.add_object(d, "Y");
    let sub1 = doc.add_object(d, "sub1");
    doc.claim(y, sub1);
    doc.add_sub_object(sub1, "sub2");
    (doc, d, y, sub1)
}

#[test]
fn element_selection_marks_the_owning_node() {
    let (mut doc, d, y, sub1) = element_fixture();
    let mut forest = forest_for(&mut doc, &[d]);
    let y_node = root_of(&forest, y);
    let sub1_node = child_of(&forest, y_node, sub1);

    let entries = vec![SelectionEntry::new(y, "sub1.sub2")];
    let report = forest.set_selection(&doc, &entries);
    assert_eq!(report.matched_nodes, vec![sub1_node]);
    assert_eq!(report.partial, 0);
    assert!(report.unresolved.is_empty());

    assert_eq!(forest.sub_paths(sub1_node).collect::<Vec<_>>(), vec!["sub2"]);
    assert!(!forest.is_selected(sub1_node));
    assert!(forest.is_selection_ancestor(y_node));
    assert_eq!(forest.sub_paths(y_node).count(), 0);
    assert_eq!(forest.selected_nodes(), vec![sub1_node]);
    assert_eq!(forest.get_selection(&doc), entries);

    let found = forest.find_node_by_path(&doc, y, "sub1.sub2");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].node, sub1_node);
    assert_eq!(found[0].element.as_deref(), Some("sub2"));
    assert!(!found[0].partial);
}

#[test]
fn unmatched_segment_keeps_the_rest_verbatim() {
    let (mut doc, d, y, _) = element_fixture();
    let mut forest = forest_for(&mut doc, &[d]);
    let y_node = root_of(&forest, y);

    let report = forest.set_selection(&doc, &[SelectionEntry::new(y, "ghost.Face1")]);
    assert_eq!(report.matched_nodes, vec![y_node]);
    assert_eq!(report.partial, 1);
    assert_eq!(
        forest.sub_paths(y_node).collect::<Vec<_>>(),
        vec!["ghost.Face1"]
    );
    assert_eq!(
        forest.get_selection(&doc),
        vec![SelectionEntry::new(y, "ghost.Face1")]
    );
}

#[test]
fn selection_round_trips_through_node_marks() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let group = doc.add_object(d, "G");
    let body = doc.add_object(d, "Body");
    let pad = doc.add_object(d, "Pad");
    let y = doc.add_object(d, "Y");
    doc.set_grouping(group, true);
    doc.claim(group, body);
    doc.claim(body, pad);
    doc.add_sub_object(pad, "Face1");
    let mut forest = forest_for(&mut doc, &[d]);

    forest.set_selection(
        &doc,
        &[
            SelectionEntry::new(group, "Body.Pad.Face1"),
            SelectionEntry::whole(y),
        ],
    );
    let nodes = forest.selected_nodes();
    assert_eq!(nodes.len(), 2);

    // Grouping objects do not own the addresses of their members.
    let derived = forest.get_selection(&doc);
    assert_eq!(
        derived,
        vec![
            SelectionEntry::new(body, "Pad.Face1"),
            SelectionEntry::whole(y),
        ]
    );

    forest.set_selection(&doc, &derived);
    assert_eq!(forest.selected_nodes(), nodes);
    assert_eq!(forest.get_selection(&doc), derived);
    for entry in &derived {
        let found = forest.find_node_by_path(&doc, entry.object, &entry.sub_path);
        assert_eq!(found.len(), 1);
        assert!(nodes.contains(&found[0].node));
    }
}

#[test]
fn derived_selection_stays_on_one_instance_of_a_shared_object() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let r1 = doc.add_object(d, "R1");
    let r2 = doc.add_object(d, "R2");
    let a = doc.add_object(d, "A");
    let n = doc.add_object(d, "N");
    doc.claim(r1, a);
    doc.claim(r2, a);
    doc.claim(a, n);
    let mut forest = forest_for(&mut doc, &[d]);
    forest.set_expanded(&doc, root_of(&forest, r2), true).unwrap();
    assert_eq!(forest.nodes_of(a).len(), 2);
    let n_node = child_of(&forest, child_of(&forest, root_of(&forest, r1), a), n);

    let report = forest.set_selection(&doc, &[SelectionEntry::new(r1, "A.N.")]);
    assert_eq!(report.matched_nodes, vec![n_node]);

    // A is shown twice, so the entry starts above it.
    let derived = forest.get_selection(&doc);
    assert_eq!(derived, vec![SelectionEntry::new(r1, "A.N.")]);
    assert_eq!(
        forest.sub_name_from_root(&doc, n_node),
        SubName {
            top: a,
            path: "N.".into(),
        }
    );

    forest.set_selection(&doc, &derived);
    assert_eq!(forest.selected_nodes(), vec![n_node]);
    assert_eq!(forest.nodes_of(n), &[n_node]);
    assert_eq!(forest.get_selection(&doc), derived);
    assert_invariants(&forest, &doc);
}

#[test]
fn grouping_objects_are_skipped_in_sub_names() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let group = doc.add_object(d, "G");
    let body = doc.add_object(d, "Body");
    let pad = doc.add_object(d, "Pad");
    doc.set_grouping(group, true);
    doc.claim(group, body);
    doc.claim(body, pad);
    let mut forest = forest_for(&mut doc, &[d]);

    let body_node = child_of(&forest, root_of(&forest, group), body);
    forest.set_expanded(&doc, body_node, true).unwrap();
    let pad_node = child_of(&forest, body_node, pad);
    assert_eq!(
        forest.sub_name_from_root(&doc, pad_node),
        SubName {
            top: body,
            path: "Pad.".into(),
        }
    );
    assert_eq!(
        forest.sub_name_from_root(&doc, body_node),
        SubName {
            top: group,
            path: "Body.".into(),
        }
    );
}

#[test]
fn selection_is_reapplied_after_a_flush() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let y = doc.add_object(d, "Y");
    let s = doc.add_object(d, "S");
    doc.claim(y, s);
    let mut forest = forest_for(&mut doc, &[d]);
    let y_node = root_of(&forest, y);
    let s_node = child_of(&forest, y_node, s);
    forest.set_selection(&doc, &[SelectionEntry::new(y, "S.")]);
    assert!(forest.is_selected(s_node));

    // Inserting a sibling in front moves S, which drops its marks until
    // the selection is applied again.
    let fresh = doc.add_object(d, "New");
    doc.set_claims(y, &[fresh, s]);
    let report = sync(&mut forest, &mut doc);
    assert!(forest.is_selected(s_node));
    assert!(forest.is_selection_ancestor(y_node));
    assert!(!report.selection_changed);

    // Without the claim the path no longer resolves below Y.
    doc.set_claims(y, &[fresh]);
    let report = sync(&mut forest, &mut doc);
    assert!(report.selection_changed);
    assert!(!forest.is_alive(s_node) || !forest.is_selected(s_node));
    assert_eq!(forest.sub_paths(y_node).collect::<Vec<_>>(), vec!["S."]);
    assert_invariants(&forest, &doc);
}

#[test]
fn batch_selection_leaves_lazy_nodes_alone() {
    let (mut doc, d, [_, p2, x]) = shared_child();
    let mut forest = Forest::new(ProjectorConfig::batch());
    forest.attach_document(d);
    sync(&mut forest, &mut doc);
    let p2_node = root_of(&forest, p2);

    let report = forest.set_selection(&doc, &[SelectionEntry::new(p2, "X.")]);
    assert_eq!(report.matched_nodes, vec![p2_node]);
    assert_eq!(report.partial, 1);
    assert!(!forest.is_populated(p2_node));

    forest.set_config(ProjectorConfig::interactive());
    let report = forest.set_selection(&doc, &[SelectionEntry::new(p2, "X.")]);
    let under_p2 = child_of(&forest, p2_node, x);
    assert_eq!(report.matched_nodes, vec![under_p2]);
    assert!(forest.is_selected(under_p2));
    assert_invariants(&forest, &doc);
}

// -- Drag and drop --

#[test]
fn drop_onto_own_descendant_is_rejected() {
    let (mut doc, d, [p1, _, x]) = shared_child();
    let forest = forest_for(&mut doc, &[d]);
    let p1_node = root_of(&forest, p1);
    let x_node = child_of(&forest, p1_node, x);
    let before = outline(&forest, &doc, d);

    let plan = forest.plan_drop(&doc, &DropRequest::new(vec![p1_node], DropTarget::Node(x_node)));
    assert!(plan.is_rejected());
    assert_eq!(
        plan.rejection,
        Some(DropRejection::Cycle {
            object: p1,
            target: x,
        })
    );
    assert!(plan.requests.is_empty());
    assert_eq!(outline(&forest, &doc, d), before);
}

#[test]
fn drop_onto_object_reachable_through_claims_is_rejected() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let a = doc.add_object(d, "A");
    let b = doc.add_object(d, "B");
    let q = doc.add_object(d, "Q");
    doc.claim(a, b);
    doc.set_removes_from_root(q, false);
    doc.claim(q, b);
    let mut forest = forest_for(&mut doc, &[d]);
    let q_node = root_of(&forest, q);
    forest.set_expanded(&doc, q_node, true).unwrap();
    let b_under_q = child_of(&forest, q_node, b);

    let request = DropRequest::new(vec![root_of(&forest, a)], DropTarget::Node(b_under_q));
    let plan = forest.plan_drop(&doc, &request);
    assert_eq!(
        plan.rejection,
        Some(DropRejection::Cycle {
            object: a,
            target: b,
        })
    );
}

#[test]
fn move_reparents_and_keeps_node_state() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let a = doc.add_object(d, "A");
    let b = doc.add_object(d, "B");
    let c = doc.add_object(d, "C");
    let leaf = doc.add_object(d, "D");
    doc.claim(a, c);
    doc.claim(c, leaf);
    let mut forest = forest_for(&mut doc, &[d]);
    let c_node = child_of(&forest, root_of(&forest, a), c);
    forest.set_expanded(&doc, c_node, true).unwrap();
    let b_node = root_of(&forest, b);

    let plan = forest.plan_drop(&doc, &DropRequest::new(vec![c_node], DropTarget::Node(b_node)));
    assert_eq!(plan.operation, Some(DropOperation::Move));
    assert_eq!(
        plan.requests,
        vec![MutationRequest::Reparent {
            object: c,
            from: Some(a),
            to: Some(b),
            document: d,
            index: None,
            anchor: None,
        }]
    );
    assert_eq!(execute_plan(&plan, &mut doc).unwrap(), 1);
    sync(&mut forest, &mut doc);

    assert_eq!(forest.parent(c_node), Some(b_node));
    assert!(forest.is_expanded(c_node));
    assert_eq!(outline(&forest, &doc, d), "A\nB\n  C\n    D\n");
    assert_invariants(&forest, &doc);
}

#[test]
fn move_onto_document_makes_object_top_level() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let a = doc.add_object(d, "A");
    let c = doc.add_object(d, "C");
    doc.claim(a, c);
    let mut forest = forest_for(&mut doc, &[d]);
    let c_node = child_of(&forest, root_of(&forest, a), c);

    let plan = forest.plan_drop(&doc, &DropRequest::new(vec![c_node], DropTarget::Document(d)));
    assert_eq!(
        plan.requests,
        vec![MutationRequest::Reparent {
            object: c,
            from: Some(a),
            to: None,
            document: d,
            index: None,
            anchor: None,
        }]
    );
    execute_plan(&plan, &mut doc).unwrap();
    sync(&mut forest, &mut doc);
    assert_eq!(root_of(&forest, c), c_node);
    assert_eq!(forest.parent(c_node), None);
    assert_eq!(outline(&forest, &doc, d), "A\nC\n");
    assert_invariants(&forest, &doc);
}

/// `T` holds the groupings `G1` (with `C` and `E`) and `G2` (with `D`).
fn grouped_cousins() -> (MemoryDocument, DocumentId, [ObjectId; 6]) {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let t = doc.add_object(d, "T");
    let g1 = doc.add_object(d, "G1");
    let g2 = doc.add_object(d, "G2");
    let c = doc.add_object(d, "C");
    let e = doc.add_object(d, "E");
    let dd = doc.add_object(d, "D");
    doc.set_grouping(g1, true);
    doc.set_grouping(g2, true);
    doc.set_claims(t, &[g1, g2]);
    doc.set_claims(g1, &[c, e]);
    doc.claim(g2, dd);
    (doc, d, [t, g1, g2, c, e, dd])
}

#[test]
fn relative_parent_is_the_deepest_shared_object() {
    let (mut doc, d, [t, g1, g2, c, e, dd]) = grouped_cousins();
    let z = doc.add_object(d, "Z");
    let mut forest = forest_for(&mut doc, &[d]);
    assert_eq!(outline(&forest, &doc, d), "T\n  G1\n    C\n    E\n  G2\n    D\nZ\n");
    let t_node = root_of(&forest, t);
    let g1_node = child_of(&forest, t_node, g1);
    let c_node = child_of(&forest, g1_node, c);
    let e_node = child_of(&forest, g1_node, e);
    let d_node = child_of(&forest, child_of(&forest, t_node, g2), dd);

    assert_eq!(
        forest.relative_parent(&doc, c_node, e_node),
        Some(RelativeParent {
            parent: g1,
            path: "C.".into(),
        })
    );
    assert_eq!(
        forest.relative_parent(&doc, c_node, d_node),
        Some(RelativeParent {
            parent: t,
            path: "G1.C.".into(),
        })
    );
    assert_eq!(
        forest.relative_parent(&doc, d_node, c_node),
        Some(RelativeParent {
            parent: t,
            path: "G2.D.".into(),
        })
    );
    assert_eq!(forest.relative_parent(&doc, c_node, root_of(&forest, z)), None);
}

#[test]
fn move_and_replace_plans_carry_the_anchor() {
    let (mut doc, d, [t, g1, g2, c, e, dd]) = grouped_cousins();
    doc.set_replaceable(g2, true);
    let mut forest = forest_for(&mut doc, &[d]);
    let t_node = root_of(&forest, t);
    let g1_node = child_of(&forest, t_node, g1);
    let c_node = child_of(&forest, g1_node, c);
    let e_node = child_of(&forest, g1_node, e);
    let d_node = child_of(&forest, child_of(&forest, t_node, g2), dd);

    let onto_sibling =
        DropRequest::new(vec![c_node], DropTarget::Node(e_node)).with_intent(DropIntent::Move);
    let plan = forest.plan_drop(&doc, &onto_sibling);
    assert_eq!(
        plan.requests,
        vec![MutationRequest::Reparent {
            object: c,
            from: Some(g1),
            to: Some(e),
            document: d,
            index: None,
            anchor: Some(RelativeParent {
                parent: g1,
                path: "C.".into(),
            }),
        }]
    );

    let replace =
        DropRequest::new(vec![c_node], DropTarget::Node(d_node)).with_intent(DropIntent::Replace);
    let plan = forest.plan_drop(&doc, &replace);
    assert_eq!(plan.operation, Some(DropOperation::Replace));
    assert_eq!(
        plan.requests,
        vec![
            MutationRequest::Reparent {
                object: c,
                from: Some(g1),
                to: Some(g2),
                document: d,
                index: Some(0),
                anchor: Some(RelativeParent {
                    parent: t,
                    path: "G1.C.".into(),
                }),
            },
            MutationRequest::Detach {
                object: dd,
                from: g2,
            },
        ]
    );
    execute_plan(&plan, &mut doc).unwrap();
    sync(&mut forest, &mut doc);
    assert_eq!(outline(&forest, &doc, d), "T\n  G1\n    E\n  G2\n    C\nD\n");
    assert_invariants(&forest, &doc);
}

#[test]
fn reorder_follows_drop_side() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let a = doc.add_object(d, "A");
    let b = doc.add_object(d, "B");
    let c = doc.add_object(d, "C");
    let e = doc.add_object(d, "E");
    doc.set_claims(a, &[b, c, e]);
    let mut forest = forest_for(&mut doc, &[d]);
    let a_node = root_of(&forest, a);
    let e_node = child_of(&forest, a_node, e);

    let before_b = DropRequest::new(vec![e_node], DropTarget::Node(child_of(&forest, a_node, b)))
        .with_intent(DropIntent::ReorderBefore);
    let plan = forest.plan_drop(&doc, &before_b);
    assert_eq!(
        plan.requests,
        vec![MutationRequest::Reorder {
            parent: Some(a),
            document: d,
            order: vec![e, b, c],
        }]
    );
    execute_plan(&plan, &mut doc).unwrap();
    sync(&mut forest, &mut doc);
    assert_eq!(outline(&forest, &doc, d), "A\n  E\n  B\n  C\n");
    assert_eq!(forest.children(a_node).next(), Some(e_node));

    // A plain drop between siblings reorders on the side the drag came from.
    let onto_c = DropRequest::new(vec![e_node], DropTarget::Node(child_of(&forest, a_node, c)))
        .with_direction(DragDirection::Down);
    let plan = forest.plan_drop(&doc, &onto_c);
    assert_eq!(plan.operation, Some(DropOperation::Reorder));
    execute_plan(&plan, &mut doc).unwrap();
    sync(&mut forest, &mut doc);
    assert_eq!(outline(&forest, &doc, d), "A\n  B\n  C\n  E\n");
    assert_invariants(&forest, &doc);
}

#[test]
fn reorder_at_top_level_resorts_roots() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let x = doc.add_object(d, "X");
    let y = doc.add_object(d, "Y");
    let z = doc.add_object(d, "Z");
    let mut forest = forest_for(&mut doc, &[d]);
    let x_node = root_of(&forest, x);

    let request = DropRequest::new(vec![root_of(&forest, z)], DropTarget::Node(x_node))
        .with_intent(DropIntent::ReorderBefore);
    let plan = forest.plan_drop(&doc, &request);
    assert_eq!(
        plan.requests,
        vec![MutationRequest::Reorder {
            parent: None,
            document: d,
            order: vec![z, x, y],
        }]
    );
    execute_plan(&plan, &mut doc).unwrap();
    sync(&mut forest, &mut doc);
    assert_eq!(outline(&forest, &doc, d), "Z\nX\nY\n");
    assert_eq!(root_of(&forest, x), x_node);
    assert_invariants(&forest, &doc);
}

#[test]
fn replace_swaps_the_claimed_child() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let a = doc.add_object(d, "A");
    let b = doc.add_object(d, "B");
    let e = doc.add_object(d, "E");
    doc.claim(a, b);
    doc.set_replaceable(a, true);
    let mut forest = forest_for(&mut doc, &[d]);
    let b_node = child_of(&forest, root_of(&forest, a), b);
    let e_node = root_of(&forest, e);

    let request =
        DropRequest::new(vec![e_node], DropTarget::Node(b_node)).with_intent(DropIntent::Replace);
    let plan = forest.plan_drop(&doc, &request);
    assert_eq!(plan.operation, Some(DropOperation::Replace));
    assert!(matches!(
        plan.requests.as_slice(),
        [
            MutationRequest::Reparent {
                object,
                from: None,
                to: Some(owner),
                index: Some(0),
                ..
            },
            MutationRequest::Detach { object: detached, from },
        ] if *object == e && *owner == a && *detached == b && *from == a
    ));
    assert_eq!(execute_plan(&plan, &mut doc).unwrap(), 2);
    sync(&mut forest, &mut doc);
    assert_eq!(outline(&forest, &doc, d), "A\n  E\nB\n");
    assert_eq!(forest.nodes_of(e), &[e_node]);
    assert_invariants(&forest, &doc);
}

#[test]
fn replace_checks_owner_and_arity() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let a = doc.add_object(d, "A");
    let b = doc.add_object(d, "B");
    let e = doc.add_object(d, "E");
    let f = doc.add_object(d, "F");
    doc.claim(a, b);
    let forest = forest_for(&mut doc, &[d]);
    let a_node = root_of(&forest, a);
    let b_node = child_of(&forest, a_node, b);
    let e_node = root_of(&forest, e);

    let single =
        DropRequest::new(vec![e_node], DropTarget::Node(b_node)).with_intent(DropIntent::Replace);
    assert_eq!(
        forest.plan_drop(&doc, &single).rejection,
        Some(DropRejection::ReplaceNotAllowed {
            owner: a,
            target: b,
            object: e,
        })
    );
    let pair = DropRequest::new(vec![e_node, root_of(&forest, f)], DropTarget::Node(b_node))
        .with_intent(DropIntent::Replace);
    assert_eq!(
        forest.plan_drop(&doc, &pair).rejection,
        Some(DropRejection::ReplaceArity(2))
    );
    let top =
        DropRequest::new(vec![e_node], DropTarget::Node(a_node)).with_intent(DropIntent::Replace);
    assert_eq!(
        forest.plan_drop(&doc, &top).rejection,
        Some(DropRejection::ReplaceWithoutParent(a))
    );
}

#[test]
fn copy_duplicates_and_link_references() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let a = doc.add_object(d, "A");
    let c = doc.add_object(d, "C");
    let mut forest = forest_for(&mut doc, &[d]);
    let a_node = root_of(&forest, a);
    let c_node = root_of(&forest, c);

    let copy =
        DropRequest::new(vec![c_node], DropTarget::Node(a_node)).with_intent(DropIntent::Copy);
    let plan = forest.plan_drop(&doc, &copy);
    assert_eq!(
        plan.requests,
        vec![MutationRequest::Duplicate {
            object: c,
            into: Some(a),
            document: d,
        }]
    );
    execute_plan(&plan, &mut doc).unwrap();
    sync(&mut forest, &mut doc);
    assert_eq!(outline(&forest, &doc, d), "A\n  C001\nC\n");
    assert_invariants(&forest, &doc);

    let link =
        DropRequest::new(vec![c_node], DropTarget::Node(a_node)).with_intent(DropIntent::Link);
    let plan = forest.plan_drop(&doc, &link);
    assert_eq!(plan.operation, Some(DropOperation::Link));
    assert_eq!(
        plan.requests,
        vec![MutationRequest::AddReference {
            object: c,
            into: Some(a),
            document: d,
        }]
    );
    execute_plan(&plan, &mut doc).unwrap();
    sync(&mut forest, &mut doc);
    assert_eq!(outline(&forest, &doc, d), "A\n  C001\n  C\n");
    assert_eq!(forest.nodes_of(c), &[c_node]);
    assert_invariants(&forest, &doc);
}

#[test]
fn drop_rejections_leave_the_document_untouched() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let a = doc.add_object(d, "A");
    let b = doc.add_object(d, "B");
    let c = doc.add_object(d, "C");
    doc.claim(a, c);
    doc.set_accepts_drops(b, false);
    let mut forest = forest_for(&mut doc, &[d]);
    let a_node = root_of(&forest, a);
    let b_node = root_of(&forest, b);
    let c_node = child_of(&forest, a_node, c);

    let cases = [
        (
            DropRequest::new(vec![c_node], DropTarget::Node(b_node)),
            DropRejection::NotAccepted {
                object: c,
                target: b,
            },
        ),
        (
            DropRequest::new(vec![c_node], DropTarget::Node(a_node)),
            DropRejection::SameParent(c),
        ),
        (
            DropRequest::new(vec![c_node], DropTarget::Node(b_node))
                .with_intent(DropIntent::ReorderAfter),
            DropRejection::NotSiblings(c),
        ),
        (
            DropRequest::new(vec![c_node], DropTarget::Document(d))
                .with_intent(DropIntent::ReorderBefore),
            DropRejection::NeedsNodeTarget(DropOperation::Reorder),
        ),
        (
            DropRequest::new(vec![], DropTarget::Document(d)),
            DropRejection::NoSources,
        ),
        (
            DropRequest::new(vec![c_node], DropTarget::Document(DocumentId(99))),
            DropRejection::UnknownDocument(DocumentId(99)),
        ),
    ];
    for (request, expected) in cases {
        let plan = forest.plan_drop(&doc, &request);
        assert_eq!(plan.rejection, Some(expected));
        assert_eq!(plan.operation, None);
        assert_eq!(
            execute_plan(&plan, &mut doc),
            Err(ProjectionError::Rejected(plan.rejection.clone().unwrap()))
        );
    }
    assert!(doc.applied().is_empty());

    doc.unclaim(a, c);
    sync(&mut forest, &mut doc);
    doc.remove_object(a);
    sync(&mut forest, &mut doc);
    let stale = DropRequest::new(vec![a_node], DropTarget::Node(b_node));
    assert_eq!(
        forest.plan_drop(&doc, &stale).rejection,
        Some(DropRejection::StaleSource(a_node))
    );
}

#[test]
fn read_only_document_fails_execution() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let a = doc.add_object(d, "A");
    let c = doc.add_object(d, "C");
    let forest = forest_for(&mut doc, &[d]);
    let plan = forest.plan_drop(
        &doc,
        &DropRequest::new(vec![root_of(&forest, c)], DropTarget::Node(root_of(&forest, a))),
    );
    assert!(!plan.is_rejected());

    doc.set_read_only(true);
    assert!(matches!(
        execute_plan(&plan, &mut doc),
        Err(ProjectionError::Mutation { index: 0, .. })
    ));
}

// -- Expansion snapshots and handles --

#[test]
fn expansion_snapshot_restores_into_a_fresh_forest() {
    let mut doc = MemoryDocument::new();
    let d = doc.add_document("Doc");
    let a = doc.add_object(d, "A");
    let b = doc.add_object(d, "B");
    let c = doc.add_object(d, "C");
    doc.claim(a, b);
    doc.claim(b, c);
    let mut forest = forest_for(&mut doc, &[d]);
    let a_node = root_of(&forest, a);
    forest.set_expanded(&doc, a_node, true).unwrap();
    forest.set_expanded(&doc, child_of(&forest, a_node, b), true).unwrap();

    let snapshot = forest.expansion_snapshot(&doc, d).unwrap();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.get("A").and_then(|s| s.get("B")).is_some());

    let mut fresh = forest_for(&mut doc, &[d]);
    assert_eq!(fresh.restore_expansion(&doc, d, &snapshot).unwrap(), 2);
    assert_eq!(fresh.expansion_snapshot(&doc, d).unwrap(), snapshot);
    assert_invariants(&fresh, &doc);

    assert_eq!(
        fresh.restore_expansion(&doc, DocumentId(42), &snapshot),
        Err(ProjectionError::UnknownDocument(DocumentId(42)))
    );
}

#[test]
fn stale_handles_are_reported() {
    let (mut doc, d, [p1, _, x]) = shared_child();
    let mut forest = forest_for(&mut doc, &[d]);
    let x_node = child_of(&forest, root_of(&forest, p1), x);

    doc.unclaim(p1, x);
    sync(&mut forest, &mut doc);
    assert!(!forest.is_alive(x_node));
    assert_eq!(
        forest.set_expanded(&doc, x_node, true),
        Err(ProjectionError::StaleNode(x_node))
    );
    assert_eq!(
        forest.populate(&doc, x_node, false),
        Err(ProjectionError::StaleNode(x_node))
    );
    assert_eq!(
        forest.resolve_path(&doc, x_node, "A."),
        Err(ProjectionError::StaleNode(x_node))
    );
}
