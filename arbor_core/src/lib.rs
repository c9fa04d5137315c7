// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental tree projection of a document object graph.
//!
//! `arbor_core` keeps a tree-shaped view synchronized with a directed
//! acyclic graph of document objects. An object may be *claimed* by several
//! parents, so it may appear as several nodes at once; an object nobody
//! removes from the top level keeps exactly one top-level node. The crate is
//! `no_std` compatible (with `alloc`) and stores nodes in a struct-of-arrays
//! arena addressed by generational handles. It never touches widgets: views
//! read node state through accessors and rebuild their rows from it.
//!
//! # Architecture
//!
//! ```text
//!   DocumentModel callbacks
//!       │  on_object_added / on_claims_changed / ...
//!       ▼
//!   Forest::post() ──► dirty queue (coalesced per object)
//!                           │
//!                           ▼
//!   Forest::flush() ──► populate / reconcile ──► FlushReport
//!                           │
//!                           ▼
//!   selection re-derived ──► view reads node state
//!
//!   drag gesture ──► Forest::plan_drop() ──► DropPlan
//!                                              │
//!                         execute_plan() ◄─────┘
//!                              │
//!                              ▼
//!                        GraphMutator ──► new document events
//! ```
//!
//! **[`forest`]** — The [`Forest`](forest::Forest) registry: node arena,
//! one [`Container`](container::Container) per document, pending events,
//! and node accessors.
//!
//! **[`record`]** — [`ObjectRecord`](record::ObjectRecord), the state shared
//! by every node of one object.
//!
//! **[`model`]** — The [`DocumentModel`](model::DocumentModel) and
//! [`GraphMutator`](model::GraphMutator) collaborator traits.
//!
//! **[`dirty`]** — Dirty channels via `understory_dirty`. Claim edges are
//! mirrored as dependencies so draining yields claimants first.
//!
//! **[`path`]** — Dotted sub-path addressing between nodes.
//!
//! **[`select`]** — Selection entries to node marks and back.
//!
//! **[`drop`]** — Side-effect-free drag-and-drop planning.
//!
//! **[`snapshot`]** — Name-keyed expansion snapshots.
//!
//! **[`trace`]** — [`ProjectionSink`](trace::ProjectionSink) trait and event
//! types, with zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! **[`config`]** — [`ProjectorConfig`](config::ProjectorConfig) presets.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `serde` (disabled by default): Derives `Serialize`/`Deserialize` for
//!   identifiers, selection entries, sub names, and expansion snapshots.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

mod claims;
mod project;

pub mod config;
pub mod container;
pub mod dirty;
pub mod drop;
pub mod error;
pub mod forest;
pub mod id;
pub mod model;
pub mod node;
pub mod path;
pub mod record;
pub mod select;
pub mod snapshot;
pub mod trace;
pub mod traverse;
