// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reusable test support for arbor projections.
//!
//! - [`document::MemoryDocument`]: an in-memory model implementing both
//!   [`DocumentModel`](arbor_core::model::DocumentModel) and
//!   [`GraphMutator`](arbor_core::model::GraphMutator), queueing the
//!   notifications a real document would emit.
//! - [`invariants::check_invariants`]: structural checks for a forest after
//!   a flush.
//!
//! A typical test drives both sides by hand:
//!
//! ```rust,ignore
//! let mut doc = MemoryDocument::new();
//! let d = doc.add_document("Doc");
//! let body = doc.add_object(d, "Body");
//!
//! let mut forest = Forest::default();
//! forest.attach_document(d);
//! sync(&mut forest, &mut doc);
//! assert_invariants(&forest, &doc);
//! ```

#![no_std]

extern crate alloc;

pub mod document;
pub mod invariants;

use arbor_core::forest::{FlushReport, Forest};

pub use document::MemoryDocument;
pub use invariants::{Violation, assert_invariants, check_invariants, outline};

/// Posts every notification `doc` queued and flushes once.
pub fn sync(forest: &mut Forest, doc: &mut MemoryDocument) -> FlushReport {
    for event in doc.drain_events() {
        forest.post(event);
    }
    forest.flush(&*doc)
}
