// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and JSON export for arbor diagnostics.
//!
//! This crate provides [`ProjectionSink`](arbor_core::trace::ProjectionSink)
//! implementations and dump helpers for development and post-mortem
//! analysis:
//!
//! - [`pretty::PrettyPrintSink`] — human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`] — compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`json::export`] — writes recorded events as a JSON array.
//! - [`dump`] — JSON views of a projected tree and of expansion snapshots.

pub mod dump;
pub mod json;
pub mod pretty;
pub mod recorder;
