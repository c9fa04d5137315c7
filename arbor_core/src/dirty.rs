// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Arbor coalesces document notifications with [`understory_dirty`]. Keys
//! are [`ObjectId`](crate::id::ObjectId)s, so any number of notifications
//! for one object between two flushes collapse into a single entry.
//!
//! # Ordering
//!
//! Every accepted claim `parent -> child` is mirrored as a dependency edge
//! from `child` to `parent` on [`CLAIMS`]. Draining that channel therefore
//! yields claimants before the objects they claim, which is the
//! ancestor-before-descendant order the flush needs. The edges are kept
//! acyclic by the claim index, which rejects cycle-closing claims before
//! they are mirrored.
//!
//! # Channels
//!
//! - [`CLAIMS`] — the object was added or its claim list changed; its
//!   nodes must be re-synchronized.
//! - [`LABEL`] — display labels changed; only the record cache is
//!   refreshed. Local-only, never propagates.

use understory_dirty::Channel;

/// Object added or claimed children changed — requires re-population of
/// its nodes.
pub const CLAIMS: Channel = Channel::new(0);

/// Display labels changed — requires a record label refresh.
pub const LABEL: Channel = Channel::new(1);
