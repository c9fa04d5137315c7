// Copyright 2026 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sub-path addressing.
//!
//! A node is addressed by a *top* object plus a dotted path relative to it:
//!
//! ```text
//! Body.Pad.Face3
//! ^^^^^^^^^       object segments, each terminated by '.'
//!          ^^^^^  optional element name (no trailing '.')
//! ```
//!
//! The top of a node is its nearest non-grouping ancestor, or the top-level
//! node when every ancestor is a grouping. Segments name objects by their
//! internal name; a segment naming an object of another document than its
//! parent is qualified as `Document#Name`.

use alloc::string::String;
use alloc::vec::Vec;

use crate::forest::Forest;
use crate::id::{INVALID, NodeId, ObjectId};
use crate::model::DocumentModel;

/// Separator between path segments.
pub const SEGMENT_SEPARATOR: char = '.';

/// Separator between a document qualifier and an object name.
pub const DOCUMENT_SEPARATOR: char = '#';

/// A node address: top object plus dotted path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubName {
    /// The nearest non-grouping ancestor, or the top-level object.
    pub top: ObjectId,
    /// Object segments from below `top` down to the node, each ending in
    /// `'.'`. Empty for the top itself.
    pub path: String,
}

/// One node's address relative to the deepest object it shares with another.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelativeParent {
    /// The deepest common object.
    pub parent: ObjectId,
    /// Path from `parent` down to the node.
    pub path: String,
}

/// One object segment of a [`SubPath`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathSegment<'a> {
    /// Document qualifier, for cross-document segments.
    pub document: Option<&'a str>,
    /// Object name.
    pub name: &'a str,
    start: usize,
}

impl PathSegment<'_> {
    /// Returns whether this segment names `object`, given its parent's
    /// object.
    pub(crate) fn matches(
        &self,
        model: &dyn DocumentModel,
        object: ObjectId,
        parent: ObjectId,
    ) -> bool {
        if model.name(object) != self.name {
            return false;
        }
        let document = model.document_of(object);
        match self.document {
            Some(qualifier) => model.document_name(document) == qualifier,
            None => document == model.document_of(parent),
        }
    }
}

/// A parsed sub path, borrowing from its source string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubPath<'a> {
    source: &'a str,
    segments: Vec<PathSegment<'a>>,
    element: Option<&'a str>,
}

impl<'a> SubPath<'a> {
    /// Parses a dotted path. Empty segments are skipped.
    #[must_use]
    pub fn parse(source: &'a str) -> Self {
        let mut segments = Vec::new();
        let mut element = None;
        let mut start = 0;
        let mut rest = source;
        loop {
            match rest.find(SEGMENT_SEPARATOR) {
                Some(end) => {
                    let raw = &rest[..end];
                    if !raw.is_empty() {
                        let (document, name) = match raw.split_once(DOCUMENT_SEPARATOR) {
                            Some((doc, name)) => (Some(doc), name),
                            None => (None, raw),
                        };
                        segments.push(PathSegment {
                            document,
                            name,
                            start,
                        });
                    }
                    start += end + 1;
                    rest = &rest[end + 1..];
                }
                None => {
                    if !rest.is_empty() {
                        element = Some(rest);
                    }
                    break;
                }
            }
        }
        Self {
            source,
            segments,
            element,
        }
    }

    /// Returns the object segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment<'a>] {
        &self.segments
    }

    /// Returns the trailing element name, if any.
    #[must_use]
    pub fn element(&self) -> Option<&'a str> {
        self.element
    }

    /// Returns whether the path addresses its top object itself.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.element.is_none()
    }

    /// Returns the source text from segment `index` onward, verbatim.
    #[must_use]
    pub fn remainder_from(&self, index: usize) -> &'a str {
        match self.segments.get(index) {
            Some(segment) => &self.source[segment.start..],
            None => self.element.unwrap_or(""),
        }
    }
}

/// Formats the segment naming `object` below a node of `parent`.
pub(crate) fn segment_text(
    model: &dyn DocumentModel,
    object: ObjectId,
    parent: ObjectId,
) -> String {
    let mut text = String::new();
    let document = model.document_of(object);
    if document != model.document_of(parent) {
        text.push_str(&model.document_name(document));
        text.push(DOCUMENT_SEPARATOR);
    }
    text.push_str(&model.name(object));
    text.push(SEGMENT_SEPARATOR);
    text
}

impl Forest {
    /// Returns the address of `node`: its top object and the dotted path
    /// from there.
    ///
    /// # Panics
    ///
    /// Panics if `node` is stale.
    #[must_use]
    pub fn sub_name_from_root(&self, model: &dyn DocumentModel, node: NodeId) -> SubName {
        self.nodes.validate(node);
        let (top, chain) = self.sub_chain(model, node.idx);
        SubName {
            top: self.nodes.object[top as usize],
            path: chain.into_iter().map(|(_, s)| s).collect(),
        }
    }

    /// Computes where `a` sits relative to the deepest object it shares
    /// with `b`, by longest common path prefix below a common top.
    ///
    /// Returns `None` when the two nodes have different tops.
    ///
    /// # Panics
    ///
    /// Panics if either node is stale.
    #[must_use]
    pub fn relative_parent(
        &self,
        model: &dyn DocumentModel,
        a: NodeId,
        b: NodeId,
    ) -> Option<RelativeParent> {
        self.nodes.validate(a);
        self.nodes.validate(b);
        let (top_a, chain_a) = self.sub_chain(model, a.idx);
        let (top_b, chain_b) = self.sub_chain(model, b.idx);
        let top = self.nodes.object[top_a as usize];
        if top != self.nodes.object[top_b as usize] {
            return None;
        }
        let common = chain_a
            .iter()
            .zip(&chain_b)
            .take_while(|(x, y)| x.1 == y.1)
            .count();
        let parent = match common {
            0 => top,
            n => self.nodes.object[chain_a[n - 1].0 as usize],
        };
        Some(RelativeParent {
            parent,
            path: chain_a[common..].iter().map(|(_, s)| s.as_str()).collect(),
        })
    }

    /// Returns an address of `idx` that resolves to `idx` alone.
    ///
    /// Starts like [`sub_name_from_root`](Self::sub_name_from_root) but keeps
    /// climbing while the top object is shown in more than one place, since
    /// a path is resolved from every attached node of its top.
    pub(crate) fn unique_sub_name(&self, model: &dyn DocumentModel, idx: u32) -> SubName {
        let (mut top, mut chain) = self.sub_chain(model, idx);
        while self.nodes.parent[top as usize] != INVALID
            && self.is_shared(self.nodes.object[top as usize])
        {
            let (outer_top, mut outer) = self.sub_chain(model, top);
            outer.append(&mut chain);
            chain = outer;
            top = outer_top;
        }
        SubName {
            top: self.nodes.object[top as usize],
            path: chain.into_iter().map(|(_, s)| s).collect(),
        }
    }

    /// Returns whether `object` has, or may gain, more than one node.
    fn is_shared(&self, object: ObjectId) -> bool {
        self.claims.claimants(object).len() > 1
            || self
                .record(object)
                .is_some_and(|r| r.instances.len() > 1 || r.root_instance.is_some())
    }

    /// Returns the top node of `idx` and the segments from below it down
    /// to `idx`, outermost first.
    pub(crate) fn sub_chain(
        &self,
        model: &dyn DocumentModel,
        idx: u32,
    ) -> (u32, Vec<(u32, String)>) {
        let mut chain = Vec::new();
        let mut cur = idx;
        loop {
            let parent = self.nodes.parent[cur as usize];
            if parent == INVALID {
                break;
            }
            chain.push((
                cur,
                segment_text(
                    model,
                    self.nodes.object[cur as usize],
                    self.nodes.object[parent as usize],
                ),
            ));
            cur = parent;
            if !model.is_grouping(self.nodes.object[cur as usize]) {
                break;
            }
        }
        chain.reverse();
        (cur, chain)
    }
}
