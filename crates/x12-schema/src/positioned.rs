//! Canonical schema-child ordering
//!
//! Implementation guides interleave segments and nested loops within a loop
//! body; the canonical output order compares position strings first and loop
//! or segment ids second. That total order drives serialization.

use crate::definition::{LoopDefinition, SegmentDefinition};
use std::cmp::Ordering;

/// Anything placed within a loop body: has an id and a position string.
pub trait Positioned {
    fn xid(&self) -> &str;
    fn pos(&self) -> &str;

    /// Canonical ordering: by position string, then by id.
    fn position_cmp(&self, other: &dyn Positioned) -> Ordering {
        self.pos()
            .cmp(other.pos())
            .then_with(|| self.xid().cmp(other.xid()))
    }
}

impl Positioned for SegmentDefinition {
    fn xid(&self) -> &str {
        SegmentDefinition::xid(self)
    }

    fn pos(&self) -> &str {
        SegmentDefinition::pos(self)
    }
}

impl Positioned for LoopDefinition {
    fn xid(&self) -> &str {
        LoopDefinition::xid(self)
    }

    fn pos(&self) -> &str {
        LoopDefinition::pos(self)
    }
}

/// A schema child of a loop: segment or nested loop.
#[derive(Debug, Clone, Copy)]
pub enum ChildDefinition<'a> {
    Segment(&'a SegmentDefinition),
    Loop(&'a LoopDefinition),
}

impl ChildDefinition<'_> {
    pub fn xid(&self) -> &str {
        match self {
            ChildDefinition::Segment(segment) => segment.xid(),
            ChildDefinition::Loop(child) => child.xid(),
        }
    }

    pub fn pos(&self) -> &str {
        match self {
            ChildDefinition::Segment(segment) => segment.pos(),
            ChildDefinition::Loop(child) => child.pos(),
        }
    }
}

/// Merge a loop's declared segments and child loops into one sequence in
/// canonical order.
pub fn ordered_children(definition: &LoopDefinition) -> Vec<ChildDefinition<'_>> {
    let mut children: Vec<ChildDefinition<'_>> = definition
        .segments()
        .iter()
        .map(ChildDefinition::Segment)
        .chain(definition.loops().iter().map(ChildDefinition::Loop))
        .collect();
    children.sort_by(|a, b| a.pos().cmp(b.pos()).then_with(|| a.xid().cmp(b.xid())));
    children
}
