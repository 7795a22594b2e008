//! The X12 loop tree
//!
//! Loops are schema-declared, possibly repeating groupings of segments and
//! nested loops. One parsed envelope is one [`Loop`] tree. Nodes live in an
//! index-based arena: children are owned through index lists and the parent
//! back-reference is a plain `Option<NodeId>`, so upward traversal is cheap
//! and there are no ownership cycles.
//!
//! A [`NodeId`] is only meaningful for the tree that issued it.

use crate::segment::Segment;
use crate::separators::Separators;
use serde::{Deserialize, Serialize};

/// Handle to one loop node within a [`Loop`] tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LoopNode {
    id: String,
    segments: Vec<Segment>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// One loop tree: a root loop and the subtree it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loop {
    separators: Separators,
    nodes: Vec<LoopNode>,
}

impl Loop {
    /// Create a tree whose root loop has the given id and default separators.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_separators(Separators::default(), id)
    }

    /// Create a tree whose root loop has the given id.
    pub fn with_separators(separators: Separators, id: impl Into<String>) -> Self {
        Self {
            separators,
            nodes: vec![LoopNode {
                id: id.into(),
                segments: Vec::new(),
                children: Vec::new(),
                parent: None,
            }],
        }
    }

    /// The root loop of this tree.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn separators(&self) -> &Separators {
        &self.separators
    }

    pub fn set_separators(&mut self, separators: Separators) {
        self.separators = separators;
    }

    /// The id of a loop node.
    pub fn id(&self, node: NodeId) -> &str {
        &self.nodes[node.0].id
    }

    pub fn set_id(&mut self, node: NodeId, id: impl Into<String>) {
        self.nodes[node.0].id = id.into();
    }

    /// The segments directly owned by a loop node, in attachment order.
    pub fn segments(&self, node: NodeId) -> &[Segment] {
        &self.nodes[node.0].segments
    }

    /// The direct child loops of a node, in attachment order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// The parent of a node; `None` for the root.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    /// Append a new child loop and return its handle.
    pub fn add_loop(&mut self, parent: NodeId, id: impl Into<String>) -> NodeId {
        let index = self.nodes[parent.0].children.len();
        self.insert_loop(parent, index, id)
    }

    /// Insert a new child loop at `index` among `parent`'s children.
    pub fn insert_loop(&mut self, parent: NodeId, index: usize, id: impl Into<String>) -> NodeId {
        let child = NodeId(self.nodes.len());
        self.nodes.push(LoopNode {
            id: id.into(),
            segments: Vec::new(),
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent.0].children.insert(index, child);
        child
    }

    /// Append a segment to a loop node.
    pub fn add_segment(&mut self, node: NodeId, segment: Segment) {
        self.nodes[node.0].segments.push(segment);
    }

    /// Insert a segment at `index` among the node's segments.
    pub fn insert_segment(&mut self, node: NodeId, index: usize, segment: Segment) {
        self.nodes[node.0].segments.insert(index, segment);
    }

    /// Replace the segment at `index`; returns `false` when out of range.
    pub fn set_segment(&mut self, node: NodeId, index: usize, segment: Segment) -> bool {
        match self.nodes[node.0].segments.get_mut(index) {
            Some(slot) => {
                *slot = segment;
                true
            }
            None => false,
        }
    }

    /// Remove and return the segment at `index`.
    pub fn remove_segment(&mut self, node: NodeId, index: usize) -> Option<Segment> {
        let segments = &mut self.nodes[node.0].segments;
        if index < segments.len() {
            Some(segments.remove(index))
        } else {
            None
        }
    }

    /// Mutable access to the segment at `index` of a node.
    pub fn segment_mut(&mut self, node: NodeId, index: usize) -> Option<&mut Segment> {
        self.nodes[node.0].segments.get_mut(index)
    }

    /// Walk strictly upward from `node` to the nearest ancestor with `id`.
    pub fn ancestor_by_id(&self, node: NodeId, id: &str) -> Option<NodeId> {
        let mut current = self.parent(node);
        while let Some(ancestor) = current {
            if self.id(ancestor) == id {
                return Some(ancestor);
            }
            current = self.parent(ancestor);
        }
        None
    }

    /// All descendant loops of `node` with the given id, in document order.
    pub fn find_loops(&self, node: NodeId, id: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_loops(node, id, &mut found);
        found
    }

    fn collect_loops(&self, node: NodeId, id: &str, found: &mut Vec<NodeId>) {
        for &child in self.children(node) {
            if self.id(child) == id {
                found.push(child);
            }
            self.collect_loops(child, id, found);
        }
    }

    /// Like [`Loop::find_loops`] but including `node` itself when it matches.
    pub fn find_all_loops(&self, node: NodeId, id: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        if self.id(node) == id {
            found.push(node);
        }
        self.collect_loops(node, id, &mut found);
        found
    }

    /// The `index`-th descendant loop of `node` with the given id.
    pub fn get_loop(&self, node: NodeId, id: &str, index: usize) -> Option<NodeId> {
        self.find_loops(node, id).into_iter().nth(index)
    }

    /// The `index`-th *direct* child of `node` with the given id.
    pub fn child_loop(&self, node: NodeId, id: &str, index: usize) -> Option<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|&c| self.id(c) == id)
            .nth(index)
    }

    /// Whether `id` names `node` or any loop in its subtree.
    pub fn has_loop(&self, node: NodeId, id: &str) -> bool {
        self.id(node) == id || !self.find_loops(node, id).is_empty()
    }

    /// All segments of `node` with the given id, in attachment order.
    pub fn find_segments(&self, node: NodeId, id: &str) -> Vec<&Segment> {
        self.segments(node)
            .iter()
            .filter(|s| s.id() == id)
            .collect()
    }

    /// The `index`-th segment of `node` with the given id.
    pub fn get_segment(&self, node: NodeId, id: &str, index: usize) -> Option<&Segment> {
        self.segments(node)
            .iter()
            .filter(|s| s.id() == id)
            .nth(index)
    }

    /// Number of segments in the subtree rooted at `node`.
    pub fn size(&self, node: NodeId) -> usize {
        self.segments(node).len()
            + self
                .children(node)
                .iter()
                .map(|&c| self.size(c))
                .sum::<usize>()
    }

    /// Element lookup by loop id, segment id and element reference
    /// designator, searching descendants of the root for the first matching
    /// loop occurrence. Each step short-circuits to `None` when absent.
    pub fn element(&self, loop_id: &str, segment_id: &str, element_id: &str) -> Option<&str> {
        self.element_at(loop_id, 0, segment_id, 0, element_id)
    }

    /// Element lookup with explicit loop and segment occurrence indices.
    pub fn element_at(
        &self,
        loop_id: &str,
        loop_index: usize,
        segment_id: &str,
        segment_index: usize,
        element_id: &str,
    ) -> Option<&str> {
        let node = self.get_loop(self.root(), loop_id, loop_index)?;
        let segment = self.get_segment(node, segment_id, segment_index)?;
        segment.element_value(element_id)
    }

    fn write_unordered(&self, node: NodeId, out: &mut String) {
        let terminator = self
            .separators
            .segment()
            .map_or(String::new(), |c| c.to_string());
        for segment in self.segments(node) {
            out.push_str(&segment.to_x12(&self.separators));
            out.push_str(&terminator);
        }
        for &child in self.children(node) {
            self.write_unordered(child, out);
        }
    }
}

/// Renders segments in attachment order, children after their parent's own
/// segments. Schema-ordered output is the writer's job.
impl std::fmt::Display for Loop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        self.write_unordered(self.root(), &mut out);
        f.write_str(&out)
    }
}
