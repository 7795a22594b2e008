//! The X12 writer
//!
//! Rendering merges each schema loop's declared segments and child loops
//! into one position-ordered sequence, then pulls matching occurrences from
//! the data tree: segments by id and occurrence index among the node's own
//! segments, loops by id and occurrence index among the node's *direct*
//! children. The direct-child restriction keeps an id that also exists
//! deeper in the tree from being pulled up to the wrong level. Data the
//! schema does not declare is not emitted.

use std::sync::Arc;
use tracing::debug;
use x12_model::{LineBreak, Loop, NodeId, Separators};
use x12_reader::X12Reader;
use x12_schema::definition::{LoopDefinition, TransactionDefinition};
use x12_schema::positioned::{ChildDefinition, ordered_children};

/// Serializes loop trees back to delimited X12 text.
pub struct X12Writer {
    definition: Arc<TransactionDefinition>,
    loops: Vec<Loop>,
    separators: Separators,
}

impl X12Writer {
    /// Create a writer over a sequence of loop trees (one per interchange
    /// envelope).
    pub fn new(
        definition: Arc<TransactionDefinition>,
        loops: Vec<Loop>,
        separators: Separators,
    ) -> Self {
        Self {
            definition,
            loops,
            separators,
        }
    }

    /// Create a writer for everything a reader parsed, with the delimiters
    /// detected from the input.
    pub fn from_reader(reader: &X12Reader) -> Self {
        Self {
            definition: reader.definition_handle(),
            loops: reader.loops().to_vec(),
            separators: reader.separators().cloned().unwrap_or_default(),
        }
    }

    /// Render all loop trees as X12 text, each segment terminated by the
    /// segment separator plus the given line break, envelopes separated by
    /// one more line break.
    pub fn to_x12_string(&self, line_break: LineBreak) -> String {
        let mut out = String::new();
        for tree in &self.loops {
            render_loop(
                tree,
                tree.root(),
                self.definition.root(),
                &self.separators,
                line_break.as_str(),
                &mut out,
            );
            out.push_str(line_break.as_str());
        }
        debug!(
            envelopes = self.loops.len(),
            bytes = out.len(),
            "rendered document"
        );
        out
    }
}

fn render_loop(
    tree: &Loop,
    node: NodeId,
    definition: &LoopDefinition,
    separators: &Separators,
    line_break: &str,
    out: &mut String,
) {
    for child in ordered_children(definition) {
        match child {
            ChildDefinition::Segment(segment_def) => {
                let mut index = 0;
                while let Some(segment) = tree.get_segment(node, segment_def.xid(), index) {
                    out.push_str(&segment.to_x12(separators));
                    if let Some(terminator) = separators.segment() {
                        out.push(terminator);
                    }
                    out.push_str(line_break);
                    index += 1;
                }
            }
            ChildDefinition::Loop(inner_def) => {
                let mut index = 0;
                while let Some(inner) = tree.child_loop(node, inner_def.xid(), index) {
                    render_loop(tree, inner, inner_def, separators, line_break, out);
                    index += 1;
                }
            }
        }
    }
}
