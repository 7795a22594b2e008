//! The X12 reader
//!
//! One [`X12Reader::parse`] call consumes one input stream and yields the
//! loop trees it contained (one per `ISA…IEA` envelope) plus the accumulated
//! validation findings.
//!
//! The matcher is a line-at-a-time state machine. Its state between lines:
//! the loop configuration currently accumulating, the raw lines buffered for
//! it, and the most recently materialized loop node, which anchors parent
//! resolution for the next loop. Materializing a buffer validates its lines,
//! turns them into segments and attaches a new loop node at the schema's
//! declared position in the tree, synthesizing wrapper nodes for segmentless
//! parent loops that never appear in the text themselves.

use crate::Result;
use crate::scanner::SegmentScanner;
use std::collections::HashSet;
use std::io::{self, BufRead};
use std::sync::Arc;
use tracing::debug;
use x12_model::{Loop, NodeId, Segment, Separators};
use x12_schema::cache::DefinitionCache;
use x12_schema::config::{ConfigTable, LoopConfig};
use x12_schema::definition::TransactionDefinition;
use x12_validation::rules::codes_match_for_loop_id;
use x12_validation::state::{ChildLoopTracker, LoopCounters};
use x12_validation::validator::StructureValidator;

/// Fixed length of the ISA control header, terminator included.
const ISA_LENGTH: usize = 106;
/// Byte offset of the element separator within the header.
const ELEMENT_SEPARATOR_POS: usize = 3;
/// Byte offset of the composite separator within the header.
const COMPOSITE_SEPARATOR_POS: usize = 104;
/// Byte offset of the segment separator within the header.
const SEGMENT_SEPARATOR_POS: usize = 105;

/// A parsed X12 stream: the resulting loop trees and everything the
/// validator had to say about them.
pub struct X12Reader {
    definition: Arc<TransactionDefinition>,
    separators: Option<Separators>,
    loops: Vec<Loop>,
    errors: Vec<String>,
    fatal_errors: Vec<String>,
}

impl X12Reader {
    /// Parse a stream against a transaction definition, flattening the
    /// definition's loop configuration for this parse only.
    ///
    /// # Errors
    ///
    /// Returns an error only when reading the input fails; malformed
    /// documents are reported through [`X12Reader::errors`] and
    /// [`X12Reader::fatal_errors`].
    pub fn parse(definition: Arc<TransactionDefinition>, input: impl BufRead) -> Result<Self> {
        let table = Arc::new(ConfigTable::build(&definition));
        Self::parse_inner(definition, input, &table)
    }

    /// Parse a stream, sharing the flattened loop configuration through a
    /// [`DefinitionCache`].
    ///
    /// # Errors
    ///
    /// Returns an error only when reading the input fails.
    pub fn parse_with_cache(
        definition: Arc<TransactionDefinition>,
        input: impl BufRead,
        cache: &DefinitionCache,
    ) -> Result<Self> {
        let table = cache.config_for(&definition);
        Self::parse_inner(definition, input, &table)
    }

    fn parse_inner(
        definition: Arc<TransactionDefinition>,
        mut input: impl BufRead,
        table: &ConfigTable,
    ) -> Result<Self> {
        let mut errors = Vec::new();
        let mut fatal_errors = Vec::new();

        let Some(header) = read_header(&mut input)? else {
            errors.push("Error getting separators".to_string());
            fatal_errors.push("Unable to process transaction!".to_string());
            return Ok(Self {
                definition,
                separators: None,
                loops: Vec::new(),
                errors,
                fatal_errors,
            });
        };
        let Some(separators) = separators_from_header(&header) else {
            errors.push("Error getting separators".to_string());
            fatal_errors.push("Unable to process transaction!".to_string());
            return Ok(Self {
                definition,
                separators: None,
                loops: Vec::new(),
                errors,
                fatal_errors,
            });
        };

        let mut scanner = SegmentScanner::new(input, header[SEGMENT_SEPARATOR_POS]);
        let isa_line = String::from_utf8_lossy(&header[..SEGMENT_SEPARATOR_POS])
            .trim()
            .to_string();

        // the declared version is the last element of the line following the
        // control header (the functional-group header)
        let version_line = scanner.read_raw()?;
        let version = version_line.as_ref().and_then(|(line, terminated)| {
            if !terminated {
                return None;
            }
            let element = char::from(header[ELEMENT_SEPARATOR_POS]);
            line.rfind(element).map(|i| &line[i + element.len_utf8()..])
        });
        if version != Some(definition.version()) {
            errors.push(format!(
                "ANSI version {} not consistent with version specified {}",
                version.unwrap_or(""),
                definition.version()
            ));
            fatal_errors.push("Unable to process transaction!".to_string());
            return Ok(Self {
                definition,
                separators: Some(separators),
                loops: Vec::new(),
                errors,
                fatal_errors,
            });
        }

        scanner.replay(isa_line);
        if let Some((line, _)) = version_line {
            scanner.replay(line);
        }

        let mut parser = Parser {
            definition: &definition,
            config: table,
            validator: StructureValidator::new(&definition, table),
            separators: separators.clone(),
            counters: LoopCounters::new(),
            tracker: ChildLoopTracker::new(),
            loops: Vec::new(),
            errors,
            fatal_errors,
        };
        parser.run(&mut scanner)?;

        debug!(
            envelopes = parser.loops.len(),
            errors = parser.errors.len(),
            fatal = parser.fatal_errors.len(),
            "finished parsing"
        );

        let Parser {
            loops,
            errors,
            fatal_errors,
            ..
        } = parser;

        Ok(Self {
            definition,
            separators: Some(separators),
            loops,
            errors,
            fatal_errors,
        })
    }

    /// The transaction definition this document was parsed against.
    pub fn definition(&self) -> &TransactionDefinition {
        &self.definition
    }

    /// A shared handle to the definition, for handing to a writer without
    /// rebuilding the schema.
    pub fn definition_handle(&self) -> Arc<TransactionDefinition> {
        Arc::clone(&self.definition)
    }

    /// The detected delimiters, if the header could be read.
    pub fn separators(&self) -> Option<&Separators> {
        self.separators.as_ref()
    }

    /// The parsed loop trees, one per envelope found in the stream.
    pub fn loops(&self) -> &[Loop] {
        &self.loops
    }

    /// Consume the reader, keeping only the loop trees.
    pub fn into_loops(self) -> Vec<Loop> {
        self.loops
    }

    /// Recoverable validation findings, in discovery order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Findings that stopped the parse; the trees are best-effort when this
    /// is non-empty.
    pub fn fatal_errors(&self) -> &[String] {
        &self.fatal_errors
    }
}

fn read_header(input: &mut impl io::Read) -> io::Result<Option<[u8; ISA_LENGTH]>> {
    let mut header = [0u8; ISA_LENGTH];
    let mut filled = 0;
    while filled < ISA_LENGTH {
        match input.read(&mut header[filled..]) {
            Ok(0) => return Ok(None),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(Some(header))
}

/// Read the three delimiters from their fixed header offsets. Delimiters
/// must be punctuation: alphanumeric, whitespace and non-ASCII bytes at any
/// of the offsets fail detection.
fn separators_from_header(header: &[u8; ISA_LENGTH]) -> Option<Separators> {
    let bytes = [
        header[SEGMENT_SEPARATOR_POS],
        header[ELEMENT_SEPARATOR_POS],
        header[COMPOSITE_SEPARATOR_POS],
    ];
    if bytes
        .iter()
        .any(|b| b.is_ascii_alphanumeric() || b.is_ascii_whitespace() || !b.is_ascii())
    {
        return None;
    }
    Some(Separators::new(
        char::from(bytes[0]),
        char::from(bytes[1]),
        char::from(bytes[2]),
    ))
}

struct Parser<'a> {
    definition: &'a TransactionDefinition,
    config: &'a ConfigTable,
    validator: StructureValidator<'a>,
    separators: Separators,
    counters: LoopCounters,
    tracker: ChildLoopTracker,
    loops: Vec<Loop>,
    errors: Vec<String>,
    fatal_errors: Vec<String>,
}

impl<'a> Parser<'a> {
    fn run<R: BufRead>(&mut self, scanner: &mut SegmentScanner<R>) -> Result<()> {
        let mut buffer: Vec<String> = Vec::new();
        let mut current: Option<&'a LoopConfig> = None;
        let mut last_stored: Option<NodeId> = None;

        let Some(mut line) = scanner.next_line()? else {
            return Ok(());
        };

        // every line except the last goes through the matcher; the last line
        // must close the envelope and is handled below
        loop {
            let Some(next) = scanner.next_line()? else {
                break;
            };
            self.process_line(&line, &mut buffer, &mut current, &mut last_stored);
            if !self.fatal_errors.is_empty() {
                return Ok(());
            }
            line = next;
        }

        if !line.is_empty() && self.fatal_errors.is_empty() {
            match current {
                Some(current_config) => {
                    let matched = match self.separators.split_element(&line) {
                        Some(tokens) => {
                            self.matched_loop(&tokens, Some(current_config.loop_id()))
                        }
                        None => None,
                    };
                    let closed = match matched {
                        Some(closing) => self.append_ending_segment(
                            last_stored,
                            Some(current_config),
                            closing,
                            &line,
                            &buffer,
                        ),
                        None => {
                            // flush what we have; the stream ended without a
                            // recognizable closer
                            if !buffer.is_empty() {
                                self.store_data(current_config, &buffer, last_stored);
                            }
                            None
                        }
                    };
                    let reached_root = closed.is_some_and(|node| {
                        self.loops
                            .last()
                            .is_some_and(|tree| tree.id(node) == self.definition.root().xid())
                    });
                    if !reached_root {
                        self.fatal_errors
                            .push("Unable to find end of transaction".to_string());
                    }
                }
                None => {
                    self.fatal_errors
                        .push("Last line of data and we don't know the current loop.".to_string());
                }
            }
        }

        if self.fatal_errors.is_empty() {
            self.validator
                .validate_document(&self.counters, &self.tracker, &mut self.errors);
        }
        Ok(())
    }

    fn process_line(
        &mut self,
        line: &str,
        buffer: &mut Vec<String>,
        current: &mut Option<&'a LoopConfig>,
        last_stored: &mut Option<NodeId>,
    ) {
        let Some(tokens) = self.separators.split_element(line) else {
            self.errors
                .push("Unable to split elements for loop matching!".to_string());
            buffer.push(line.to_string());
            return;
        };

        let Some(config) = self.matched_loop(&tokens, current.map(LoopConfig::loop_id)) else {
            buffer.push(line.to_string());
            return;
        };

        let first_token = tokens.first().copied().unwrap_or("");
        let closes_other_loop = config
            .last_segment()
            .is_some_and(|last| last.xid() == first_token)
            && current.is_none_or(|c| c.loop_id() != config.loop_id());

        if closes_other_loop {
            if let Some(node) = self.append_ending_segment(*last_stored, *current, config, line, buffer)
            {
                *last_stored = Some(node);
                buffer.clear();
                *current = Some(config);
            }
        } else if config.loop_id() == self.definition.root().xid() {
            // a new interchange begins; settle the previous one first
            if last_stored.is_some() && !buffer.is_empty() {
                if let Some(previous) = *current {
                    if self.store_data(previous, buffer, *last_stored).is_none() {
                        return;
                    }
                }
                buffer.clear();
            }
            debug!(envelope = self.loops.len() + 1, "starting new interchange");
            *current = Some(config);
            *last_stored = None;
            self.loops
                .push(Loop::with_separators(self.separators.clone(), ""));
            buffer.push(line.to_string());
        } else {
            let Some(previous) = *current else {
                self.fatal_errors
                    .push("Current loop is unknown. Bad structure detected".to_string());
                return;
            };
            self.counters.increment(config.loop_id());
            if !buffer.is_empty() {
                match self.store_data(previous, buffer, *last_stored) {
                    Some(node) => *last_stored = Some(node),
                    None => return,
                }
            }
            buffer.clear();
            buffer.push(line.to_string());
            *current = Some(config);
        }
    }

    /// Decide whether a line opens or closes a schema loop, and which one.
    fn matched_loop(&self, tokens: &[&str], previous: Option<&str>) -> Option<&'a LoopConfig> {
        let first_token = tokens.first().copied()?;
        let mut candidates: Vec<&'a LoopConfig> = Vec::new();

        for config in self.config.iter() {
            let opens = config
                .first_segment()
                .is_some_and(|seg| seg.xid() == first_token && codes_match_for_loop_id(tokens, seg));
            let closes = config.last_segment().is_some_and(|seg| {
                seg.xid() == first_token
                    && previous != Some(config.loop_id())
                    && codes_match_for_loop_id(tokens, seg)
            });
            if opens || closes {
                // a repeating body segment of the open loop never starts a
                // new one
                if self.is_child_segment(previous, first_token) {
                    return None;
                }
                if !candidates.iter().any(|c| c.loop_id() == config.loop_id()) {
                    candidates.push(config);
                }
            }
        }

        match candidates.len() {
            0 => None,
            1 => Some(candidates[0]),
            _ => {
                // several loops begin with this segment id; drop the ones it
                // would be closing, they are not being opened here
                let open_candidates: Vec<&'a LoopConfig> = candidates
                    .into_iter()
                    .filter(|config| {
                        !config.last_segment().is_some_and(|seg| {
                            seg.xid() == first_token && codes_match_for_loop_id(tokens, seg)
                        })
                    })
                    .collect();
                match open_candidates.len() {
                    0 => None,
                    1 => Some(open_candidates[0]),
                    _ => self.finalized_match(previous, &open_candidates),
                }
            }
        }
    }

    /// Whether the current loop declares this segment id as a non-initial
    /// member of its own body.
    fn is_child_segment(&self, previous: Option<&str>, first_token: &str) -> bool {
        let Some(previous) = previous else {
            return false;
        };
        let Some(segments) = self.definition.root().segments_of(previous) else {
            return false;
        };
        segments.iter().skip(1).any(|seg| seg.xid() == first_token)
    }

    /// Break a tie between several open candidates: prefer a declared child
    /// of the loop being left, then a sibling under the same first schema
    /// parent, then the first candidate found.
    fn finalized_match(
        &self,
        previous: Option<&str>,
        candidates: &[&'a LoopConfig],
    ) -> Option<&'a LoopConfig> {
        let fallback = candidates.first().copied();
        let Some(previous_id) = previous else {
            return fallback;
        };
        let Some(previous_config) = self.config.get(previous_id) else {
            return fallback;
        };

        if let Some(child) = candidates.iter().copied().find(|candidate| {
            previous_config
                .child_loops()
                .iter()
                .any(|id| id == candidate.loop_id())
        }) {
            return Some(child);
        }

        if let Some(parent) = self.definition.root().first_parent_of(previous_id) {
            if let Some(sibling) = candidates.iter().copied().find(|candidate| {
                self.definition.root().first_parent_of(candidate.loop_id()) == Some(parent.clone())
            }) {
                return Some(sibling);
            }
        }

        fallback
    }

    /// Close out a two-part loop: materialize whatever was buffered, then
    /// attach the closing line as a segment of the still-open ancestor that
    /// the closing segment belongs to.
    fn append_ending_segment(
        &mut self,
        last_stored: Option<NodeId>,
        previous: Option<&LoopConfig>,
        closing: &LoopConfig,
        line: &str,
        buffer: &[String],
    ) -> Option<NodeId> {
        let mut anchor = last_stored;
        if !buffer.is_empty() {
            if let Some(previous) = previous {
                anchor = self.store_data(previous, buffer, last_stored);
                if anchor.is_none() {
                    return None;
                }
            }
        }

        let Some(anchor) = anchor else {
            self.fatal_errors.push(
                "We found an ending segment but we never stored the first part of the loop!"
                    .to_string(),
            );
            return None;
        };

        let segment = Segment::from_line(line, &self.separators).ok();
        let Some(tree) = self.loops.last_mut() else {
            self.fatal_errors
                .push("Something is wrong. Check loop structure.".to_string());
            return None;
        };
        match tree.ancestor_by_id(anchor, closing.loop_id()) {
            Some(target) => {
                if let Some(segment) = segment {
                    tree.add_segment(target, segment);
                }
                Some(target)
            }
            None => {
                self.fatal_errors.push(
                    "We found an ending segment but we never stored the first part of the loop!"
                        .to_string(),
                );
                None
            }
        }
    }

    /// Materialize the buffered lines of one loop occurrence into the tree.
    fn store_data(
        &mut self,
        config: &LoopConfig,
        lines: &[String],
        last_stored: Option<NodeId>,
    ) -> Option<NodeId> {
        self.validator
            .validate_loop_lines(config.loop_id(), lines, &self.separators, &mut self.errors);

        let mut segments = Vec::with_capacity(lines.len());
        for line in lines {
            match Segment::from_line(line, &self.separators) {
                Ok(segment) => segments.push(segment),
                Err(_) => self
                    .errors
                    .push("Unable to split elements for loop storage!".to_string()),
            }
        }

        let Some(tree) = self.loops.last_mut() else {
            self.fatal_errors
                .push(format!("Failed to store loop data for {}", config.loop_id()));
            return None;
        };

        let Some(anchor) = last_stored else {
            // nothing stored yet: these lines are the envelope's own segments
            let root = tree.root();
            tree.set_id(root, config.loop_id());
            for segment in segments {
                tree.add_segment(root, segment);
            }
            self.tracker.open_occurrence(config.loop_id());
            return Some(root);
        };

        if let Some(parent) = find_parent_loop(tree, self.definition, config, anchor) {
            let node = tree.add_loop(parent, config.loop_id());
            for segment in segments {
                tree.add_segment(node, segment);
            }
            let parent_id = tree.id(parent).to_string();
            self.tracker.record_child(&parent_id, config.loop_id());
            self.tracker.open_occurrence(config.loop_id());
            return Some(node);
        }

        // the true parent may be a segmentless grouping loop that never
        // appears in the text; recognize that case and synthesize it
        let parent_id = config.parent_loop().unwrap_or_default();
        let Some(parent_config) = self.config.get(parent_id) else {
            self.fatal_errors.push(format!(
                "Parent loop {parent_id} does not exist in loop configuration!"
            ));
            return None;
        };
        if parent_config.has_data_segments() {
            self.fatal_errors.push(format!(
                "Parent loop {parent_id} is missing and should already exist"
            ));
            return None;
        }
        let grandparent = parent_config
            .parent_loop()
            .and_then(|id| tree.ancestor_by_id(anchor, id));
        let Some(grandparent) = grandparent else {
            self.fatal_errors
                .push(format!("Parent loop of {parent_id} is not found!"));
            return None;
        };

        let wrapper = tree.add_loop(grandparent, parent_config.loop_id());
        let inner = tree.insert_loop(wrapper, 0, config.loop_id());
        for segment in segments {
            tree.add_segment(inner, segment);
        }
        let grandparent_id = tree.id(grandparent).to_string();
        self.tracker
            .record_child(&grandparent_id, parent_config.loop_id());
        self.tracker.open_occurrence(parent_config.loop_id());
        self.tracker
            .record_child(parent_config.loop_id(), config.loop_id());
        self.tracker.open_occurrence(config.loop_id());
        Some(inner)
    }
}

/// Resolve where a new loop attaches: at the anchor itself when the anchor
/// is the declared parent, else at the nearest anchor ancestor matching one
/// of the loop's schema parents.
fn find_parent_loop(
    tree: &Loop,
    definition: &TransactionDefinition,
    config: &LoopConfig,
    anchor: NodeId,
) -> Option<NodeId> {
    let parent_ids: HashSet<String> = definition
        .root()
        .parent_ids_of(config.loop_id())
        .into_iter()
        .collect();

    if parent_ids.is_empty() {
        return Some(anchor);
    }
    if parent_ids.len() == 1 {
        let expected = config.parent_loop()?;
        return if tree.id(anchor) == expected {
            Some(anchor)
        } else {
            tree.ancestor_by_id(anchor, expected)
        };
    }

    // ambiguous parentage: climb from the anchor until a schema parent
    let mut node = Some(anchor);
    while let Some(candidate) = node {
        if parent_ids.contains(tree.id(candidate)) {
            return Some(candidate);
        }
        node = tree.parent(candidate);
    }
    None
}
