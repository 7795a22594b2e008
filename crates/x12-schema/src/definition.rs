//! X12 transaction definitions
//!
//! The definition graph mirrors the implementation-guide structure of an X12
//! transaction: a transaction owns one root loop; loops own segments and
//! nested loops; segments own element and composite definitions. Definitions
//! are built with the fluent `with_*` constructors and are read-only
//! afterwards.

use std::collections::HashSet;

/// Schema-declared necessity of a loop, segment or element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    Required,
    Situational,
    NotUsed,
}

impl Usage {
    /// The single-letter code used by X12 implementation guides.
    pub fn code(&self) -> &'static str {
        match self {
            Usage::Required => "R",
            Usage::Situational => "S",
            Usage::NotUsed => "N",
        }
    }

    /// Parse an implementation-guide usage code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "R" => Some(Usage::Required),
            "S" => Some(Usage::Situational),
            "N" => Some(Usage::NotUsed),
            _ => None,
        }
    }
}

/// A complete transaction definition: one supported X12 transaction type.
#[derive(Debug, Clone)]
pub struct TransactionDefinition {
    xid: String,
    name: String,
    version: String,
    root: LoopDefinition,
}

impl TransactionDefinition {
    /// Create a transaction definition.
    ///
    /// `version` is the declared ANSI version/release code (e.g.
    /// `005010X222A1`) that input documents must carry.
    pub fn new(
        xid: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        root: LoopDefinition,
    ) -> Self {
        Self {
            xid: xid.into(),
            name: name.into(),
            version: version.into(),
            root,
        }
    }

    pub fn xid(&self) -> &str {
        &self.xid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared ANSI version/release code.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The root loop of the transaction (the interchange envelope).
    pub fn root(&self) -> &LoopDefinition {
        &self.root
    }
}

/// Definition of one loop: a named grouping of segments and nested loops.
#[derive(Debug, Clone)]
pub struct LoopDefinition {
    xid: String,
    name: String,
    usage: Usage,
    pos: String,
    repeat: String,
    segments: Vec<SegmentDefinition>,
    loops: Vec<LoopDefinition>,
}

impl LoopDefinition {
    pub fn new(
        xid: impl Into<String>,
        name: impl Into<String>,
        usage: Usage,
        pos: impl Into<String>,
        repeat: impl Into<String>,
    ) -> Self {
        Self {
            xid: xid.into(),
            name: name.into(),
            usage,
            pos: pos.into(),
            repeat: repeat.into(),
            segments: Vec::new(),
            loops: Vec::new(),
        }
    }

    /// Append a segment definition (declaration order is significant).
    pub fn with_segment(mut self, segment: SegmentDefinition) -> Self {
        self.segments.push(segment);
        self
    }

    /// Append a child loop definition.
    pub fn with_loop(mut self, child: LoopDefinition) -> Self {
        self.loops.push(child);
        self
    }

    pub fn xid(&self) -> &str {
        &self.xid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn pos(&self) -> &str {
        &self.pos
    }

    /// The repeat specification; `">1"` means unbounded.
    pub fn repeat(&self) -> &str {
        &self.repeat
    }

    pub fn segments(&self) -> &[SegmentDefinition] {
        &self.segments
    }

    pub fn loops(&self) -> &[LoopDefinition] {
        &self.loops
    }

    /// Whether this loop declares segments of its own. Loops without any
    /// exist purely as schema grouping nodes.
    pub fn has_segments(&self) -> bool {
        !self.segments.is_empty()
    }

    /// Find a loop definition by id, searching this loop and its subtree.
    pub fn find_loop(&self, id: &str) -> Option<&LoopDefinition> {
        if self.xid == id {
            return Some(self);
        }
        self.loops.iter().find_map(|child| child.find_loop(id))
    }

    /// All loop ids under which `id` is declared, in pre-order. A loop may
    /// legally nest under more than one structural position, in which case
    /// the result has several entries.
    pub fn parent_ids_of(&self, id: &str) -> Vec<String> {
        let mut parents = Vec::new();
        self.collect_parent_ids(id, &mut parents);
        parents
    }

    fn collect_parent_ids(&self, id: &str, parents: &mut Vec<String>) {
        for child in &self.loops {
            if child.xid == id {
                parents.push(self.xid.clone());
            }
            child.collect_parent_ids(id, parents);
        }
    }

    /// The first schema parent of `id`, if any.
    pub fn first_parent_of(&self, id: &str) -> Option<String> {
        self.parent_ids_of(id).into_iter().next()
    }

    /// The ids of the required direct children of the loop named `id`.
    pub fn required_child_ids(&self, id: &str) -> HashSet<String> {
        match self.find_loop(id) {
            Some(found) => found
                .loops
                .iter()
                .filter(|child| child.usage == Usage::Required)
                .map(|child| child.xid.clone())
                .collect(),
            None => HashSet::new(),
        }
    }

    /// The segment definitions declared by the loop named `id`.
    pub fn segments_of(&self, id: &str) -> Option<&[SegmentDefinition]> {
        self.find_loop(id).map(|found| found.segments.as_slice())
    }
}

/// Definition of one segment within a loop.
#[derive(Debug, Clone)]
pub struct SegmentDefinition {
    xid: String,
    name: String,
    usage: Usage,
    pos: String,
    max_use: String,
    elements: Vec<ElementDefinition>,
    composites: Vec<CompositeDefinition>,
}

impl SegmentDefinition {
    pub fn new(
        xid: impl Into<String>,
        name: impl Into<String>,
        usage: Usage,
        pos: impl Into<String>,
        max_use: impl Into<String>,
    ) -> Self {
        Self {
            xid: xid.into(),
            name: name.into(),
            usage,
            pos: pos.into(),
            max_use: max_use.into(),
            elements: Vec::new(),
            composites: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: ElementDefinition) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_composite(mut self, composite: CompositeDefinition) -> Self {
        self.composites.push(composite);
        self
    }

    pub fn xid(&self) -> &str {
        &self.xid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn pos(&self) -> &str {
        &self.pos
    }

    /// Maximum occurrences of this segment per loop; `">1"` is unbounded.
    pub fn max_use(&self) -> &str {
        &self.max_use
    }

    pub fn elements(&self) -> &[ElementDefinition] {
        &self.elements
    }

    pub fn composites(&self) -> &[CompositeDefinition] {
        &self.composites
    }

    /// The (sequence position, valid codes) pairs of coded elements.
    pub fn coded_elements(&self) -> Vec<(usize, &[String])> {
        self.elements
            .iter()
            .filter_map(|e| e.valid_codes().map(|codes| (e.seq(), codes)))
            .collect()
    }

    /// Sequence positions of required elements.
    pub fn required_element_positions(&self) -> Vec<usize> {
        self.elements
            .iter()
            .filter(|e| e.usage() == Usage::Required)
            .map(ElementDefinition::seq)
            .collect()
    }

    /// Sequence positions of required composites.
    pub fn required_composite_positions(&self) -> Vec<usize> {
        self.composites
            .iter()
            .filter(|c| c.usage() == Usage::Required)
            .map(CompositeDefinition::seq)
            .collect()
    }
}

/// Definition of one simple element within a segment.
#[derive(Debug, Clone)]
pub struct ElementDefinition {
    xid: String,
    data_ele: String,
    name: String,
    usage: Usage,
    seq: usize,
    valid_codes: Option<Vec<String>>,
    regex: Option<String>,
}

impl ElementDefinition {
    pub fn new(xid: impl Into<String>, name: impl Into<String>, usage: Usage, seq: usize) -> Self {
        Self {
            xid: xid.into(),
            data_ele: String::new(),
            name: name.into(),
            usage,
            seq,
            valid_codes: None,
            regex: None,
        }
    }

    /// Set the dictionary data-element number.
    pub fn with_data_ele(mut self, data_ele: impl Into<String>) -> Self {
        self.data_ele = data_ele.into();
        self
    }

    /// Restrict the element to a closed code list.
    pub fn with_valid_codes(mut self, codes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.valid_codes = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    /// Attach a format pattern. Carried as schema data; not evaluated during
    /// parsing.
    pub fn with_regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = Some(regex.into());
        self
    }

    pub fn xid(&self) -> &str {
        &self.xid
    }

    pub fn data_ele(&self) -> &str {
        &self.data_ele
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// 1-based element position within the segment.
    pub fn seq(&self) -> usize {
        self.seq
    }

    pub fn valid_codes(&self) -> Option<&[String]> {
        self.valid_codes.as_deref()
    }

    pub fn regex(&self) -> Option<&str> {
        self.regex.as_deref()
    }
}

/// Definition of one composite element within a segment.
#[derive(Debug, Clone)]
pub struct CompositeDefinition {
    xid: String,
    data_ele: String,
    name: String,
    usage: Usage,
    seq: usize,
    elements: Vec<ElementDefinition>,
}

impl CompositeDefinition {
    pub fn new(xid: impl Into<String>, name: impl Into<String>, usage: Usage, seq: usize) -> Self {
        Self {
            xid: xid.into(),
            data_ele: String::new(),
            name: name.into(),
            usage,
            seq,
            elements: Vec::new(),
        }
    }

    pub fn with_data_ele(mut self, data_ele: impl Into<String>) -> Self {
        self.data_ele = data_ele.into();
        self
    }

    /// Append a sub-element definition.
    pub fn with_element(mut self, element: ElementDefinition) -> Self {
        self.elements.push(element);
        self
    }

    pub fn xid(&self) -> &str {
        &self.xid
    }

    pub fn data_ele(&self) -> &str {
        &self.data_ele
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// 1-based composite position within the segment.
    pub fn seq(&self) -> usize {
        self.seq
    }

    pub fn elements(&self) -> &[ElementDefinition] {
        &self.elements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested_definition() -> LoopDefinition {
        LoopDefinition::new("ISA_LOOP", "Interchange", Usage::Required, "001", "1")
            .with_segment(SegmentDefinition::new(
                "ISA",
                "Interchange Header",
                Usage::Required,
                "010",
                "1",
            ))
            .with_loop(
                LoopDefinition::new("GS_LOOP", "Functional Group", Usage::Required, "020", ">1")
                    .with_segment(SegmentDefinition::new(
                        "GS",
                        "Group Header",
                        Usage::Required,
                        "010",
                        "1",
                    ))
                    .with_loop(LoopDefinition::new(
                        "ST_LOOP",
                        "Transaction Set",
                        Usage::Required,
                        "020",
                        ">1",
                    )),
            )
    }

    #[test]
    fn test_usage_codes() {
        assert_eq!(Usage::Required.code(), "R");
        assert_eq!(Usage::from_code("S"), Some(Usage::Situational));
        assert_eq!(Usage::from_code("X"), None);
    }

    #[test]
    fn test_find_loop_searches_subtree() {
        let root = nested_definition();
        assert_eq!(root.find_loop("ST_LOOP").unwrap().xid(), "ST_LOOP");
        assert_eq!(root.find_loop("ISA_LOOP").unwrap().xid(), "ISA_LOOP");
        assert!(root.find_loop("2300").is_none());
    }

    #[test]
    fn test_parent_ids() {
        let root = nested_definition();
        assert_eq!(root.parent_ids_of("ST_LOOP"), vec!["GS_LOOP".to_string()]);
        assert_eq!(root.first_parent_of("GS_LOOP"), Some("ISA_LOOP".into()));
        assert!(root.parent_ids_of("ISA_LOOP").is_empty());
    }

    #[test]
    fn test_required_child_ids() {
        let root = nested_definition();
        let required = root.required_child_ids("GS_LOOP");
        assert!(required.contains("ST_LOOP"));
        assert_eq!(required.len(), 1);
    }

    #[test]
    fn test_segments_of() {
        let root = nested_definition();
        let segments = root.segments_of("GS_LOOP").unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].xid(), "GS");
        assert!(root.segments_of("ST_LOOP").unwrap().is_empty());
        assert!(root.segments_of("2300").is_none());
    }

    #[test]
    fn test_segment_position_queries() {
        let segment = SegmentDefinition::new("NM1", "Name", Usage::Required, "010", "1")
            .with_element(
                ElementDefinition::new("NM101", "Entity Identifier", Usage::Required, 1)
                    .with_valid_codes(["85", "87"]),
            )
            .with_element(ElementDefinition::new(
                "NM102",
                "Entity Type",
                Usage::Situational,
                2,
            ))
            .with_element(ElementDefinition::new(
                "NM103",
                "Last Name",
                Usage::Required,
                3,
            ))
            .with_composite(CompositeDefinition::new(
                "C023",
                "Service Location",
                Usage::Required,
                4,
            ));

        assert_eq!(segment.required_element_positions(), vec![1, 3]);
        assert_eq!(segment.required_composite_positions(), vec![4]);
        let coded = segment.coded_elements();
        assert_eq!(coded.len(), 1);
        assert_eq!(coded[0].0, 1);
        assert_eq!(coded[0].1, ["85".to_string(), "87".to_string()]);
    }
}
