//! Flattened loop configuration
//!
//! The streaming parser decides, one line at a time, which schema loop the
//! line opens, closes or continues. It never walks the definition tree for
//! that decision; instead the tree is flattened once per schema into a
//! [`ConfigTable`] of per-loop metadata keyed by loop id.

use crate::definition::{LoopDefinition, SegmentDefinition, TransactionDefinition, Usage};
use std::collections::HashMap;
use tracing::debug;

/// Parsing metadata for one distinct loop id.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    loop_id: String,
    parent_loop: Option<String>,
    child_loops: Vec<String>,
    repeat: String,
    usage: Usage,
    first_segment: Option<SegmentDefinition>,
    last_segment: Option<SegmentDefinition>,
    has_data_segments: bool,
}

impl LoopConfig {
    pub fn loop_id(&self) -> &str {
        &self.loop_id
    }

    /// The parent loop id recorded when this config was first seen.
    pub fn parent_loop(&self) -> Option<&str> {
        self.parent_loop.as_deref()
    }

    /// Ids of the loop's direct child loops.
    pub fn child_loops(&self) -> &[String] {
        &self.child_loops
    }

    /// The loop repeat specification; `">1"` means unbounded.
    pub fn repeat(&self) -> &str {
        &self.repeat
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// The segment definition whose appearance opens this loop.
    pub fn first_segment(&self) -> Option<&SegmentDefinition> {
        self.first_segment.as_ref()
    }

    /// The closing segment definition, present only for two-part loops whose
    /// schema declares two or more segments.
    pub fn last_segment(&self) -> Option<&SegmentDefinition> {
        self.last_segment.as_ref()
    }

    /// Whether the loop declares segments of its own. Segmentless loops are
    /// schema grouping nodes that never appear in the text directly.
    pub fn has_data_segments(&self) -> bool {
        self.has_data_segments
    }
}

/// All loop configurations of one transaction definition, in pre-order.
#[derive(Debug)]
pub struct ConfigTable {
    configs: Vec<LoopConfig>,
    index: HashMap<String, usize>,
    first_wins_conflicts: Vec<String>,
}

impl ConfigTable {
    /// Flatten a transaction definition into its configuration table.
    ///
    /// The walk is pre-order and stops at loop ids it has already seen: a
    /// loop id declared under two different parents keeps only its first
    /// configuration. The skipped occurrences are recorded and can be
    /// inspected with [`ConfigTable::first_wins_conflicts`].
    pub fn build(definition: &TransactionDefinition) -> Self {
        let mut table = Self {
            configs: Vec::new(),
            index: HashMap::new(),
            first_wins_conflicts: Vec::new(),
        };
        table.walk(definition.root(), None);
        debug!(
            transaction = definition.xid(),
            loops = table.configs.len(),
            conflicts = table.first_wins_conflicts.len(),
            "flattened loop configuration"
        );
        table
    }

    fn walk(&mut self, definition: &LoopDefinition, parent_id: Option<&str>) {
        let id = definition.xid();
        if self.index.contains_key(id) {
            self.first_wins_conflicts.push(id.to_string());
            return;
        }

        let segments = definition.segments();
        let config = LoopConfig {
            loop_id: id.to_string(),
            parent_loop: parent_id.map(str::to_string),
            child_loops: definition
                .loops()
                .iter()
                .map(|child| child.xid().to_string())
                .collect(),
            repeat: definition.repeat().to_string(),
            usage: definition.usage(),
            first_segment: segments.first().cloned(),
            last_segment: if segments.len() > 1 {
                segments.last().cloned()
            } else {
                None
            },
            has_data_segments: definition.has_segments(),
        };
        self.index.insert(id.to_string(), self.configs.len());
        self.configs.push(config);

        for child in definition.loops() {
            self.walk(child, Some(id));
        }
    }

    /// The configuration for a loop id.
    pub fn get(&self, id: &str) -> Option<&LoopConfig> {
        self.index.get(id).map(|&i| &self.configs[i])
    }

    /// All configurations, in schema pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &LoopConfig> {
        self.configs.iter()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Loop ids whose repeated schema occurrences were dropped by the
    /// first-occurrence-wins rule.
    pub fn first_wins_conflicts(&self) -> &[String] {
        &self.first_wins_conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_part_definition() -> TransactionDefinition {
        let root = LoopDefinition::new("ISA_LOOP", "Interchange", Usage::Required, "001", "1")
            .with_segment(SegmentDefinition::new(
                "ISA",
                "Header",
                Usage::Required,
                "010",
                "1",
            ))
            .with_segment(SegmentDefinition::new(
                "IEA",
                "Trailer",
                Usage::Required,
                "030",
                "1",
            ))
            .with_loop(
                LoopDefinition::new("GS_LOOP", "Group", Usage::Required, "020", ">1")
                    .with_segment(SegmentDefinition::new(
                        "GS",
                        "Header",
                        Usage::Required,
                        "010",
                        "1",
                    ))
                    .with_loop(
                        LoopDefinition::new("DETAIL", "Detail", Usage::Situational, "015", "1")
                            .with_loop(
                                LoopDefinition::new("2300", "Claim", Usage::Required, "010", ">1")
                                    .with_segment(SegmentDefinition::new(
                                        "CLM",
                                        "Claim",
                                        Usage::Required,
                                        "010",
                                        "1",
                                    )),
                            ),
                    ),
            );
        TransactionDefinition::new("837", "Claim", "005010X222A1", root)
    }

    #[test]
    fn test_two_part_loop_records_first_and_last_segment() {
        let table = ConfigTable::build(&two_part_definition());
        let isa = table.get("ISA_LOOP").unwrap();
        assert_eq!(isa.first_segment().unwrap().xid(), "ISA");
        assert_eq!(isa.last_segment().unwrap().xid(), "IEA");
        assert!(isa.has_data_segments());

        // single-segment loops never get a closing segment
        let gs = table.get("GS_LOOP").unwrap();
        assert_eq!(gs.first_segment().unwrap().xid(), "GS");
        assert!(gs.last_segment().is_none());
    }

    #[test]
    fn test_parent_and_children_recorded() {
        let table = ConfigTable::build(&two_part_definition());
        let gs = table.get("GS_LOOP").unwrap();
        assert_eq!(gs.parent_loop(), Some("ISA_LOOP"));
        assert_eq!(gs.child_loops(), ["DETAIL".to_string()]);
        assert_eq!(table.get("ISA_LOOP").unwrap().parent_loop(), None);
    }

    #[test]
    fn test_segmentless_loop_flag() {
        let table = ConfigTable::build(&two_part_definition());
        let detail = table.get("DETAIL").unwrap();
        assert!(!detail.has_data_segments());
        assert!(detail.first_segment().is_none());
    }

    #[test]
    fn test_preorder_iteration() {
        let table = ConfigTable::build(&two_part_definition());
        let ids: Vec<&str> = table.iter().map(LoopConfig::loop_id).collect();
        assert_eq!(ids, vec!["ISA_LOOP", "GS_LOOP", "DETAIL", "2300"]);
    }

    #[test]
    fn test_first_wins_for_repeated_loop_id() {
        // 2010A declared under both 2000A and 2000B; the 2000A configuration
        // must win and the skipped occurrence must be queryable.
        let shared = |pos: &str| {
            LoopDefinition::new("2010A", "Shared Name", Usage::Required, pos, "1").with_segment(
                SegmentDefinition::new("NM1", "Name", Usage::Required, "010", "1"),
            )
        };
        let root = LoopDefinition::new("ST_LOOP", "Transaction", Usage::Required, "001", "1")
            .with_segment(SegmentDefinition::new(
                "ST",
                "Header",
                Usage::Required,
                "005",
                "1",
            ))
            .with_loop(
                LoopDefinition::new("2000A", "Billing", Usage::Required, "010", "1")
                    .with_segment(SegmentDefinition::new(
                        "HL",
                        "Level",
                        Usage::Required,
                        "001",
                        "1",
                    ))
                    .with_loop(shared("020")),
            )
            .with_loop(
                LoopDefinition::new("2000B", "Subscriber", Usage::Required, "020", "1")
                    .with_segment(SegmentDefinition::new(
                        "HL",
                        "Level",
                        Usage::Required,
                        "001",
                        "1",
                    ))
                    .with_loop(shared("030")),
            );
        let definition = TransactionDefinition::new("837", "Claim", "005010X222A1", root);

        let table = ConfigTable::build(&definition);
        assert_eq!(table.get("2010A").unwrap().parent_loop(), Some("2000A"));
        assert_eq!(table.first_wins_conflicts(), ["2010A".to_string()]);
    }
}
