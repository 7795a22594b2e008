//! Structure validator
//!
//! Two passes share this type. While the reader materializes a loop it calls
//! [`StructureValidator::validate_loop_lines`] on the buffered lines; after
//! the stream ends (and only when nothing fatal happened) the reader calls
//! [`StructureValidator::validate_document`] with the accumulated counters
//! and child tracker.

use crate::rules::{check_repeats, check_usage, codes_match, compare_repeats};
use crate::state::{ChildLoopTracker, LoopCounters};
use tracing::warn;
use x12_model::Separators;
use x12_schema::config::ConfigTable;
use x12_schema::definition::{SegmentDefinition, TransactionDefinition, Usage};

/// Envelope closers whose presence is enforced by the reader's
/// end-of-transaction handling, not by the per-loop required check.
const TOP_LEVEL_CLOSERS: [&str; 3] = ["IEA", "GE", "SE"];

/// Validates loop contents and overall loop structure against a transaction
/// definition.
pub struct StructureValidator<'a> {
    definition: &'a TransactionDefinition,
    config: &'a ConfigTable,
}

impl<'a> StructureValidator<'a> {
    pub fn new(definition: &'a TransactionDefinition, config: &'a ConfigTable) -> Self {
        Self { definition, config }
    }

    /// Validate the buffered lines of one loop occurrence: every line must
    /// match exactly one declared segment format, positions must not move
    /// backwards, and usage, max-use and required element/composite
    /// constraints must hold.
    pub fn validate_loop_lines(
        &self,
        loop_id: &str,
        lines: &[String],
        separators: &Separators,
        errors: &mut Vec<String>,
    ) {
        let format = self.definition.root().segments_of(loop_id).unwrap_or(&[]);
        let mut counter = vec![0u32; format.len()];
        let mut previous_pos: Option<u32> = None;

        for line in lines {
            let Some(tokens) = separators.split_element(line) else {
                errors.push("Unable to split elements to validate segment ID!".to_string());
                continue;
            };

            let mut matched = false;
            for (i, segment) in format.iter().enumerate() {
                if tokens.first().copied() == Some(segment.xid()) && codes_match(&tokens, segment) {
                    if let Some(current) = parse_position(segment.pos()) {
                        if previous_pos.is_some_and(|previous| previous > current) {
                            errors.push(format!(
                                "Segment {} in loop {} is not in the correct position.",
                                segment.xid(),
                                loop_id
                            ));
                        }
                        previous_pos = Some(current);
                    }
                    counter[i] += 1;
                    matched = true;
                    break;
                }
            }

            if !matched {
                errors.push(format!(
                    "Unable to find a matching segment format in loop {loop_id}"
                ));
            }
        }

        for (i, segment) in format.iter().enumerate() {
            if !check_usage(segment.usage(), counter[i])
                && !TOP_LEVEL_CLOSERS.contains(&segment.xid())
            {
                errors.push(format!(
                    "{} in loop {} is required but not found",
                    segment.xid(),
                    loop_id
                ));
            }
            if !check_repeats(segment.max_use(), counter[i]) {
                errors.push(format!(
                    "{} in loop {} appears too many times",
                    segment.xid(),
                    loop_id
                ));
            }
            if counter[i] == 0 {
                continue;
            }
            for line in lines {
                let Some(tokens) = separators.split_element(line) else {
                    continue;
                };
                if tokens.first().copied() == Some(segment.xid()) {
                    check_required_elements(&tokens, segment, loop_id, errors);
                    check_required_composites(&tokens, segment, loop_id, errors);
                }
            }
        }
    }

    /// Validate the finished document: loop repeat bounds relative to parent
    /// occurrence counts, and required child loops per tracked occurrence.
    pub fn validate_document(
        &self,
        counters: &LoopCounters,
        tracker: &ChildLoopTracker,
        errors: &mut Vec<String>,
    ) {
        for config in self.config.iter() {
            let count = counters.count(config.loop_id());
            let over_limit = |parent: &str| {
                !compare_repeats(count, config.repeat(), counters.count(parent))
            };
            let exceeded = match config.usage() {
                Usage::Required => count != 0 && config.parent_loop().is_some_and(over_limit),
                Usage::Situational => count > 0 && config.parent_loop().is_some_and(over_limit),
                Usage::NotUsed => false,
            };
            if exceeded {
                errors.push(format!("{} appears too many times", config.loop_id()));
            }

            let mut required: Vec<String> = self
                .definition
                .root()
                .required_child_ids(config.loop_id())
                .into_iter()
                .collect();
            required.sort();
            if required.is_empty() {
                continue;
            }
            if let Some(occurrences) = tracker.occurrences(config.loop_id()) {
                for (i, present) in occurrences.iter().enumerate() {
                    for child in &required {
                        if !present.contains(child) {
                            errors.push(format!(
                                "{} is required but not found in {} iteration #{}",
                                child,
                                config.loop_id(),
                                i + 1
                            ));
                        }
                    }
                }
            }
        }
    }
}

fn parse_position(pos: &str) -> Option<u32> {
    match pos.parse::<u32>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(pos, "unparseable segment position, ordering not enforced");
            None
        }
    }
}

fn check_required_elements(
    tokens: &[&str],
    segment: &SegmentDefinition,
    loop_id: &str,
    errors: &mut Vec<String>,
) {
    for position in segment.required_element_positions() {
        if position >= tokens.len() {
            errors.push(format!(
                "{} in loop {} element at position {} does not exist",
                segment.xid(),
                loop_id,
                position
            ));
            return;
        }
        if tokens[position].is_empty() {
            errors.push(format!(
                "{} in loop {} is missing a required element at {}",
                segment.xid(),
                loop_id,
                position
            ));
            return;
        }
    }
}

fn check_required_composites(
    tokens: &[&str],
    segment: &SegmentDefinition,
    loop_id: &str,
    errors: &mut Vec<String>,
) {
    for position in segment.required_composite_positions() {
        if position >= tokens.len() {
            errors.push(format!(
                "{} in loop {} composite element at position {} does not exist",
                segment.xid(),
                loop_id,
                position
            ));
            return;
        }
        if tokens[position].is_empty() {
            errors.push(format!(
                "{} in loop {} is missing a required composite element at {}",
                segment.xid(),
                loop_id,
                position
            ));
            return;
        }
    }
}
