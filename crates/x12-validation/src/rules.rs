//! Validation rule predicates
//!
//! Small pure checks shared by the segment-level validator and the reader's
//! loop matcher. Repeat specifications come from implementation guides as
//! strings: a plain number bounds occurrences, `">1"` means unbounded.

use tracing::warn;
use x12_schema::definition::{SegmentDefinition, Usage};

/// Whether a segment's occurrence count satisfies its usage.
pub fn check_usage(usage: Usage, count: u32) -> bool {
    !(usage == Usage::Required && count == 0)
}

/// Whether a segment's occurrence count is within its max-use bound.
pub fn check_repeats(max_use: &str, count: u32) -> bool {
    if max_use == ">1" {
        return true;
    }
    match max_use.parse::<u32>() {
        Ok(max) => count <= max,
        Err(_) => {
            warn!(max_use, "unparseable max-use specification, not enforced");
            true
        }
    }
}

/// Whether a loop's occurrence count is within its repeat bound, relative to
/// how often its parent occurred.
///
/// Uses floating-point ceiling division, so uneven counts round up against
/// the bound and a zero parent count can never satisfy a numeric bound.
pub fn compare_repeats(count: u32, repeat: &str, parent_count: u32) -> bool {
    if repeat == ">1" {
        return count > 0;
    }
    if repeat.contains('>') {
        return false;
    }
    match repeat.parse::<f64>() {
        Ok(max) => (f64::from(count) / f64::from(parent_count)).ceil() <= max,
        Err(_) => {
            warn!(repeat, "unparseable repeat specification, not enforced");
            true
        }
    }
}

/// Whether a line's tokens satisfy a segment definition's valid-code
/// constraints at every coded position.
pub fn codes_match(tokens: &[&str], segment: &SegmentDefinition) -> bool {
    let coded = segment.coded_elements();
    for (i, token) in tokens.iter().enumerate().skip(1) {
        if token.is_empty() {
            continue;
        }
        if let Some((_, codes)) = coded.iter().find(|(seq, _)| *seq == i) {
            if !codes.iter().any(|code| code == token) {
                return false;
            }
        }
    }
    true
}

/// Loop-identification variant of [`codes_match`]: codes are only enforced at
/// positions the schema also marks required. This is what lets two loops
/// share an opening segment id and be told apart by a qualifier value.
pub fn codes_match_for_loop_id(tokens: &[&str], segment: &SegmentDefinition) -> bool {
    let coded = segment.coded_elements();
    let required = segment.required_element_positions();
    for (i, token) in tokens.iter().enumerate().skip(1) {
        if token.is_empty() || !required.contains(&i) {
            continue;
        }
        if let Some((_, codes)) = coded.iter().find(|(seq, _)| *seq == i) {
            if !codes.iter().any(|code| code == token) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use x12_schema::definition::ElementDefinition;

    fn nm1_definition() -> SegmentDefinition {
        SegmentDefinition::new("NM1", "Billing Provider Name", Usage::Required, "015", "1")
            .with_element(
                ElementDefinition::new("NM101", "Entity Identifier Code", Usage::Required, 1)
                    .with_valid_codes(["85"]),
            )
            .with_element(
                ElementDefinition::new("NM102", "Entity Type Qualifier", Usage::Situational, 2)
                    .with_valid_codes(["1", "2"]),
            )
    }

    #[test]
    fn test_check_usage() {
        assert!(check_usage(Usage::Required, 1));
        assert!(!check_usage(Usage::Required, 0));
        assert!(check_usage(Usage::Situational, 0));
        assert!(check_usage(Usage::NotUsed, 0));
    }

    #[test]
    fn test_check_repeats() {
        assert!(check_repeats("1", 1));
        assert!(!check_repeats("1", 2));
        assert!(check_repeats("2", 2));
        // unbounded never errors, even at zero occurrences
        assert!(check_repeats(">1", 0));
        assert!(check_repeats(">1", 50));
    }

    #[test]
    fn test_compare_repeats_even_division() {
        assert!(compare_repeats(2, "1", 2));
        assert!(!compare_repeats(3, "1", 2));
        assert!(compare_repeats(4, ">1", 1));
    }

    #[test]
    fn test_compare_repeats_uneven_division_rounds_up() {
        // parent occurred 3 times; 4 child occurrences round up to 2 per parent
        assert!(compare_repeats(4, "2", 3));
        assert!(!compare_repeats(7, "2", 3));
    }

    #[test]
    fn test_compare_repeats_zero_parent_count() {
        assert!(!compare_repeats(1, "1", 0));
        assert!(compare_repeats(1, ">1", 0));
    }

    #[test]
    fn test_codes_match_checks_every_coded_position() {
        let nm1 = nm1_definition();
        assert!(codes_match(&["NM1", "85", "2"], &nm1));
        assert!(!codes_match(&["NM1", "85", "9"], &nm1));
        assert!(!codes_match(&["NM1", "87", "2"], &nm1));
        // empty tokens are not code-checked
        assert!(codes_match(&["NM1", "85", ""], &nm1));
    }

    #[test]
    fn test_codes_match_for_loop_id_only_required_positions() {
        let nm1 = nm1_definition();
        // NM102 is situational, so its bad code is ignored for loop matching
        assert!(codes_match_for_loop_id(&["NM1", "85", "9"], &nm1));
        assert!(!codes_match_for_loop_id(&["NM1", "87", "2"], &nm1));
    }
}
