#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # x12-validation
//!
//! Structural validation of X12 documents against their transaction
//! definition.
//!
//! Validation findings are accumulated human-readable strings, never
//! panics or early returns: the reader keeps parsing after a recoverable
//! finding and hands callers the full list. Segment-level checks run while
//! the parser materializes each loop; document-level checks run once over
//! the whole parse via [`StructureValidator::validate_document`].

/// Rule predicates for usage, repeat and code-list checks.
pub mod rules;
/// Per-parse validation state populated by the reader.
pub mod state;
/// The validator tying rules and state together.
pub mod validator;

pub use rules::{check_repeats, check_usage, codes_match, codes_match_for_loop_id, compare_repeats};
pub use state::{ChildLoopTracker, LoopCounters};
pub use validator::StructureValidator;
