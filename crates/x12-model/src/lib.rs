#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # x12-model
//!
//! Document model for ANSI X12 transactions.
//!
//! An X12 transaction is delimiter-separated text: elements combine into
//! segments, segments are grouped into loops, and a set of nested loops forms
//! a transaction. This crate provides the mutable tree the parser builds
//! ([`Loop`]), its building blocks ([`Segment`], [`Element`]) and the
//! delimiter definitions ([`Separators`], [`LineBreak`]).

/// Element type: a scalar value, optionally subdivided into composite parts.
pub mod element;
/// Segment type: an identified, ordered sequence of elements.
pub mod segment;
/// Delimiter definitions and splitting operations.
pub mod separators;
/// The loop tree built by the parser.
pub mod tree;

pub use element::Element;
pub use segment::Segment;
pub use separators::{LineBreak, Separators};
pub use tree::{Loop, NodeId};

use thiserror::Error;

/// Errors raised for invalid use of the model API.
///
/// These are programming errors, distinct from document-validation findings,
/// which the reader reports as accumulated strings.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Elements must have a non-empty identifier")]
    EmptyElementId,

    #[error("No element separator is configured")]
    ElementSeparatorDisabled,
}

pub type Result<T> = std::result::Result<T, Error>;
