//! # x12-writer
//!
//! Schema-ordered serializer for X12 documents.
//!
//! The writer walks a parsed (or programmatically built) loop tree in the
//! order its transaction definition declares, not the order segments were
//! attached, and re-emits delimited X12 text. Input parsed without
//! validation errors round-trips byte-equal, modulo the chosen line-break
//! convention.
//!
//! ```no_run
//! use std::io::BufReader;
//! use std::sync::Arc;
//! # fn definition() -> x12_schema::TransactionDefinition { unimplemented!() }
//! use x12_model::LineBreak;
//! use x12_reader::X12Reader;
//! use x12_writer::X12Writer;
//!
//! let schema = Arc::new(definition());
//! let file = std::fs::File::open("claim.837")?;
//! let reader = X12Reader::parse(schema, BufReader::new(file))?;
//! let writer = X12Writer::from_reader(&reader);
//! println!("{}", writer.to_x12_string(LineBreak::Lf));
//! # Ok::<(), x12_reader::Error>(())
//! ```

/// The serializer.
pub mod writer;

pub use writer::X12Writer;
