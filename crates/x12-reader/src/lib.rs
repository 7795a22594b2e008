//! # x12-reader
//!
//! Streaming parser for ANSI X12 transactions.
//!
//! The reader detects the document's delimiters from the fixed-width `ISA`
//! control header, checks the declared version against the schema, then
//! consumes segment lines one at a time, matching each line against the
//! schema's loop configuration to grow one loop tree per interchange
//! envelope. Validation findings accumulate as two string lists: recoverable
//! errors, after which parsing continues, and fatal errors, which stop it.
//!
//! ```no_run
//! use std::io::BufReader;
//! use std::sync::Arc;
//! # fn definition() -> x12_schema::TransactionDefinition { unimplemented!() }
//! use x12_reader::X12Reader;
//!
//! let schema = Arc::new(definition());
//! let file = std::fs::File::open("claim.837")?;
//! let reader = X12Reader::parse(schema, BufReader::new(file))?;
//! for tree in reader.loops() {
//!     println!("{}", tree.id(tree.root()));
//! }
//! # Ok::<(), x12_reader::Error>(())
//! ```

/// The streaming reader and loop-matching state machine.
pub mod reader;
mod scanner;

pub use reader::X12Reader;

use thiserror::Error;

/// Errors that can occur while reading input.
///
/// Document-validation findings are not errors at this level; they are
/// reported through [`X12Reader::errors`] and [`X12Reader::fatal_errors`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
