//! # x12-schema
//!
//! Schema model for X12 transaction definitions.
//!
//! A [`TransactionDefinition`] is a read-only tree of loop, segment, element
//! and composite definitions, built programmatically (file formats are loaded
//! by callers, not here). From it the [`ConfigTable`] flattens the metadata
//! the streaming parser needs per loop id, and the [`DefinitionCache`]
//! memoizes those tables across parses and threads.

/// Concurrent read-through cache of flattened loop configurations.
pub mod cache;
/// Flattened per-loop parsing metadata.
pub mod config;
/// The definition object graph and usage codes.
pub mod definition;
/// Canonical schema-child ordering.
pub mod positioned;

pub use cache::DefinitionCache;
pub use config::{ConfigTable, LoopConfig};
pub use definition::{
    CompositeDefinition, ElementDefinition, LoopDefinition, SegmentDefinition,
    TransactionDefinition, Usage,
};
pub use positioned::{ChildDefinition, Positioned, ordered_children};
