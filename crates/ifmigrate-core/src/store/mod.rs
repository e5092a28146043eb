//! Thin SQLite rendition of the statement facade the pass consumes.
//!
//! - [`open_database`]: connection setup shared by the pass and its tests
//! - [`BulkInsert`]: declare table and columns, accumulate rows, execute once
//! - [`MultiUpdate`]: multi-statement text buffer flushed past a byte threshold
//! - [`IdAllocator`]: fresh identifiers for a named entity class

mod bulk_insert;
mod connection;
mod ids;
mod multi_update;

pub use bulk_insert::BulkInsert;
pub use connection::{configure_connection, open_database};
pub use ids::{IdAllocator, MaxIdAllocator, SequenceAllocator};
pub use multi_update::{quote_literal, MultiUpdate, MultiUpdateStats};
