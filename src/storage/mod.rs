//! Storage for operand pairs.
//!
//! The pipeline only sees the [`DataLookup`] trait. Two backends:
//! - [`SqlitePairStore`]: rusqlite database on disk
//! - [`MemoryLookup`]: HashMap for tests and dry runs

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryLookup;
pub use sqlite::SqlitePairStore;
pub use traits::{DataLookup, pair_sort_key, user_partition_key};
