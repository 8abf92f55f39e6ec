//! hierlabel: outline labels for hierarchical records.
//!
//! Reads records from a table whose link field points either at each
//! record's parent or at its children, rebuilds the forest, and writes an
//! index label ("1.2.3") or a path label ("Root > Mid > Leaf") into an
//! output field in batches of at most 50 records.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod observability;
pub mod pipeline;
pub mod store;
pub mod tools;
pub mod types;
pub mod writer;
