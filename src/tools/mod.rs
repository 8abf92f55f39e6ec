//! Table maintenance utilities sharing the store and batch writer.

pub mod reverse_values;
pub mod table_ids;

pub use reverse_values::{reverse_values, ReverseReport};
pub use table_ids::{convert_name, IdFormat, TableIds, UnknownCounter};
