//! SQLite access: connection setup, catalog queries, and value conversion.

pub mod converters;
pub mod schema;
