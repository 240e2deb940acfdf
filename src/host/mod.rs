//! Host boundary: what a query-serving host sees of a discovered table.
//!
//! - [`schema`]: host column types, column definitions and value accessors
//! - [`value`]: conversion of raw cells into [`HostValue`]s
//! - [`table`]: the [`Table`] streaming interface and the [`Plugin`] registration object

pub mod schema;
pub mod table;
pub mod value;

pub use schema::{ColumnDefinition, HostColumnType, ValueAccessor, build_columns, sanitize_identifier};
pub use table::{Plugin, Table};
pub use value::{HostValue, convert};
