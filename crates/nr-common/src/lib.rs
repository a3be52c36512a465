//! Nightly report shared types.
//!
//! - [`Table`]: typed, ordered columns with row-major values
//! - [`ReportDefinition`]: a titled query and its column rules
//! - [`builtin_definitions`]: the reports run when configuration does not
//!   override them

pub mod definition;
pub mod table;

pub use definition::{builtin_definitions, ReportDefinition};
pub use table::{escape_html, Anchor, Column, ColumnKind, Table, TableError, Value};
