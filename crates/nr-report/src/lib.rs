//! Transform pipeline and HTML rendering for nightly reports.
//!
//! A query result flows through three stages:
//!
//! - [`transform`]: link injection, column drops, label rewrite, timestamp
//!   formatting
//! - [`render_table`]: the transformed table as an HTML `<table>`
//! - [`CompositeReport`]: every section in one email-ready document
//!
//! # Example
//!
//! ```
//! use nr_common::{Column, ColumnKind, ReportDefinition, Table, Value};
//! use nr_config::Configuration;
//! use nr_report::{render_table, transform};
//!
//! let table = Table::from_rows(
//!     vec![Column::new("time_taken", ColumnKind::Numeric)],
//!     vec![vec![Value::Integer(12)]],
//! )
//! .unwrap();
//! let def = ReportDefinition::new("Slow queries", "select ...", "slow_queries");
//! let config = Configuration::default();
//!
//! let html = render_table(&transform(table, &def, &config));
//! assert!(html.contains("<th>Time Taken (in seconds)</th>"));
//! ```

pub mod composite;
pub mod error;
pub mod render;
pub mod transform;

pub use composite::{CompositeReport, ReportSection, SectionStatus};
pub use error::{ReportError, Result};
pub use render::render_table;
pub use transform::{display_label, transform};
