//! Nightly Report Core Library
//!
//! Runs the nightly usage report:
//! - Query execution against the MySQL data source
//! - Composite assembly of the rendered report sections
//! - Email dispatch with classified delivery failures
//! - Logging setup and exit codes for the CLI
//!
//! The binary entry point is in `main.rs`.

pub mod exit_codes;
pub mod logging;
pub mod mail;
pub mod pipeline;
pub mod run;
pub mod source;

pub use exit_codes::ExitCode;
pub use pipeline::{build_composite, build_section};
pub use run::{definitions_for, exit_code_or_internal, run, RunError, RunOptions, RunOutcome};
