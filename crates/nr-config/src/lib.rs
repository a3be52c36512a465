//! Nightly report configuration loading and validation.
//!
//! This crate provides:
//! - The [`Configuration`] value read once at startup and passed by reference
//! - Config file resolution (CLI → env → working dir → XDG)
//! - Validation of the keys a run cannot do without

pub mod error;
pub mod resolve;
pub mod settings;
pub mod validate;

pub use error::ConfigError;
pub use resolve::{resolve_config_path, ConfigSource, ResolvedPath};
pub use settings::{Configuration, DatabaseSettings, SmtpSettings};
pub use validate::validate_for_run;

/// Default MySQL port when `port` is absent.
pub const DEFAULT_DB_PORT: u16 = 3306;

/// Default SMTP submission port when `smtp_port` is absent.
pub const DEFAULT_SMTP_PORT: u16 = 587;
