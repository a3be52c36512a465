//! One nightly run: build every report, then dispatch the composite.

use crate::exit_codes::ExitCode;
use crate::mail::{self, EmailDispatchResult, MailTransport};
use crate::pipeline::build_composite;
use crate::source::{ConnectionError, Connector};
use nr_common::{builtin_definitions, ReportDefinition};
use nr_config::Configuration;
use nr_report::CompositeReport;
use std::panic::{catch_unwind, UnwindSafe};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, warn};

/// Fatal run errors. Everything else is recovered inside the run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("cannot prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            RunError::Connection(_) => ExitCode::ConnectionError,
            RunError::OutputDir { .. } => ExitCode::IoError,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Where per-report files go; `None` skips writing them.
    pub output_dir: Option<PathBuf>,
    pub send_email: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            send_email: true,
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: CompositeReport,
    /// `None` when dispatch was skipped.
    pub dispatch: Option<EmailDispatchResult>,
}

impl RunOutcome {
    pub fn exit_code(&self) -> ExitCode {
        match &self.dispatch {
            Some(result) if !result.success => ExitCode::DeliveryFailed,
            _ => ExitCode::Clean,
        }
    }
}

/// Run `f`, turning a panic into a logged [`ExitCode::InternalError`].
pub fn exit_code_or_internal<F>(f: F) -> ExitCode
where
    F: FnOnce() -> ExitCode + UnwindSafe,
{
    catch_unwind(f).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        error!(panic = %message, "Run aborted by an internal error");
        ExitCode::InternalError
    })
}

/// Definitions from the configuration, or the built-in set.
pub fn definitions_for(config: &Configuration) -> Vec<ReportDefinition> {
    match &config.reports {
        Some(reports) if !reports.is_empty() => reports.clone(),
        _ => builtin_definitions(),
    }
}

/// Build all reports and, unless disabled, email the composite once.
///
/// `transport` may be `None` only when `options.send_email` is false.
pub fn run<C: Connector>(
    config: &Configuration,
    definitions: &[ReportDefinition],
    connector: &C,
    transport: Option<&dyn MailTransport>,
    options: &RunOptions,
) -> Result<RunOutcome, RunError> {
    if let Some(dir) = &options.output_dir {
        std::fs::create_dir_all(dir).map_err(|source| RunError::OutputDir {
            path: dir.clone(),
            source,
        })?;
    }

    info!(reports = definitions.len(), "Building nightly report");
    let report = build_composite(connector, definitions, config, options.output_dir.as_deref())?;

    let dispatch = match (options.send_email, transport) {
        (true, Some(transport)) => Some(mail::send(&report, config, transport)),
        (true, None) => {
            warn!("No mail transport available; email not sent");
            None
        }
        (false, _) => {
            info!("Email dispatch disabled");
            None
        }
    };

    Ok(RunOutcome { report, dispatch })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::{DispatchError, DispatchFailure};

    #[test]
    fn test_outcome_exit_codes() {
        let mut outcome = RunOutcome {
            report: CompositeReport::new(None),
            dispatch: None,
        };
        assert_eq!(outcome.exit_code(), ExitCode::Clean);

        outcome.dispatch = Some(EmailDispatchResult::delivered());
        assert_eq!(outcome.exit_code(), ExitCode::Clean);

        outcome.dispatch = Some(EmailDispatchResult::failed(DispatchError::new(
            DispatchFailure::Authentication,
            "535",
        )));
        assert_eq!(outcome.exit_code(), ExitCode::DeliveryFailed);
    }

    #[test]
    fn test_connection_error_exit_code() {
        let err = RunError::from(ConnectionError::Connect {
            host: "db".into(),
            port: 3306,
            database: "os".into(),
            message: "refused".into(),
        });
        assert_eq!(err.exit_code(), ExitCode::ConnectionError);
    }

    #[test]
    fn test_panic_maps_to_internal_error() {
        assert_eq!(exit_code_or_internal(|| ExitCode::DeliveryFailed), ExitCode::DeliveryFailed);

        let code = exit_code_or_internal(|| panic!("section builder bug"));
        assert_eq!(code, ExitCode::InternalError);

        let code = exit_code_or_internal(|| {
            let n: Option<u8> = None;
            panic!("formatted payload {n:?}")
        });
        assert_eq!(code, ExitCode::InternalError);
    }

    #[test]
    fn test_definitions_fallback() {
        assert_eq!(definitions_for(&Configuration::default()).len(), 4);

        let config = Configuration::from_json_str(
            r#"{"reports": [{"title": "T", "query": "select 1", "output_id": "t"}]}"#,
        )
        .unwrap();
        assert_eq!(definitions_for(&config)[0].output_id, "t");
    }
}
