//! Nightly Report - scheduled usage report mailer
//!
//! Loads the configuration, builds every report against the data source,
//! writes the per-report HTML files and emails the composite document.

use clap::Parser;
use nr_config::{resolve_config_path, validate_for_run, ConfigError, Configuration};
use nr_core::exit_codes::ExitCode;
use nr_core::logging::{generate_run_id, init_logging, LogConfig, LogFormat, LogLevel};
use nr_core::mail::{MailTransport, SmtpMailer};
use nr_core::source::MySqlConnector;
use nr_core::{definitions_for, exit_code_or_internal, run, RunOptions};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use tracing::{error, info, info_span, warn};

/// Nightly Report - query usage metrics and email them as HTML tables
#[derive(Parser, Debug)]
#[command(name = "nightly-report")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, short = 'c', env = "NIGHTLY_REPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for the per-report HTML files (overrides `output_dir`)
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// Build and write reports but do not send the email
    #[arg(long)]
    no_email: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Log format: human or jsonl
    #[arg(long, env = "NIGHTLY_REPORT_LOG_FORMAT", default_value = "human")]
    log_format: LogFormat,

    /// Append log lines to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version also arrive here, on stdout.
            let code = if err.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    let log_config = LogConfig {
        level: LogLevel::from_verbosity(cli.verbose, cli.quiet),
        format: cli.log_format,
        timestamps: true,
        file: cli.log_file.clone(),
    };
    if let Err(err) = init_logging(&log_config) {
        eprintln!("nightly-report: {err}");
        std::process::exit(ExitCode::IoError.as_i32());
    }

    let run_id = generate_run_id();
    let exit_code = info_span!("run", run_id = %run_id)
        .in_scope(|| exit_code_or_internal(AssertUnwindSafe(|| execute(&cli))));
    info!(exit_code = %exit_code, "Run finished");

    std::process::exit(exit_code.as_i32());
}

fn execute(cli: &Cli) -> ExitCode {
    let config = match load_config(cli) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Configuration error");
            return ExitCode::ConfigError;
        }
    };

    let definitions = definitions_for(&config);
    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output_dir().to_path_buf());
    let options = RunOptions {
        output_dir: Some(output_dir),
        send_email: !cli.no_email,
    };

    let mailer = SmtpMailer::from_config(&config);
    let transport: Option<&dyn MailTransport> = Some(&mailer);

    match run(&config, &definitions, &MySqlConnector, transport, &options) {
        Ok(outcome) => {
            if let Some(result) = &outcome.dispatch {
                if !result.success {
                    warn!(
                        classification = result.classification().unwrap_or("unknown"),
                        "Reports written but email was not delivered"
                    );
                }
            }
            outcome.exit_code()
        }
        Err(err) => {
            error!(error = %err, "Run aborted");
            err.exit_code()
        }
    }
}

fn load_config(cli: &Cli) -> Result<Configuration, ConfigError> {
    let resolved = resolve_config_path(cli.config.as_deref())?;
    info!(
        path = %resolved.path.display(),
        source = %resolved.source,
        "Loading configuration"
    );
    let config = Configuration::from_file(&resolved.path)?;
    validate_for_run(&config)?;
    Ok(config)
}
