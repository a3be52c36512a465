//! Query execution against the reporting data source.
//!
//! [`Connector`] opens a [`DataSource`]; [`execute`] runs one query on it
//! and never fails: an error becomes [`QueryOutcome::Failed`], which folds
//! into an empty table at the rendering boundary while keeping the reason
//! for the log and for callers that need to tell the two apart.

pub mod mysql;

pub use mysql::{MySqlConnector, MySqlSource};

use nr_common::{Table, TableError};
use nr_config::{ConfigError, Configuration};
use nr_report::SectionStatus;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Failure to establish the shared connection. Fatal for the run.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("incomplete connection settings: {0}")]
    Settings(#[from] ConfigError),

    #[error("failed to start I/O runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to connect to {host}:{port}/{database}: {message}")]
    Connect {
        host: String,
        port: u16,
        database: String,
        message: String,
    },
}

/// Failure of a single query. Recovered by the caller.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query execution failed: {0}")]
    Execution(String),

    #[error("cannot decode column '{column}': {message}")]
    Decode { column: String, message: String },

    #[error("result shape rejected: {0}")]
    Shape(#[from] TableError),

    #[error("connection already closed")]
    Closed,
}

/// An open connection that can run queries.
pub trait DataSource {
    /// Run one query and collect its full result.
    fn query(&mut self, sql: &str) -> Result<Table, QueryError>;

    /// Release the connection. Further queries fail with [`QueryError::Closed`].
    fn close(&mut self) -> Result<(), QueryError>;
}

/// Opens data source connections from configuration.
pub trait Connector {
    type Source: DataSource;

    fn connect(&self, config: &Configuration) -> Result<Self::Source, ConnectionError>;
}

/// Result of running one report query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(Table),
    Failed(String),
}

impl QueryOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, QueryOutcome::Failed(_))
    }

    /// Section status this outcome produces.
    pub fn status(&self) -> SectionStatus {
        match self {
            QueryOutcome::Rows(table) if table.row_count() == 0 => SectionStatus::Empty,
            QueryOutcome::Rows(table) => SectionStatus::Populated {
                rows: table.row_count(),
            },
            QueryOutcome::Failed(reason) => SectionStatus::Failed {
                reason: reason.clone(),
            },
        }
    }

    /// Fold into a table: failures become the empty table.
    pub fn into_table(self) -> Table {
        match self {
            QueryOutcome::Rows(table) => table,
            QueryOutcome::Failed(_) => Table::empty(),
        }
    }
}

/// Run `sql` on `source`, logging and capturing any failure.
pub fn execute<S: DataSource + ?Sized>(source: &mut S, sql: &str) -> QueryOutcome {
    match source.query(sql) {
        Ok(table) => {
            debug!(
                columns = table.column_count(),
                rows = table.row_count(),
                "Query returned"
            );
            QueryOutcome::Rows(table)
        }
        Err(err) => {
            error!(error = %err, "Query failed; section will be empty");
            QueryOutcome::Failed(err.to_string())
        }
    }
}

/// Owns the run's connection and closes it exactly once: explicitly via
/// [`ConnectionGuard::close`], or on drop (including unwinding).
pub struct ConnectionGuard<S: DataSource> {
    source: S,
    closed: bool,
}

impl<S: DataSource> ConnectionGuard<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            closed: false,
        }
    }

    pub fn source(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn close(mut self) -> Result<(), QueryError> {
        self.closed = true;
        self.source.close()
    }
}

impl<S: DataSource> Drop for ConnectionGuard<S> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self.source.close() {
            warn!(error = %err, "Failed to close data source connection");
        }
    }
}
