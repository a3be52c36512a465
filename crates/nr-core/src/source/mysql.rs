//! MySQL data source.
//!
//! sqlx is async; the run is a single blocking sequence. [`MySqlSource`]
//! owns a current-thread tokio runtime and blocks on every call, so callers
//! see a plain synchronous connection.

use super::{Connector, ConnectionError, DataSource, QueryError};
use chrono::{NaiveDate, NaiveDateTime};
use nr_common::{Column, ColumnKind, Table, Value};
use nr_config::Configuration;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column as _, Connection, Executor, Row, Statement, TypeInfo, ValueRef};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, trace};

/// Opens [`MySqlSource`] connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnector;

impl Connector for MySqlConnector {
    type Source = MySqlSource;

    fn connect(&self, config: &Configuration) -> Result<MySqlSource, ConnectionError> {
        let settings = config.database_settings()?;
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ConnectionError::Runtime)?;

        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.database);

        let conn = runtime
            .block_on(MySqlConnection::connect_with(&options))
            .map_err(|err| ConnectionError::Connect {
                host: settings.host.clone(),
                port: settings.port,
                database: settings.database.clone(),
                message: err.to_string(),
            })?;

        info!(
            host = %settings.host,
            port = settings.port,
            database = %settings.database,
            "Connected to data source"
        );
        Ok(MySqlSource {
            runtime,
            conn: Some(conn),
        })
    }
}

/// A blocking MySQL connection.
#[derive(Debug)]
pub struct MySqlSource {
    runtime: Runtime,
    conn: Option<MySqlConnection>,
}

impl DataSource for MySqlSource {
    fn query(&mut self, sql: &str) -> Result<Table, QueryError> {
        let conn = self.conn.as_mut().ok_or(QueryError::Closed)?;
        self.runtime.block_on(fetch_table(conn, sql))
    }

    fn close(&mut self) -> Result<(), QueryError> {
        match self.conn.take() {
            Some(conn) => {
                self.runtime.block_on(conn.close()).map_err(execution)?;
                debug!("Data source connection closed");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

async fn fetch_table(conn: &mut MySqlConnection, sql: &str) -> Result<Table, QueryError> {
    // Preparing first gives column metadata even when no rows come back.
    let statement = (&mut *conn).prepare(sql).await.map_err(execution)?;
    let columns: Vec<(Column, String)> = statement
        .columns()
        .iter()
        .map(|c| {
            let type_name = c.type_info().name().to_string();
            (Column::new(c.name(), column_kind(&type_name)), type_name)
        })
        .collect();

    let rows = statement
        .query()
        .fetch_all(&mut *conn)
        .await
        .map_err(execution)?;

    let type_names: Vec<String> = columns.iter().map(|(_, t)| t.clone()).collect();
    let mut table = Table::with_columns(columns.into_iter().map(|(c, _)| c).collect())?;
    for row in &rows {
        let values = (0..type_names.len())
            .map(|index| {
                decode_value(row, index, &type_names[index]).map_err(|err| QueryError::Decode {
                    column: table.columns()[index].source.clone(),
                    message: err.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        trace!(?values, "Row");
        table.push_row(values)?;
    }
    Ok(table)
}

fn execution(err: sqlx::Error) -> QueryError {
    QueryError::Execution(err.to_string())
}

fn is_integer_type(type_name: &str) -> bool {
    let base = type_name.split_whitespace().next().unwrap_or_default();
    matches!(
        base,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "BOOLEAN" | "YEAR" | "BIT"
    )
}

/// Semantic kind for a MySQL type name as reported by sqlx.
pub fn column_kind(type_name: &str) -> ColumnKind {
    match type_name {
        "DATETIME" | "TIMESTAMP" | "DATE" => ColumnKind::Timestamp,
        "DECIMAL" | "FLOAT" | "DOUBLE" => ColumnKind::Numeric,
        t if is_integer_type(t) => ColumnKind::Numeric,
        _ => ColumnKind::Text,
    }
}

fn decode_value(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "DATETIME" | "TIMESTAMP" => Value::Timestamp(row.try_get_unchecked::<NaiveDateTime, _>(index)?),
        "DATE" => {
            let date = row.try_get_unchecked::<NaiveDate, _>(index)?;
            date.and_hms_opt(0, 0, 0).map_or(Value::Null, Value::Timestamp)
        }
        "FLOAT" | "DOUBLE" => Value::Float(row.try_get_unchecked::<f64, _>(index)?),
        "DECIMAL" => {
            let text = row.try_get_unchecked::<String, _>(index)?;
            match text.parse::<f64>() {
                Ok(x) => Value::Float(x),
                Err(_) => Value::Text(text),
            }
        }
        t if is_integer_type(t) && t.ends_with("UNSIGNED") => {
            let n = row.try_get_unchecked::<u64, _>(index)?;
            i64::try_from(n).map_or_else(|_| Value::Text(n.to_string()), Value::Integer)
        }
        t if is_integer_type(t) => Value::Integer(row.try_get_unchecked::<i64, _>(index)?),
        _ => match row.try_get_unchecked::<String, _>(index) {
            Ok(text) => Value::Text(text),
            Err(_) => {
                let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
                Value::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
        },
    };
    Ok(value)
}
