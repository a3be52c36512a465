//! Column transform pipeline.
//!
//! Steps run in a fixed order:
//!
//! 1. link injection: `query_id` → appended `URL` column of anchors
//! 2. column drop: remove the definition's `drop_columns`
//! 3. label rewrite: `time_taken` → `Time Taken (in seconds)` and friends
//! 4. timestamp formatting: `DD Mon YYYY HH:MM:SS`
//!
//! Each step runs on a working copy. A step that fails is logged and
//! skipped; the table the previous step produced carries on to the next.

use crate::error::{ReportError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use nr_common::{Anchor, Column, ColumnKind, ReportDefinition, Table, TableError, Value};
use nr_config::Configuration;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Source column holding saved-query identifiers.
pub const QUERY_ID_COLUMN: &str = "query_id";

/// Label of the injected link column.
pub const URL_COLUMN: &str = "URL";

/// Path appended to the configured base URL, followed by the query id.
pub const QUERY_LINK_PATH: &str = "addedit?queryId=";

/// Anchor text for injected links.
pub const QUERY_LINK_LABEL: &str = "View query";

/// Display labels that are always formatted as timestamps.
pub const TIMESTAMP_LABELS: [&str; 4] = ["Date", "Call Start Time", "Call End Time", "Start Time"];

/// Fixed display pattern for timestamps, e.g. `05 Mar 2026 14:07:09`.
pub const TIMESTAMP_DISPLAY_FORMAT: &str = "%d %b %Y %H:%M:%S";

/// Title-cased label → final label.
const LABEL_SYNONYMS: [(&str, &str); 3] = [
    ("Time Taken", "Time Taken (in seconds)"),
    ("Cnt", "Number Of Queries"),
    ("Count", "Number Of Queries"),
];

/// Epoch integers at or above this are milliseconds rather than seconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    InjectLinks,
    DropColumns,
    RewriteLabels,
    FormatTimestamps,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::InjectLinks => "inject_links",
            Step::DropColumns => "drop_columns",
            Step::RewriteLabels => "rewrite_labels",
            Step::FormatTimestamps => "format_timestamps",
        }
    }
}

/// Run the full pipeline over one query result.
pub fn transform(table: Table, definition: &ReportDefinition, config: &Configuration) -> Table {
    let mut table = table;
    if table.is_empty() {
        return table;
    }

    apply_step(&mut table, definition, Step::InjectLinks, |t| {
        inject_query_links(t, config.base_url()).map(|_| ())
    });
    apply_step(&mut table, definition, Step::DropColumns, |t| {
        for missing in drop_columns(t, &definition.drop_columns)? {
            warn!(
                report = %definition.title,
                output_id = %definition.output_id,
                column = %missing,
                "Column to drop not present"
            );
        }
        Ok(())
    });
    apply_step(&mut table, definition, Step::RewriteLabels, rewrite_labels);
    apply_step(&mut table, definition, Step::FormatTimestamps, |t| {
        format_timestamps(t, &definition.timestamp_columns).map(|_| ())
    });

    table
}

fn apply_step(
    table: &mut Table,
    definition: &ReportDefinition,
    step: Step,
    f: impl FnOnce(&mut Table) -> Result<()>,
) {
    let mut working = table.clone();
    match f(&mut working) {
        Ok(()) => *table = working,
        Err(err) => warn!(
            report = %definition.title,
            output_id = %definition.output_id,
            step = step.name(),
            error = %err,
            "Transform step failed; skipping"
        ),
    }
}

/// Append a `URL` column linking every non-null `query_id` to its editor page.
///
/// Returns `false` (table untouched) when there is no base URL or no
/// `query_id` column.
pub fn inject_query_links(table: &mut Table, base_url: Option<&str>) -> Result<bool> {
    let Some(base_url) = base_url else {
        debug!("No base URL configured; link injection skipped");
        return Ok(false);
    };
    let Some(index) = table
        .columns()
        .iter()
        .position(|c| c.source == QUERY_ID_COLUMN)
    else {
        return Ok(false);
    };

    let links = table
        .column_values(index)
        .map(|value| -> Result<Value> {
            Ok(match query_id_text(value)? {
                Some(id) => Value::Link(Anchor::new(
                    format!("{base_url}{QUERY_LINK_PATH}{id}"),
                    QUERY_LINK_LABEL,
                )),
                None => Value::Null,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    table.append_column(Column::new(URL_COLUMN, ColumnKind::Link), links)?;
    Ok(true)
}

fn query_id_text(value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(id) => Ok(Some(id.to_string())),
        Value::Text(id) if !id.trim().is_empty() => Ok(Some(id.trim().to_string())),
        Value::Text(_) => Ok(None),
        Value::Float(id) if id.fract() == 0.0 => Ok(Some(format!("{id:.0}"))),
        other => Err(ReportError::UnsupportedValue {
            column: QUERY_ID_COLUMN.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Remove the named columns (matched by source name or current label).
///
/// Returns the names that were not present.
pub fn drop_columns(table: &mut Table, names: &[String]) -> Result<Vec<String>> {
    let mut missing = Vec::new();
    for name in names {
        let label = table
            .columns()
            .iter()
            .find(|c| c.source == *name || c.name == *name)
            .map(|c| c.name.clone());
        match label {
            Some(label) => {
                table.drop_column(&label)?;
            }
            None => missing.push(name.clone()),
        }
    }
    Ok(missing)
}

/// Rewrite every non-link column label to its display form.
pub fn rewrite_labels(table: &mut Table) -> Result<()> {
    let labels: Vec<String> = table
        .columns()
        .iter()
        .map(|c| match c.kind {
            ColumnKind::Link => c.name.clone(),
            _ => display_label(&c.name),
        })
        .collect();

    let mut seen = HashSet::new();
    if let Some(dup) = labels.iter().find(|l| !seen.insert(l.as_str())) {
        return Err(TableError::DuplicateColumn(dup.clone()).into());
    }

    for (index, label) in labels.into_iter().enumerate() {
        if let Some(column) = table.column_mut(index) {
            column.name = label;
        }
    }
    Ok(())
}

/// Display label for a raw column name.
///
/// Underscores become spaces, the result is title-cased, and fixed synonyms
/// are substituted. Applying it to its own output is a no-op.
pub fn display_label(name: &str) -> String {
    if LABEL_SYNONYMS.iter().any(|(_, to)| *to == name) {
        return name.to_string();
    }
    let titled = title_case(&name.replace('_', " "));
    LABEL_SYNONYMS
        .iter()
        .find(|(from, _)| *from == titled)
        .map(|(_, to)| to.to_string())
        .unwrap_or(titled)
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

/// Reformat timestamp columns to [`TIMESTAMP_DISPLAY_FORMAT`].
///
/// A column qualifies when it is typed as a timestamp, when its source name
/// is listed in `annotated`, or when its label is one of
/// [`TIMESTAMP_LABELS`]. Returns the number of columns formatted.
pub fn format_timestamps(table: &mut Table, annotated: &[String]) -> Result<usize> {
    let targets: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind != ColumnKind::Link)
        .filter(|(_, c)| {
            c.kind == ColumnKind::Timestamp
                || annotated.iter().any(|a| *a == c.source)
                || TIMESTAMP_LABELS.contains(&c.name.as_str())
        })
        .map(|(i, _)| i)
        .collect();

    for &index in &targets {
        let label = table.columns()[index].name.clone();
        table.try_map_column(index, |value| format_timestamp_value(&label, value))?;
        if let Some(column) = table.column_mut(index) {
            column.kind = ColumnKind::Timestamp;
        }
    }
    Ok(targets.len())
}

fn format_timestamp_value(column: &str, value: &Value) -> Result<Value> {
    let unparseable = || ReportError::UnparseableTimestamp {
        column: column.to_string(),
        value: value.to_string(),
    };
    let ts = match value {
        Value::Null => return Ok(Value::Null),
        Value::Timestamp(ts) => *ts,
        Value::Text(s) => parse_timestamp(s).ok_or_else(unparseable)?,
        Value::Integer(epoch) => from_epoch(*epoch).ok_or_else(unparseable)?,
        Value::Float(_) | Value::Link(_) => {
            return Err(ReportError::UnsupportedValue {
                column: column.to_string(),
                value: value.to_string(),
            })
        }
    };
    Ok(Value::Text(ts.format(TIMESTAMP_DISPLAY_FORMAT).to_string()))
}

/// Parse the timestamp spellings the data source and this pipeline produce.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", TIMESTAMP_DISPLAY_FORMAT]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn from_epoch(epoch: i64) -> Option<NaiveDateTime> {
    let dt = if epoch.unsigned_abs() >= EPOCH_MILLIS_THRESHOLD.unsigned_abs() {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    };
    dt.map(|dt| dt.naive_utc())
}
