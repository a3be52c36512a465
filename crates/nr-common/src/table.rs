//! In-memory tabular result sets.
//!
//! A [`Table`] is an ordered list of typed [`Column`]s plus row-major values.
//! Every row holds exactly one [`Value`] per column, in column order; the
//! construction APIs refuse anything that would break that.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when a table operation would violate the column/row shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("row has {actual} values but table has {expected} columns")]
    RowWidthMismatch { expected: usize, actual: usize },

    #[error("column '{column}' has {actual} values but table has {expected} rows")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("no such column: {0}")]
    UnknownColumn(String),
}

/// Semantic type of a column, used to dispatch formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    #[default]
    Text,
    Timestamp,
    Link,
}

/// A single column: the display label, the name the data source returned,
/// and its semantic kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Display label. Starts equal to `source` and is rewritten by the
    /// transform pipeline.
    pub name: String,
    /// Name as returned by the query; never rewritten.
    pub source: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        let name = name.into();
        Self {
            source: name.clone(),
            name,
            kind,
        }
    }
}

/// Hyperlink cell content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub href: String,
    pub label: String,
}

impl Anchor {
    pub fn new(href: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            label: label.into(),
        }
    }

    /// Render as an HTML anchor tag. The href and label are escaped; the tag
    /// itself is meant to be emitted verbatim.
    pub fn to_html(&self) -> String {
        format!(
            r#"<a href="{}" target="_blank">{}</a>"#,
            escape_html(&self.href),
            escape_html(&self.label)
        )
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Link(Anchor),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::Link(anchor) => f.write_str(&anchor.href),
        }
    }
}

/// Ordered columns plus row-major values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A table with the given columns and no rows.
    pub fn with_columns(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut table = Self::empty();
        for column in columns {
            if table.column_index(&column.name).is_some() {
                return Err(TableError::DuplicateColumn(column.name));
            }
            table.columns.push(column);
        }
        Ok(table)
    }

    /// Build a table in one go, validating every row's width.
    pub fn from_rows(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        let mut table = Self::with_columns(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidthMismatch {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// True when the table has no columns at all (failed or absent result).
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_mut(&mut self, index: usize) -> Option<&mut Column> {
        self.columns.get_mut(index)
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Rewrite every value of one column in place. The first error aborts
    /// and leaves already-visited cells rewritten; callers that need
    /// atomicity work on a clone.
    pub fn try_map_column<E>(
        &mut self,
        index: usize,
        mut f: impl FnMut(&Value) -> Result<Value, E>,
    ) -> Result<(), E> {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(index) {
                *cell = f(cell)?;
            }
        }
        Ok(())
    }

    /// Append a column at the end. `values` must have one entry per row.
    pub fn append_column(&mut self, column: Column, values: Vec<Value>) -> Result<(), TableError> {
        if self.column_index(&column.name).is_some() {
            return Err(TableError::DuplicateColumn(column.name));
        }
        if values.len() != self.rows.len() {
            return Err(TableError::ColumnLengthMismatch {
                column: column.name,
                expected: self.rows.len(),
                actual: values.len(),
            });
        }
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        self.columns.push(column);
        Ok(())
    }

    /// Remove a column (and its cells) by display name.
    pub fn drop_column(&mut self, name: &str) -> Result<Column, TableError> {
        let index = self
            .column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))?;
        for row in &mut self.rows {
            row.remove(index);
        }
        Ok(self.columns.remove(index))
    }

    /// Rename a column, keeping names unique.
    pub fn rename_column(&mut self, index: usize, name: String) -> Result<(), TableError> {
        if let Some(existing) = self.column_index(&name) {
            if existing != index {
                return Err(TableError::DuplicateColumn(name));
            }
        }
        let column = self
            .columns
            .get_mut(index)
            .ok_or_else(|| TableError::UnknownColumn(format!("#{index}")))?;
        column.name = name;
        Ok(())
    }
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
