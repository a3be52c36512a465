//! Composite report: every rendered section in one HTML document.

use crate::error::Result;
use chrono::{DateTime, Local};
use nr_common::{escape_html, ReportDefinition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What a section's query produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionStatus {
    /// The query returned rows.
    Populated { rows: usize },
    /// The query succeeded with no rows.
    Empty,
    /// The query failed; the section renders empty.
    Failed { reason: String },
}

impl fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionStatus::Populated { rows: 1 } => write!(f, "1 row"),
            SectionStatus::Populated { rows } => write!(f, "{rows} rows"),
            SectionStatus::Empty => write!(f, "no rows"),
            SectionStatus::Failed { .. } => write!(f, "no data available"),
        }
    }
}

/// One rendered report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub output_id: String,
    /// Rendered `<table>` fragment; empty when the query failed.
    pub html: String,
    pub status: SectionStatus,
}

impl ReportSection {
    pub fn new(definition: &ReportDefinition, html: String, status: SectionStatus) -> Self {
        Self {
            title: definition.title.clone(),
            output_id: definition.output_id.clone(),
            html,
            status,
        }
    }

    /// Heading plus table, as embedded in the composite document.
    pub fn to_html(&self) -> String {
        format!(
            "<h3>{}</h3>\n{}\n<br>",
            escape_html(&self.title),
            self.html
        )
    }

    /// Write the table fragment to `<dir>/<output_id>.html`, replacing any
    /// previous file.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.html", self.output_id));
        std::fs::write(&path, &self.html)?;
        debug!(path = %path.display(), bytes = self.html.len(), "Report file written");
        Ok(path)
    }
}

/// All sections of one run, in definition order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeReport {
    pub sections: Vec<ReportSection>,
    pub generated_at: DateTime<Local>,
    /// Server the reports were generated for (the link base URL).
    pub server_url: Option<String>,
}

impl CompositeReport {
    pub fn new(server_url: Option<String>) -> Self {
        Self {
            sections: Vec::new(),
            generated_at: Local::now(),
            server_url,
        }
    }

    pub fn push(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    /// Sections whose query failed.
    pub fn failed_sections(&self) -> impl Iterator<Item = &ReportSection> {
        self.sections
            .iter()
            .filter(|s| matches!(s.status, SectionStatus::Failed { .. }))
    }

    /// The full HTML email body.
    pub fn render_document(&self) -> String {
        let sections = self
            .sections
            .iter()
            .map(ReportSection::to_html)
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Nightly Report</title>
    <style>
        body {{ font-family: Arial, Helvetica, sans-serif; color: #111827; }}
        table.dataframe {{ border-collapse: collapse; margin-bottom: 0.5rem; }}
        table.dataframe th, table.dataframe td {{ border: 1px solid #d1d5db; padding: 4px 8px; }}
        table.dataframe th {{ background-color: #f3f4f6; }}
        .meta {{ color: #6b7280; font-size: 0.875rem; }}
    </style>
</head>
<body>
    <p>Hi Team,</p>
    <p>Here is the nightly report:</p>
{sections}
    <p class="meta">Generated: {generated_at} | Server: {server}</p>
    <p>Regards,<br>Your Automation Script</p>
</body>
</html>
"#,
            generated_at = self.generated_at.format("%d %b %Y %H:%M:%S"),
            server = escape_html(self.server_url.as_deref().unwrap_or("not configured")),
        )
    }

    /// Plain-text fallback body.
    pub fn plain_text_summary(&self) -> String {
        let mut text = String::from("This email contains the nightly database report.\n\n");
        for section in &self.sections {
            text.push_str(&format!("- {}: {}\n", section.title, section.status));
        }
        text.push_str(&format!(
            "\nGenerated: {}\n",
            self.generated_at.format("%d %b %Y %H:%M:%S")
        ));
        text
    }
}
