//! Composite report builder.
//!
//! Runs every definition through execute → transform → render on one shared
//! connection. A failing definition yields an empty section and the loop
//! moves on; only failing to connect stops the build.

use crate::source::{execute, ConnectionError, ConnectionGuard, Connector, DataSource};
use nr_common::ReportDefinition;
use nr_config::Configuration;
use nr_report::{render_table, transform, CompositeReport, ReportSection};
use std::path::Path;
use tracing::{info, info_span, warn};

/// Build the composite for `definitions`, in order.
///
/// When `output_dir` is set, each section's table is written to
/// `<output_dir>/<output_id>.html` as soon as it renders.
pub fn build_composite<C: Connector>(
    connector: &C,
    definitions: &[ReportDefinition],
    config: &Configuration,
    output_dir: Option<&Path>,
) -> Result<CompositeReport, ConnectionError> {
    let mut guard = ConnectionGuard::new(connector.connect(config)?);
    let mut composite = CompositeReport::new(config.base_url().map(str::to_string));

    for definition in definitions {
        let _span = info_span!(
            "report",
            title = %definition.title,
            output_id = %definition.output_id
        )
        .entered();

        let section = build_section(guard.source(), definition, config);
        if let Some(dir) = output_dir {
            if let Err(err) = section.write_to(dir) {
                warn!(error = %err, "Failed to write report file");
            }
        }
        info!(status = %section.status, "Report section built");
        composite.push(section);
    }

    if let Err(err) = guard.close() {
        warn!(error = %err, "Failed to close data source connection");
    }

    let failed = composite.failed_sections().count();
    info!(
        sections = composite.sections.len(),
        failed, "Composite report assembled"
    );
    Ok(composite)
}

/// Execute, transform and render one definition.
pub fn build_section<S: DataSource + ?Sized>(
    source: &mut S,
    definition: &ReportDefinition,
    config: &Configuration,
) -> ReportSection {
    let outcome = execute(source, &definition.query);
    let status = outcome.status();
    let table = transform(outcome.into_table(), definition, config);
    ReportSection::new(definition, render_table(&table), status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::QueryError;
    use nr_common::{Column, ColumnKind, Table, Value};
    use nr_report::SectionStatus;

    struct OneTable;

    impl DataSource for OneTable {
        fn query(&mut self, sql: &str) -> Result<Table, QueryError> {
            match sql {
                "ok" => Ok(Table::from_rows(
                    vec![Column::new("run_count", ColumnKind::Numeric)],
                    vec![vec![Value::Integer(4)], vec![Value::Integer(2)]],
                )?),
                "none" => Ok(Table::with_columns(vec![Column::new(
                    "run_count",
                    ColumnKind::Numeric,
                )])?),
                _ => Err(QueryError::Execution("Unknown column 'x'".into())),
            }
        }

        fn close(&mut self) -> Result<(), QueryError> {
            Ok(())
        }
    }

    #[test]
    fn test_section_populated() {
        let def = ReportDefinition::new("Runs", "ok", "runs");
        let section = build_section(&mut OneTable, &def, &Configuration::default());
        assert_eq!(section.status, SectionStatus::Populated { rows: 2 });
        assert!(section.html.contains("<th>Run Count</th>"));
        assert_eq!(section.html.matches("<td>").count(), 2);
    }

    #[test]
    fn test_section_zero_rows_header_only() {
        let def = ReportDefinition::new("Runs", "none", "runs");
        let section = build_section(&mut OneTable, &def, &Configuration::default());
        assert_eq!(section.status, SectionStatus::Empty);
        assert!(section.html.contains("<th>Run Count</th>"));
        assert!(!section.html.contains("<td>"));
    }

    #[test]
    fn test_section_failed_renders_nothing() {
        let def = ReportDefinition::new("Runs", "bad", "runs");
        let section = build_section(&mut OneTable, &def, &Configuration::default());
        assert!(matches!(section.status, SectionStatus::Failed { .. }));
        assert!(section.html.is_empty());
        assert!(section.to_html().contains("<h3>Runs</h3>"));
    }
}
