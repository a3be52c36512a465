//! HTML table rendering.

use nr_common::{escape_html, Table, Value};

/// Render a table as a self-contained `<table>` element.
///
/// One header cell per column, one `<tr>` per row, no index column. Link
/// cells are emitted as anchor tags; everything else is escaped. A table
/// without columns renders to an empty string.
pub fn render_table(table: &Table) -> String {
    if table.is_empty() {
        return String::new();
    }

    let mut html = String::from("<table border=\"1\" class=\"dataframe\">\n");
    html.push_str("  <thead>\n    <tr style=\"text-align: right;\">\n");
    for name in table.column_names() {
        html.push_str(&format!("      <th>{}</th>\n", escape_html(name)));
    }
    html.push_str("    </tr>\n  </thead>\n  <tbody>\n");

    for row in table.rows() {
        html.push_str("    <tr>\n");
        for value in row {
            html.push_str(&format!("      <td>{}</td>\n", render_cell(value)));
        }
        html.push_str("    </tr>\n");
    }

    html.push_str("  </tbody>\n</table>");
    html
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Link(anchor) => anchor.to_html(),
        other => escape_html(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nr_common::{Anchor, Column, ColumnKind};

    #[test]
    fn test_empty_table_renders_nothing() {
        assert_eq!(render_table(&Table::empty()), "");
    }

    #[test]
    fn test_headers_only() {
        let table = Table::with_columns(vec![Column::new("User", ColumnKind::Text)]).unwrap();
        let html = render_table(&table);
        assert!(html.contains("<th>User</th>"));
        assert!(!html.contains("<td>"));
    }

    #[test]
    fn test_escapes_text_but_not_links() {
        let table = Table::from_rows(
            vec![
                Column::new("Name", ColumnKind::Text),
                Column::new("URL", ColumnKind::Link),
            ],
            vec![vec![
                Value::text("<script>alert(1)</script>"),
                Value::Link(Anchor::new("https://x/addedit?queryId=1", "View query")),
            ]],
        )
        .unwrap();
        let html = render_table(&table);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"<a href="https://x/addedit?queryId=1" target="_blank">View query</a>"#));
    }

    #[test]
    fn test_null_renders_empty_cell() {
        let table = Table::from_rows(
            vec![Column::new("Date", ColumnKind::Timestamp)],
            vec![vec![Value::Null]],
        )
        .unwrap();
        assert!(render_table(&table).contains("<td></td>"));
    }
}
