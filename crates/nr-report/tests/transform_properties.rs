//! Property-based tests for the transform pipeline and renderer.

use nr_common::{Column, ColumnKind, ReportDefinition, Table, Value};
use nr_config::Configuration;
use nr_report::transform::{drop_columns, QUERY_LINK_PATH, URL_COLUMN};
use nr_report::{display_label, render_table, transform};
use proptest::prelude::*;
use std::collections::BTreeSet;

const BASE_URL: &str = "https://os.example.org/openspecimen/";

fn config_with_url() -> Configuration {
    Configuration::from_json_str(&format!(r#"{{"url": "{BASE_URL}"}}"#)).unwrap()
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<i32>().prop_map(|i| Value::Integer(i as i64)),
        "[ -~]{0,12}".prop_map(Value::Text),
    ]
}

/// Tables with unique snake_case column names and 0..8 rows.
fn table_strategy() -> impl Strategy<Value = Table> {
    prop::collection::btree_set("[a-z]{1,6}(_[a-z]{1,6})?", 0..6).prop_flat_map(|names| {
        let names: Vec<String> = names.into_iter().collect();
        let width = names.len();
        prop::collection::vec(prop::collection::vec(value_strategy(), width), 0..8).prop_map(
            move |rows| {
                let columns = names
                    .iter()
                    .map(|n| Column::new(n.clone(), ColumnKind::Text))
                    .collect();
                Table::from_rows(columns, rows).expect("generated rows match width")
            },
        )
    })
}

fn definition() -> ReportDefinition {
    ReportDefinition::new("Generated", "select 1", "generated")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Rendered body rows match table rows; header cells match final columns.
    #[test]
    fn render_counts_match_table(table in table_strategy()) {
        let out = transform(table.clone(), &definition(), &config_with_url());
        let html = render_table(&out);

        prop_assert_eq!(out.row_count(), table.row_count());
        if out.column_count() == 0 {
            prop_assert!(html.is_empty());
        } else {
            prop_assert_eq!(html.matches("<tr>").count(), out.row_count());
            prop_assert_eq!(html.matches("<th>").count(), out.column_count());
        }
    }

    /// Rewriting an already rewritten label changes nothing.
    #[test]
    fn label_rewrite_is_idempotent(raw in "[a-zA-Z_ ]{0,20}") {
        let once = display_label(&raw);
        prop_assert_eq!(display_label(&once), once.clone());
        prop_assert!(!once.contains('_'));
    }

    /// Every non-null query id becomes exactly `base + addedit?queryId= + id`.
    #[test]
    fn links_follow_query_ids(ids in prop::collection::vec(prop::option::of(1i64..1_000_000), 0..10)) {
        let rows = ids
            .iter()
            .map(|id| vec![id.map(Value::Integer).unwrap_or(Value::Null), Value::text("n")])
            .collect();
        let table = Table::from_rows(
            vec![
                Column::new("query_id", ColumnKind::Numeric),
                Column::new("name", ColumnKind::Text),
            ],
            rows,
        )
        .unwrap();

        let out = transform(table, &definition(), &config_with_url());
        let url = out.column_index(URL_COLUMN).expect("URL column injected");
        prop_assert_eq!(url, out.column_count() - 1);

        for (id, value) in ids.iter().zip(out.column_values(url)) {
            match (id, value) {
                (Some(id), Value::Link(anchor)) => {
                    prop_assert_eq!(&anchor.href, &format!("{BASE_URL}{QUERY_LINK_PATH}{id}"));
                }
                (None, Value::Null) => {}
                (id, value) => prop_assert!(false, "id {:?} produced {:?}", id, value),
            }
        }
    }

    /// Dropping a name that is not a column leaves the data untouched.
    #[test]
    fn dropping_absent_column_is_noop(table in table_strategy()) {
        let names: BTreeSet<String> = table.column_names().map(str::to_string).collect();
        let absent = "not_a_column_name_at_all".to_string();
        prop_assume!(!names.contains(&absent));

        let mut dropped = table.clone();
        let missing = drop_columns(&mut dropped, &[absent.clone()]).unwrap();
        prop_assert_eq!(missing, vec![absent]);
        prop_assert_eq!(dropped, table);
    }
}
