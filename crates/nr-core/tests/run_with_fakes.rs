//! End-to-end runs against in-memory fakes.
//!
//! The fake connector serves canned tables keyed by query text, and counts
//! connects and closes so the connection lifetime can be asserted.

use nr_common::{Column, ColumnKind, ReportDefinition, Table, Value};
use nr_config::Configuration;
use nr_core::mail::{DispatchError, DispatchFailure, MailTransport, OutgoingEmail};
use nr_core::source::{ConnectionError, Connector, DataSource, QueryError};
use nr_core::{build_composite, run, ExitCode, RunOptions};
use nr_report::SectionStatus;
use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

const SLOW_QUERY: &str = "SELECT user, time_taken, query_start_time FROM slow";
const SAVED_QUERY: &str = "SELECT query_id, name, cnt FROM saved";
const MALFORMED: &str = "SELEC * FORM nowhere";
const PANICS: &str = "-- trigger a panic";

#[derive(Default)]
struct Counters {
    connects: Cell<usize>,
    closes: Cell<usize>,
    queries: RefCell<Vec<String>>,
}

struct FakeConnector {
    counters: Rc<Counters>,
    refuse: bool,
}

impl FakeConnector {
    fn new() -> Self {
        Self {
            counters: Rc::new(Counters::default()),
            refuse: false,
        }
    }

    fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new()
        }
    }
}

struct FakeSource {
    counters: Rc<Counters>,
}

impl Connector for FakeConnector {
    type Source = FakeSource;

    fn connect(&self, _config: &Configuration) -> Result<FakeSource, ConnectionError> {
        self.counters.connects.set(self.counters.connects.get() + 1);
        if self.refuse {
            return Err(ConnectionError::Connect {
                host: "db.internal".into(),
                port: 3306,
                database: "os".into(),
                message: "Access denied for user 'report'".into(),
            });
        }
        Ok(FakeSource {
            counters: self.counters.clone(),
        })
    }
}

impl DataSource for FakeSource {
    fn query(&mut self, sql: &str) -> Result<Table, QueryError> {
        self.counters.queries.borrow_mut().push(sql.to_string());
        match sql {
            SLOW_QUERY => Ok(Table::from_rows(
                vec![
                    Column::new("user", ColumnKind::Text),
                    Column::new("time_taken", ColumnKind::Numeric),
                    Column::new("query_start_time", ColumnKind::Timestamp),
                ],
                vec![vec![
                    Value::text("ann"),
                    Value::Float(12.5),
                    Value::text("2026-10-17 22:04:11"),
                ]],
            )?),
            SAVED_QUERY => Ok(Table::from_rows(
                vec![
                    Column::new("query_id", ColumnKind::Numeric),
                    Column::new("name", ColumnKind::Text),
                    Column::new("cnt", ColumnKind::Numeric),
                ],
                vec![
                    vec![Value::Integer(7), Value::text("Daily users"), Value::Integer(40)],
                    vec![Value::Null, Value::text("Ad hoc"), Value::Integer(3)],
                ],
            )?),
            PANICS => panic!("driver bug"),
            _ => Err(QueryError::Execution(
                "You have an error in your SQL syntax".into(),
            )),
        }
    }

    fn close(&mut self) -> Result<(), QueryError> {
        self.counters.closes.set(self.counters.closes.get() + 1);
        Ok(())
    }
}

#[derive(Default)]
struct FakeMailer {
    sent: RefCell<Vec<OutgoingEmail>>,
    reply: Option<DispatchFailure>,
}

impl MailTransport for FakeMailer {
    fn deliver(&self, email: &OutgoingEmail) -> Result<(), DispatchError> {
        self.sent.borrow_mut().push(email.clone());
        match self.reply {
            Some(failure) => Err(DispatchError::new(failure, "535 5.7.8 Bad credentials")),
            None => Ok(()),
        }
    }
}

fn config(with_url: bool) -> Configuration {
    let url = if with_url {
        r#""url": "https://os.example.org/","#
    } else {
        ""
    };
    Configuration::from_json_str(&format!(
        r#"{{
            "host": "db.internal", "user": "report", "database": "os",
            {url}
            "emailid": "reports@example.org",
            "to_emailid": ["ops@example.org"]
        }}"#
    ))
    .unwrap()
}

fn slow_and_bad() -> Vec<ReportDefinition> {
    vec![
        ReportDefinition::new("Slow queries", SLOW_QUERY, "slow_queries"),
        ReportDefinition::new("Bad report", MALFORMED, "bad_report"),
    ]
}

#[test]
fn malformed_query_does_not_stop_the_run() {
    let connector = FakeConnector::new();
    let mailer = FakeMailer::default();
    let outcome = run(
        &config(true),
        &slow_and_bad(),
        &connector,
        Some(&mailer),
        &RunOptions::default(),
    )
    .unwrap();

    let sections = &outcome.report.sections;
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].status, SectionStatus::Populated { rows: 1 });
    assert!(sections[0].html.contains("<th>Time Taken (in seconds)</th>"));
    assert!(matches!(sections[1].status, SectionStatus::Failed { .. }));
    assert!(sections[1].html.is_empty());

    let dispatch = outcome.dispatch.as_ref().unwrap();
    assert!(dispatch.success);
    assert_eq!(outcome.exit_code(), ExitCode::Clean);
    assert_eq!(mailer.sent.borrow().len(), 1);
    assert!(mailer.sent.borrow()[0].html_body.contains("<h3>Bad report</h3>"));
}

#[test]
fn one_connection_closed_once() {
    let connector = FakeConnector::new();
    build_composite(&connector, &slow_and_bad(), &config(true), None).unwrap();

    assert_eq!(connector.counters.connects.get(), 1);
    assert_eq!(connector.counters.closes.get(), 1);
    assert_eq!(
        *connector.counters.queries.borrow(),
        vec![SLOW_QUERY.to_string(), MALFORMED.to_string()]
    );
}

#[test]
fn connection_failure_aborts_before_any_report() {
    let out = tempfile::tempdir().unwrap();
    let connector = FakeConnector::refusing();
    let mailer = FakeMailer::default();
    let options = RunOptions {
        output_dir: Some(out.path().to_path_buf()),
        send_email: true,
    };

    let err = run(&config(true), &slow_and_bad(), &connector, Some(&mailer), &options)
        .unwrap_err();

    assert_eq!(err.exit_code(), ExitCode::ConnectionError);
    assert!(connector.counters.queries.borrow().is_empty());
    assert!(mailer.sent.borrow().is_empty());
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn panic_mid_run_still_closes_connection() {
    let connector = FakeConnector::new();
    let defs = vec![
        ReportDefinition::new("Slow queries", SLOW_QUERY, "slow_queries"),
        ReportDefinition::new("Explodes", PANICS, "explodes"),
    ];

    let result = catch_unwind(AssertUnwindSafe(|| {
        build_composite(&connector, &defs, &config(true), None)
    }));

    assert!(result.is_err());
    assert_eq!(connector.counters.closes.get(), 1);
}

#[test]
fn auth_failure_reported_files_kept() {
    let out = tempfile::tempdir().unwrap();
    let connector = FakeConnector::new();
    let mailer = FakeMailer {
        reply: Some(DispatchFailure::Authentication),
        ..Default::default()
    };
    let options = RunOptions {
        output_dir: Some(out.path().to_path_buf()),
        send_email: true,
    };

    let outcome = run(&config(true), &slow_and_bad(), &connector, Some(&mailer), &options)
        .unwrap();

    let dispatch = outcome.dispatch.as_ref().unwrap();
    assert!(!dispatch.success);
    assert_eq!(dispatch.classification(), Some("authentication failure"));
    assert_eq!(outcome.exit_code(), ExitCode::DeliveryFailed);

    let slow = std::fs::read_to_string(out.path().join("slow_queries.html")).unwrap();
    assert!(slow.contains("<td>ann</td>"));
    assert!(out.path().join("bad_report.html").exists());
}

#[test]
fn report_files_overwritten_each_run() {
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("slow_queries.html");
    std::fs::write(&path, "stale content from yesterday").unwrap();

    let options = RunOptions {
        output_dir: Some(out.path().to_path_buf()),
        send_email: false,
    };
    let outcome = run(&config(true), &slow_and_bad(), &FakeConnector::new(), None, &options)
        .unwrap();

    assert!(outcome.dispatch.is_none());
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(!written.contains("stale"));
    assert!(written.starts_with("<table"));
}

#[test]
fn query_links_follow_base_url() {
    let defs = vec![ReportDefinition::new("Saved", SAVED_QUERY, "saved")
        .with_drop_columns(["query_id"])];
    let report = build_composite(&FakeConnector::new(), &defs, &config(true), None).unwrap();
    let html = &report.sections[0].html;

    assert!(html.contains(
        r#"<a href="https://os.example.org/addedit?queryId=7" target="_blank">View query</a>"#
    ));
    assert!(html.contains("<th>URL</th>"));
    assert!(html.contains("<th>Number Of Queries</th>"));
    assert!(!html.contains("<th>Query Id</th>"));
    assert_eq!(html.matches("<a href=").count(), 1);
}

#[test]
fn missing_url_skips_link_column() {
    let defs = vec![ReportDefinition::new("Saved", SAVED_QUERY, "saved")];
    let report = build_composite(&FakeConnector::new(), &defs, &config(false), None).unwrap();
    let html = &report.sections[0].html;

    assert!(!html.contains("<th>URL</th>"));
    assert!(!html.contains("<a href="));
    assert!(html.contains("<th>Query Id</th>"));
    assert!(html.contains("<th>Name</th>"));
    assert_eq!(report.server_url, None);
}
