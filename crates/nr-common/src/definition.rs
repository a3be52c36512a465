//! Report definitions: a titled query plus its output target and column rules.

use serde::{Deserialize, Serialize};

/// One report in the nightly run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDefinition {
    /// Section heading in the composite document.
    pub title: String,
    /// Query text sent verbatim to the data source.
    pub query: String,
    /// File stem / label for the per-report HTML file.
    pub output_id: String,
    /// Columns (by source name) removed after link injection.
    #[serde(default)]
    pub drop_columns: Vec<String>,
    /// Columns (by source name) to format as timestamps even when the data
    /// source reports them as text.
    #[serde(default)]
    pub timestamp_columns: Vec<String>,
}

impl ReportDefinition {
    pub fn new(
        title: impl Into<String>,
        query: impl Into<String>,
        output_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            query: query.into(),
            output_id: output_id.into(),
            drop_columns: Vec::new(),
            timestamp_columns: Vec::new(),
        }
    }

    pub fn with_drop_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drop_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timestamp_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.timestamp_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// File name of the per-report HTML output.
    pub fn file_name(&self) -> String {
        format!("{}.html", self.output_id)
    }
}

const SLOWEST_QUERIES: &str = "\
select concat(first_name, ' ', last_name) as user, time_to_finish as time_taken, \
time_of_exec as Date \
from catissue_query_audit_logs logs \
join catissue_user usr on logs.run_by = usr.identifier \
order by time_to_finish desc limit 5";

const MOST_RUN_SAVED_QUERIES: &str = "\
select logs.query_id, concat(first_name, ' ', last_name) as name, run_by, count(*) as cnt, \
max(time_of_exec) as Date, max(time_to_finish) as time_taken \
from catissue_query_audit_logs logs \
join catissue_user usr on logs.run_by = usr.identifier \
where logs.query_id is not null \
group by logs.query_id, name, run_by \
order by cnt desc limit 5";

const USERS_RUNNING_MOST_QUERIES: &str = "\
select concat(first_name, ' ', last_name) as name, run_by, count(*) as cnt, \
max(time_of_exec) as Date, max(time_to_finish) as time_taken \
from catissue_query_audit_logs logs \
join catissue_user usr on usr.identifier = logs.run_by \
group by run_by, name \
order by cnt desc limit 5";

const SLOWEST_API_CALLS: &str = "\
select concat(usr.first_name, ' ', usr.last_name) as user, logs.url as endpoint, logs.method, \
timestampdiff(second, logs.call_start_time, logs.call_end_time) as time_taken, \
logs.call_start_time, logs.call_end_time \
from os_user_api_calls_log logs \
join catissue_user usr on logs.user_id = usr.identifier \
order by time_taken desc limit 5";

/// The reports produced when the configuration does not supply its own list.
pub fn builtin_definitions() -> Vec<ReportDefinition> {
    vec![
        ReportDefinition::new(
            "Top 5 slowest running queries",
            SLOWEST_QUERIES,
            "slowest_running_queries",
        ),
        ReportDefinition::new(
            "Top 5 most run saved queries",
            MOST_RUN_SAVED_QUERIES,
            "most_run_saved_queries",
        )
        .with_drop_columns(["query_id", "run_by"]),
        ReportDefinition::new(
            "Top 5 users running most queries",
            USERS_RUNNING_MOST_QUERIES,
            "users_running_most_queries",
        )
        .with_drop_columns(["run_by"]),
        ReportDefinition::new(
            "Top 5 slowest API calls",
            SLOWEST_API_CALLS,
            "slowest_api_calls",
        ),
    ]
}
