//! The run configuration value.

use crate::error::ConfigError;
use crate::{DEFAULT_DB_PORT, DEFAULT_SMTP_PORT};
use nr_common::ReportDefinition;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// Settings for one nightly run.
///
/// Every key is optional at parse time; components that need a key ask for
/// a typed view ([`Configuration::database_settings`],
/// [`Configuration::smtp_settings`]) and handle its absence themselves.
#[derive(Clone, Default, Deserialize)]
pub struct Configuration {
    pub host: Option<String>,
    #[serde(default, deserialize_with = "deserialize_port")]
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,

    /// Sender address; also the SMTP login when `smtp_username` is absent.
    #[serde(rename = "emailid")]
    pub sender: Option<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    /// Legacy spelling of `smtp_password`; used only when that key is absent.
    pub emailpassword: Option<String>,
    #[serde(rename = "to_emailid", default, deserialize_with = "deserialize_recipients")]
    pub recipients: Vec<String>,
    pub smtp_server: Option<String>,
    #[serde(default, deserialize_with = "deserialize_port")]
    pub smtp_port: Option<u16>,

    /// Base for report hyperlinks, e.g. `https://os.example.org/openspecimen/`.
    #[serde(rename = "url")]
    pub base_url: Option<String>,

    pub output_dir: Option<PathBuf>,

    /// Replaces the built-in report set when present.
    pub reports: Option<Vec<ReportDefinition>>,
}

/// Connection parameters for the data source.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Everything needed to open an authenticated SMTP session.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("sender", &self.sender)
            .finish()
    }
}

impl Configuration {
    /// Load and normalize a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Configuration =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(config.normalized())
    }

    /// Parse from a JSON string (used by tests and embedded configs).
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Configuration>(json).map(Configuration::normalized)
    }

    /// Blank strings count as absent.
    fn normalized(mut self) -> Self {
        for field in [
            &mut self.host,
            &mut self.user,
            &mut self.database,
            &mut self.sender,
            &mut self.smtp_username,
            &mut self.smtp_server,
            &mut self.base_url,
        ] {
            if let Some(value) = field.take() {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    *field = Some(trimmed.to_string());
                }
            }
        }
        self.recipients.retain(|r| !r.is_empty());
        self
    }

    /// Base URL for report hyperlinks, if configured.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Directory the per-report HTML files go to.
    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or_else(|| Path::new("."))
    }

    pub fn database_settings(&self) -> Result<DatabaseSettings, ConfigError> {
        Ok(DatabaseSettings {
            host: required(&self.host, "host")?,
            port: self.port.unwrap_or(DEFAULT_DB_PORT),
            user: required(&self.user, "user")?,
            password: self.password.clone().unwrap_or_default(),
            database: required(&self.database, "database")?,
        })
    }

    pub fn smtp_settings(&self) -> Result<SmtpSettings, ConfigError> {
        let sender = required(&self.sender, "emailid")?;
        let username = self.smtp_username.clone().unwrap_or_else(|| sender.clone());
        Ok(SmtpSettings {
            server: required(&self.smtp_server, "smtp_server")?,
            port: self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
            username,
            password: required(
                &self.smtp_password.clone().or_else(|| self.emailpassword.clone()),
                "smtp_password",
            )?,
            sender,
        })
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("sender", &self.sender)
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("recipients", &self.recipients)
            .field("base_url", &self.base_url)
            .field("output_dir", &self.output_dir)
            .field("reports", &self.reports.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

fn required(value: &Option<String>, field: &str) -> Result<String, ConfigError> {
    value
        .clone()
        .ok_or_else(|| ConfigError::MissingField(field.to_string()))
}

/// Ports may be written as a number or a numeric string.
fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u16),
        Text(String),
    }

    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(port)) => Ok(Some(port)),
        Some(NumberOrText::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(text)) => text.trim().parse::<u16>().map(Some).map_err(|_| {
            serde::de::Error::custom(format!("invalid port '{text}': expected 0-65535"))
        }),
    }
}

/// `to_emailid` may be one address, a comma-separated list, or an array.
fn deserialize_recipients<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let raw = Option::<OneOrMany>::deserialize(deserializer)?;
    let list = match raw {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => s.split(',').map(|r| r.trim().to_string()).collect(),
        Some(OneOrMany::Many(v)) => v.into_iter().map(|r| r.trim().to_string()).collect(),
    };
    Ok(list)
}
