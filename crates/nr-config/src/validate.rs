//! Semantic validation of a loaded configuration.

use crate::error::ConfigError;
use crate::settings::Configuration;
use tracing::warn;

/// Check the keys a run cannot start without.
///
/// Database keys are mandatory. Email and link keys are optional (their
/// absence degrades dispatch or link injection), but when present they must
/// be well-formed.
pub fn validate_for_run(config: &Configuration) -> Result<(), ConfigError> {
    config.database_settings()?;

    if config.smtp_port == Some(0) {
        return Err(ConfigError::InvalidValue {
            field: "smtp_port".to_string(),
            message: "port must be non-zero".to_string(),
        });
    }

    if let Some(bad) = config.recipients().iter().find(|r| !r.contains('@')) {
        return Err(ConfigError::InvalidValue {
            field: "to_emailid".to_string(),
            message: format!("'{bad}' is not an email address"),
        });
    }

    if let Some(sender) = config.sender.as_deref() {
        if !sender.contains('@') {
            return Err(ConfigError::InvalidValue {
                field: "emailid".to_string(),
                message: format!("'{sender}' is not an email address"),
            });
        }
    }

    if let Some(url) = config.base_url() {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "url".to_string(),
                message: "must start with http:// or https://".to_string(),
            });
        }
        if !url.ends_with('/') {
            warn!(url, "url does not end in '/'; query links are appended to it verbatim");
        }
    }

    Ok(())
}
