//! Email dispatch of the composite report.
//!
//! [`send`] is the dispatcher boundary: it composes one multipart message,
//! hands it to a [`MailTransport`] exactly once, and turns every failure into
//! an [`EmailDispatchResult`]. Nothing past this point can fail the run.

pub mod smtp;

pub use smtp::SmtpMailer;

use chrono::NaiveDate;
use nr_config::Configuration;
use nr_report::CompositeReport;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{error, info};

/// Why a delivery attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchFailure {
    /// The server rejected the credentials.
    Authentication,
    /// The server refused a recipient mailbox (550/551/553). Delivery stops
    /// at the first refusal, so other recipients may have been acceptable.
    RecipientsRefused,
    /// The session dropped mid-conversation.
    ServerDisconnected,
    /// Any other SMTP reply or client-side protocol error.
    Protocol,
    /// Sender, recipients or SMTP settings are missing.
    NotConfigured,
    Unexpected,
}

impl DispatchFailure {
    /// Classification label used in logs and results.
    pub fn classification(&self) -> &'static str {
        match self {
            DispatchFailure::Authentication => "authentication failure",
            DispatchFailure::RecipientsRefused => "recipients refused",
            DispatchFailure::ServerDisconnected => "server disconnected",
            DispatchFailure::Protocol => "smtp protocol error",
            DispatchFailure::NotConfigured => "email not configured",
            DispatchFailure::Unexpected => "unexpected failure",
        }
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.classification())
    }
}

/// A classified delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{failure}: {message}")]
pub struct DispatchError {
    pub failure: DispatchFailure,
    pub message: String,
}

impl DispatchError {
    pub fn new(failure: DispatchFailure, message: impl Into<String>) -> Self {
        Self {
            failure,
            message: message.into(),
        }
    }
}

/// Outcome of the single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDispatchResult {
    pub success: bool,
    pub failure: Option<DispatchFailure>,
    pub message: Option<String>,
}

impl EmailDispatchResult {
    pub fn delivered() -> Self {
        Self {
            success: true,
            failure: None,
            message: None,
        }
    }

    pub fn failed(err: DispatchError) -> Self {
        Self {
            success: false,
            failure: Some(err.failure),
            message: Some(err.message),
        }
    }

    /// Classification label of the failure, if any.
    pub fn classification(&self) -> Option<&'static str> {
        self.failure.as_ref().map(DispatchFailure::classification)
    }
}

/// A fully composed message, independent of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Delivers composed messages. One call is one attempt.
pub trait MailTransport {
    fn deliver(&self, email: &OutgoingEmail) -> Result<(), DispatchError>;
}

/// Subject line for a report generated on `date`.
pub fn subject_for(date: NaiveDate) -> String {
    format!("Nightly Report - {}", date.format("%Y-%m-%d"))
}

/// Compose the message for `composite` from the configured addresses.
pub fn compose(
    composite: &CompositeReport,
    config: &Configuration,
) -> Result<OutgoingEmail, DispatchError> {
    let from = config
        .sender
        .clone()
        .ok_or_else(|| DispatchError::new(DispatchFailure::NotConfigured, "no sender address (emailid)"))?;
    if config.recipients().is_empty() {
        return Err(DispatchError::new(
            DispatchFailure::NotConfigured,
            "no recipient addresses (to_emailid)",
        ));
    }

    Ok(OutgoingEmail {
        from,
        to: config.recipients().to_vec(),
        subject: subject_for(composite.generated_at.date_naive()),
        text_body: composite.plain_text_summary(),
        html_body: composite.render_document(),
    })
}

/// Compose and deliver `composite`. Never fails; see [`EmailDispatchResult`].
pub fn send(
    composite: &CompositeReport,
    config: &Configuration,
    transport: &dyn MailTransport,
) -> EmailDispatchResult {
    let outcome = compose(composite, config).and_then(|email| {
        transport.deliver(&email)?;
        Ok(email)
    });

    match outcome {
        Ok(email) => {
            info!(
                recipients = email.to.len(),
                subject = %email.subject,
                "Email sent successfully"
            );
            EmailDispatchResult::delivered()
        }
        Err(err) => {
            error!(
                classification = err.failure.classification(),
                error = %err.message,
                "Email dispatch failed"
            );
            EmailDispatchResult::failed(err)
        }
    }
}
