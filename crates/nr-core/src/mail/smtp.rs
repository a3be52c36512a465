//! SMTP delivery over STARTTLS via lettre.

use super::{DispatchError, DispatchFailure, MailTransport, OutgoingEmail};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::Error as SmtpError;
use lettre::{Message, SmtpTransport, Transport};
use nr_config::{Configuration, SmtpSettings};
use std::io;
use tracing::debug;

const AUTH_CODES: [u16; 4] = [530, 534, 535, 538];
/// Mailbox rejections. lettre reports only the reply code, not the command
/// that drew it, and stops at the first refused RCPT; a single bad address
/// among valid ones is therefore reported as refused recipients too.
const REFUSED_CODES: [u16; 3] = [550, 551, 553];
const SERVICE_CLOSING: u16 = 421;

/// Authenticated STARTTLS relay built from configuration.
pub struct SmtpMailer {
    settings: Result<SmtpSettings, String>,
}

impl SmtpMailer {
    /// Missing settings are not an error here; delivery reports them as
    /// [`DispatchFailure::NotConfigured`].
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            settings: config.smtp_settings().map_err(|err| err.to_string()),
        }
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, DispatchError> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&email.from)?)
            .subject(email.subject.clone());
        for to in &email.to {
            builder = builder.to(parse_mailbox(to)?);
        }
        builder
            .multipart(MultiPart::alternative_plain_html(
                email.text_body.clone(),
                email.html_body.clone(),
            ))
            .map_err(|err| DispatchError::new(DispatchFailure::Unexpected, err.to_string()))
    }
}

impl MailTransport for SmtpMailer {
    fn deliver(&self, email: &OutgoingEmail) -> Result<(), DispatchError> {
        let settings = self
            .settings
            .as_ref()
            .map_err(|msg| DispatchError::new(DispatchFailure::NotConfigured, msg.clone()))?;
        let message = self.build_message(email)?;

        debug!(server = %settings.server, port = settings.port, "Opening SMTP session");
        let transport = SmtpTransport::starttls_relay(&settings.server)
            .map_err(|err| classify_smtp_error(&err))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();

        let response = transport
            .send(&message)
            .map_err(|err| classify_smtp_error(&err))?;
        debug!(code = %response.code(), "SMTP server accepted message");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DispatchError> {
    address.parse::<Mailbox>().map_err(|err| {
        DispatchError::new(
            DispatchFailure::Unexpected,
            format!("invalid address '{address}': {err}"),
        )
    })
}

/// Map a lettre error onto a dispatch classification.
pub fn classify_smtp_error(err: &SmtpError) -> DispatchError {
    let code = err
        .status()
        .and_then(|code| code.to_string().parse::<u16>().ok());
    let failure = classify(
        code,
        io_error_kind(err),
        err.is_response() || err.is_client(),
    );
    DispatchError::new(failure, err.to_string())
}

fn io_error_kind(err: &SmtpError) -> Option<io::ErrorKind> {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = inner.source();
    }
    None
}

/// Classify from the reply code, the underlying I/O error kind, and whether
/// the error came from the SMTP conversation itself.
pub fn classify(code: Option<u16>, io_kind: Option<io::ErrorKind>, smtp_level: bool) -> DispatchFailure {
    match code {
        Some(c) if AUTH_CODES.contains(&c) => return DispatchFailure::Authentication,
        Some(c) if REFUSED_CODES.contains(&c) => return DispatchFailure::RecipientsRefused,
        Some(SERVICE_CLOSING) => return DispatchFailure::ServerDisconnected,
        _ => {}
    }

    if matches!(
        io_kind,
        Some(
            io::ErrorKind::UnexpectedEof
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
        )
    ) {
        return DispatchFailure::ServerDisconnected;
    }

    if smtp_level || code.is_some() {
        DispatchFailure::Protocol
    } else {
        DispatchFailure::Unexpected
    }
}
