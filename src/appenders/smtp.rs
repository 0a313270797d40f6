//! SMTP appender: one mail per record

use crate::core::{Appender, LogRecord, LoggerError, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;

/// Default SMTP port
pub const SMTP_PORT: u16 = 25;

/// Where and how mails are delivered
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub subject: String,
    /// `(username, password)`
    pub credentials: Option<(String, String)>,
    /// Upgrade the connection with STARTTLS
    pub secure: bool,
    pub timeout: Duration,
}

impl SmtpSettings {
    /// Parse the sender and recipient addresses
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a malformed address or an empty
    /// recipient list
    pub fn new(
        host: impl Into<String>,
        port: u16,
        from: &str,
        to: &[String],
        subject: impl Into<String>,
    ) -> Result<Self> {
        if to.is_empty() {
            return Err(LoggerError::config("toaddrs", "at least one recipient is required"));
        }
        let to = to.iter().map(|addr| parse_mailbox("toaddrs", addr)).collect::<Result<_>>()?;
        Ok(Self {
            host: host.into(),
            port,
            from: parse_mailbox("fromaddr", from)?,
            to,
            subject: subject.into(),
            credentials: None,
            secure: false,
            timeout: Duration::from_secs(1),
        })
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn parse_mailbox(field: &str, address: &str) -> Result<Mailbox> {
    address
        .parse::<Mailbox>()
        .map_err(|e| LoggerError::config(field, format!("invalid address '{}': {}", address, e)))
}

/// Mails every record to a fixed recipient list
pub struct SmtpAppender {
    settings: SmtpSettings,
    transport: SmtpTransport,
}

impl SmtpAppender {
    /// Build the transport. No connection is made until the first record.
    ///
    /// # Errors
    ///
    /// Returns a construction error if the TLS relay cannot be set up
    pub fn new(settings: SmtpSettings) -> Result<Self> {
        let builder = if settings.secure {
            SmtpTransport::starttls_relay(&settings.host).map_err(|e| {
                LoggerError::construction(
                    "SMTPHandler",
                    format!("cannot set up STARTTLS for {}", settings.host),
                    std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                )
            })?
        } else {
            SmtpTransport::builder_dangerous(&settings.host)
        };

        let mut builder = builder.port(settings.port).timeout(Some(settings.timeout));
        if let Some((username, password)) = &settings.credentials {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            settings,
        })
    }

    pub fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    fn message(&self, body: &str) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.settings.from.clone())
            .subject(self.settings.subject.clone())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.settings.to {
            builder = builder.to(recipient.clone());
        }
        builder
            .body(body.to_string())
            .map_err(|e| LoggerError::writer(format!("cannot build mail: {}", e)))
    }
}

impl Appender for SmtpAppender {
    fn append(&mut self, _record: &LogRecord, formatted: &str) -> Result<()> {
        let message = self.message(formatted)?;
        self.transport.send(&message).map_err(|e| {
            LoggerError::writer(format!(
                "failed to send mail via {}:{}: {}",
                self.settings.host, self.settings.port, e
            ))
        })?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "SMTPHandler"
    }
}
