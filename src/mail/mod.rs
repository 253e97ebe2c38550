//! Outbound alert mail over SMTP.

use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::errors::AppError;

/// SMTP mailer. Without SMTP configuration every send is a logged no-op.
pub struct Mailer {
    transport: Option<(AsyncSmtpTransport<Tokio1Executor>, Mailbox)>,
}

impl Mailer {
    /// Build a mailer from configuration.
    pub fn new(config: Option<&SmtpConfig>) -> Result<Self, AppError> {
        let Some(config) = config else {
            return Ok(Self::disabled());
        };

        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid sender address: {}", e)))?;

        let transport = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| AppError::Internal(format!("Invalid SMTP relay: {}", e)))?
                    .port(config.port)
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .build()
            }
            // Unauthenticated relay, e.g. a local MTA
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .build(),
        };

        tracing::info!("Mail alerts via {}:{}", config.host, config.port);
        Ok(Self {
            transport: Some((transport, from)),
        })
    }

    pub fn disabled() -> Self {
        Self { transport: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Send a plain-text mail to every recipient that parses as an address.
    pub async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), AppError> {
        let Some((transport, from)) = &self.transport else {
            tracing::debug!("Mail disabled, dropping {:?}", subject);
            return Ok(());
        };

        let mut builder = Message::builder()
            .from(from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        let mut any = false;
        for recipient in recipients {
            match recipient.parse::<Mailbox>() {
                Ok(mailbox) => {
                    builder = builder.to(mailbox);
                    any = true;
                }
                Err(e) => tracing::warn!("Skipping invalid recipient {:?}: {}", recipient, e),
            }
        }
        if !any {
            return Ok(());
        }

        let message = builder
            .body(body.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to build mail: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| AppError::Upstream(format!("SMTP send failed: {}", e)))?;

        tracing::info!("Sent {:?} to {} recipients", subject, recipients.len());
        Ok(())
    }
}

/// Recipients of an alert: configured addresses plus extras, without duplicates.
pub fn alert_recipients(
    configured: &[String],
    extra: impl IntoIterator<Item = String>,
) -> Vec<String> {
    let mut recipients: Vec<String> = Vec::new();
    for address in configured.iter().cloned().chain(extra) {
        let address = address.trim().to_lowercase();
        if !address.is_empty() && !recipients.contains(&address) {
            recipients.push(address);
        }
    }
    recipients
}
