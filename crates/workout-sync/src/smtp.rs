//! Failure notifications over SMTP.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use workout_core::error::{SyncError, SyncResult};
use workout_core::ports::MailSender;

use crate::config::SmtpConfig;

pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Plain-text message from the configured sender to the configured receiver
    pub fn build_message(&self, subject: &str, body: &str) -> SyncResult<Message> {
        let from: Mailbox = format!("{} <{}>", self.config.sender_name, self.config.sender)
            .parse()
            .map_err(|e| SyncError::connection(format!("invalid from address: {}", e)))?;
        let to: Mailbox = self
            .config
            .receiver
            .parse()
            .map_err(|e| SyncError::connection(format!("invalid to address: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| SyncError::connection(format!("failed to build email: {}", e)))
    }

    fn transport(&self) -> SyncResult<AsyncSmtpTransport<Tokio1Executor>> {
        let creds = Credentials::new(self.config.sender.clone(), self.config.password.clone());

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
                .map_err(|e| SyncError::connection(format!("SMTP STARTTLS error: {}", e)))?
                .port(self.config.port)
                .credentials(creds)
                .build(),
        )
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, subject: &str, body: &str) -> SyncResult<()> {
        let email = self.build_message(subject, body)?;
        let transport = self.transport()?;

        transport.send(email).await.map_err(|e| {
            tracing::error!("Error sending message via {}: {}", self.config.host, e);
            SyncError::connection(format!("SMTP send error: {}", e))
        })?;

        tracing::info!(to = %self.config.receiver, subject = %subject, "email sent");
        Ok(())
    }
}
