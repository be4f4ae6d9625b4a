use anyhow::{Context, Result};
use async_imap::Session;
use async_native_tls::TlsStream;
use async_std::net::TcpStream;
use async_trait::async_trait;
use futures::TryStreamExt;
use workout_core::error::{SyncError, SyncResult};
use workout_core::ports::MailboxReader;
use workout_core::{EmailMessage, Uid};

use crate::config::ImapConfig;

pub struct ImapClient {
    session: Session<TlsStream<TcpStream>>,
}

impl ImapClient {
    pub async fn connect(server: &str, port: u16, email: &str, password: &str) -> Result<Self> {
        let tcp = TcpStream::connect((server, port))
            .await
            .context("Failed to connect to IMAP server")?;

        let tls = async_native_tls::TlsConnector::new();
        let tls_stream = tls
            .connect(server, tcp)
            .await
            .context("TLS handshake failed")?;

        let client = async_imap::Client::new(tls_stream);

        let session = client
            .login(email, password)
            .await
            .map_err(|e| anyhow::anyhow!("Login failed: {}", e.0))?;

        Ok(Self { session })
    }

    /// UIDs of unseen messages whose body contains `needle`, oldest first
    pub async fn search_unseen_containing(&mut self, mailbox: &str, needle: &str) -> Result<Vec<u32>> {
        self.session
            .examine(mailbox)
            .await
            .with_context(|| format!("Failed to examine {}", mailbox))?;

        let query = format!("UNSEEN BODY {}", quote(needle));
        let found = self
            .session
            .uid_search(&query)
            .await
            .context("Failed to search messages")?;

        let mut uids: Vec<u32> = found.into_iter().collect();
        uids.sort_unstable();
        Ok(uids)
    }

    /// Fetch one message without setting \Seen
    pub async fn fetch_message(&mut self, mailbox: &str, uid: u32) -> Result<Option<EmailMessage>> {
        self.session
            .examine(mailbox)
            .await
            .with_context(|| format!("Failed to examine {}", mailbox))?;

        let messages: Vec<_> = self
            .session
            .uid_fetch(uid.to_string(), "(UID BODY.PEEK[])")
            .await
            .context("Failed to fetch message")?
            .try_collect()
            .await?;

        for message in &messages {
            if message.uid != Some(uid) {
                continue;
            }

            if let Some(body) = message.body() {
                let parsed = mailparse::parse_mail(body)
                    .with_context(|| format!("Failed to parse email {}", uid))?;
                return Ok(Some(Self::parse_email(uid, &parsed)));
            }
        }

        Ok(None)
    }

    fn parse_email(uid: u32, parsed: &mailparse::ParsedMail) -> EmailMessage {
        let subject = parsed
            .headers
            .iter()
            .find(|h| h.get_key().eq_ignore_ascii_case("subject"))
            .map(|h| h.get_value())
            .unwrap_or_default();

        EmailMessage {
            uid,
            subject,
            text_body: Self::extract_body(parsed).unwrap_or_default(),
        }
    }

    fn extract_body(parsed: &mailparse::ParsedMail) -> Option<String> {
        // If this part is text/plain, return it
        if parsed.ctype.mimetype == "text/plain" {
            return parsed.get_body().ok();
        }

        // Check subparts for text/plain, including nested multiparts
        for part in &parsed.subparts {
            if part.ctype.mimetype == "text/plain" {
                if let Ok(body) = part.get_body() {
                    return Some(body);
                }
            }
            if part.ctype.mimetype.starts_with("multipart/") {
                if let Some(body) = Self::extract_body(part) {
                    return Some(body);
                }
            }
        }

        // Fallback: try to get any body
        for part in &parsed.subparts {
            if let Ok(body) = part.get_body() {
                return Some(body);
            }
        }

        parsed.get_body().ok()
    }

    pub async fn mark_seen(&mut self, mailbox: &str, uid: u32) -> Result<()> {
        self.session
            .select(mailbox)
            .await
            .with_context(|| format!("Failed to select {}", mailbox))?;

        self.session
            .uid_store(uid.to_string(), "+FLAGS (\\Seen)")
            .await
            .context("Failed to mark message as seen")?
            .try_collect::<Vec<_>>()
            .await?;

        Ok(())
    }

    pub async fn logout(mut self) -> Result<()> {
        self.session.logout().await.context("Failed to logout")?;
        Ok(())
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Mailbox reader that opens a fresh IMAP session per operation
pub struct ImapMailbox {
    config: ImapConfig,
}

impl ImapMailbox {
    pub fn new(config: ImapConfig) -> Self {
        Self { config }
    }

    async fn open(&self) -> SyncResult<ImapClient> {
        ImapClient::connect(
            &self.config.host,
            self.config.port,
            &self.config.username,
            &self.config.password,
        )
        .await
        .map_err(|e| {
            tracing::error!("Error connecting to {}: {:#}", self.config.host, e);
            SyncError::connection(format!("{:#}", e))
        })
    }
}

fn session_error(action: &str, e: anyhow::Error) -> SyncError {
    tracing::error!("IMAP error while trying to {}: {:#}", action, e);
    SyncError::connection(format!("{}: {:#}", action, e))
}

#[async_trait]
impl MailboxReader for ImapMailbox {
    async fn list_unread_candidates(&self, body_contains: &str) -> SyncResult<Vec<Uid>> {
        let mut client = self.open().await?;
        let result = client
            .search_unseen_containing(&self.config.mailbox, body_contains)
            .await;
        client.logout().await.ok();

        result.map_err(|e| session_error("search", e))
    }

    async fn fetch_message(&self, uid: Uid) -> SyncResult<EmailMessage> {
        let mut client = self.open().await?;
        let result = client.fetch_message(&self.config.mailbox, uid).await;
        client.logout().await.ok();

        result
            .map_err(|e| session_error("fetch", e))?
            .ok_or_else(|| SyncError::not_found(format!("message {}", uid)))
    }

    async fn mark_read(&self, uid: Uid) -> SyncResult<()> {
        let mut client = self.open().await?;
        let result = client.mark_seen(&self.config.mailbox, uid).await;
        client.logout().await.ok();

        result.map_err(|e| session_error("mark as read", e))
    }
}
