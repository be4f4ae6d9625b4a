//! Collaborator interfaces the pipeline is written against.
//!
//! Production implementations live in the `workout-sync` crate; tests use
//! the in-memory fakes from `crate::testing`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AuthError, SyncResult};
use crate::{ActivitySummary, ActivityUpdate, EmailMessage, RefreshCredentials, TokenState, Uid};

/// Read side of the mailbox
#[async_trait]
pub trait MailboxReader: Send + Sync {
    /// Unseen messages whose body contains `body_contains`, in server order
    async fn list_unread_candidates(&self, body_contains: &str) -> SyncResult<Vec<Uid>>;

    /// Fetch without setting the seen flag
    async fn fetch_message(&self, uid: Uid) -> SyncResult<EmailMessage>;

    async fn mark_read(&self, uid: Uid) -> SyncResult<()>;
}

/// Outbound notification channel
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> SyncResult<()>;
}

/// OAuth refresh-token grant
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn refresh(&self, credentials: &RefreshCredentials) -> Result<TokenState, AuthError>;
}

/// Remote activity feed
#[async_trait]
pub trait ActivityApi: Send + Sync {
    /// Activities that started between `after` and `before` (unix seconds)
    async fn list_activities(
        &self,
        access_token: &str,
        after: i64,
        before: i64,
    ) -> SyncResult<Vec<ActivitySummary>>;

    async fn update_activity(
        &self,
        access_token: &str,
        activity_id: &str,
        update: &ActivityUpdate,
    ) -> SyncResult<()>;
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
