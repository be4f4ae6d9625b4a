//! In-memory collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::error::{AuthError, SyncError, SyncResult};
use crate::ports::{ActivityApi, Clock, MailSender, MailboxReader, TokenExchange};
use crate::{ActivitySummary, ActivityUpdate, EmailMessage, RefreshCredentials, TokenState, Uid};

pub fn credentials() -> RefreshCredentials {
    RefreshCredentials {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        refresh_token: "refresh-0".to_string(),
        grant_type: "refresh_token".to_string(),
    }
}

pub fn token(access_token: &str, expires_at: i64, refresh_token: &str) -> TokenState {
    TokenState {
        access_token: access_token.to_string(),
        expires_at,
        refresh_token: refresh_token.to_string(),
    }
}

pub fn activity(id: &str, sport_type: &str) -> ActivitySummary {
    ActivitySummary {
        id: id.to_string(),
        sport_type: sport_type.to_string(),
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at_secs(secs: i64) -> Self {
        Self {
            now: Mutex::new(Utc.timestamp_opt(secs, 0).unwrap()),
        }
    }

    pub fn advance(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Token endpoint that replays queued answers
#[derive(Default)]
pub struct FakeTokenExchange {
    responses: Mutex<VecDeque<Result<TokenState, AuthError>>>,
    pub calls: Mutex<Vec<RefreshCredentials>>,
}

impl FakeTokenExchange {
    pub fn with_responses(responses: Vec<Result<TokenState, AuthError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TokenExchange for FakeTokenExchange {
    async fn refresh(&self, credentials: &RefreshCredentials) -> Result<TokenState, AuthError> {
        self.calls.lock().unwrap().push(credentials.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AuthError::Transport("no response queued".to_string())))
    }
}

/// Activity service keeping activities and their written fields in memory
#[derive(Default)]
pub struct FakeActivityApi {
    /// (id, sport_type, start unix seconds)
    activities: Vec<(String, String, i64)>,
    pub fail_list: bool,
    pub fail_update: bool,
    pub list_calls: Mutex<Vec<(String, i64, i64)>>,
    pub update_calls: Mutex<Vec<(String, String, ActivityUpdate)>>,
    pub remote: Mutex<HashMap<String, ActivityUpdate>>,
}

impl FakeActivityApi {
    pub fn with_activities(activities: Vec<(&str, &str, i64)>) -> Self {
        Self {
            activities: activities
                .into_iter()
                .map(|(id, kind, start)| (id.to_string(), kind.to_string(), start))
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ActivityApi for FakeActivityApi {
    async fn list_activities(
        &self,
        access_token: &str,
        after: i64,
        before: i64,
    ) -> SyncResult<Vec<ActivitySummary>> {
        self.list_calls
            .lock()
            .unwrap()
            .push((access_token.to_string(), after, before));
        if self.fail_list {
            return Err(SyncError::Http {
                status: 500,
                body: "boom".to_string(),
            });
        }
        // Newest first, like the real feed
        let mut found: Vec<_> = self
            .activities
            .iter()
            .filter(|(_, _, start)| *start > after && *start < before)
            .collect();
        found.sort_by(|a, b| b.2.cmp(&a.2));
        Ok(found
            .into_iter()
            .map(|(id, kind, _)| activity(id, kind))
            .collect())
    }

    async fn update_activity(
        &self,
        access_token: &str,
        activity_id: &str,
        update: &ActivityUpdate,
    ) -> SyncResult<()> {
        self.update_calls.lock().unwrap().push((
            access_token.to_string(),
            activity_id.to_string(),
            update.clone(),
        ));
        if self.fail_update {
            return Err(SyncError::Update("HTTP 403: forbidden".to_string()));
        }
        self.remote
            .lock()
            .unwrap()
            .insert(activity_id.to_string(), update.clone());
        Ok(())
    }
}

/// Mailbox holding a fixed set of unread messages
#[derive(Default)]
pub struct FakeMailbox {
    messages: Vec<EmailMessage>,
    pub fail_listing: bool,
    pub unfetchable: Vec<Uid>,
    pub searches: Mutex<Vec<String>>,
    pub marked_read: Mutex<Vec<Uid>>,
}

impl FakeMailbox {
    pub fn with_messages(messages: Vec<(Uid, &str, &str)>) -> Self {
        Self {
            messages: messages
                .into_iter()
                .map(|(uid, subject, body)| EmailMessage {
                    uid,
                    subject: subject.to_string(),
                    text_body: body.to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn marked(&self) -> Vec<Uid> {
        self.marked_read.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailboxReader for FakeMailbox {
    async fn list_unread_candidates(&self, body_contains: &str) -> SyncResult<Vec<Uid>> {
        self.searches.lock().unwrap().push(body_contains.to_string());
        if self.fail_listing {
            return Err(SyncError::connection("login refused"));
        }
        let marked = self.marked();
        Ok(self
            .messages
            .iter()
            .filter(|m| m.text_body.contains(body_contains) && !marked.contains(&m.uid))
            .map(|m| m.uid)
            .collect())
    }

    async fn fetch_message(&self, uid: Uid) -> SyncResult<EmailMessage> {
        if self.unfetchable.contains(&uid) {
            return Err(SyncError::connection("connection dropped"));
        }
        self.messages
            .iter()
            .find(|m| m.uid == uid)
            .cloned()
            .ok_or_else(|| SyncError::not_found(format!("message {}", uid)))
    }

    async fn mark_read(&self, uid: Uid) -> SyncResult<()> {
        self.marked_read.lock().unwrap().push(uid);
        Ok(())
    }
}

/// Sender that records what would have been mailed
#[derive(Default)]
pub struct RecordingSender {
    pub fail: bool,
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSender for RecordingSender {
    async fn send(&self, subject: &str, body: &str) -> SyncResult<()> {
        if self.fail {
            return Err(SyncError::connection("SMTP server unavailable"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}
