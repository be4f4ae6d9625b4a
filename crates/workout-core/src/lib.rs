//! Core of the workout sync pipeline.
//!
//! Everything in this crate is free of I/O: the mailbox, the notification
//! sender and the activity service are reached through the traits in
//! [`ports`], and the binary crate plugs real implementations in.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

pub mod error;
pub mod extractor;
pub mod matcher;
pub mod pipeline;
pub mod ports;
pub mod token_cache;
pub mod updater;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AuthError, ExtractionFailure, ExtractionReason, SyncError, TimestampDefect};
pub use extractor::{WorkoutTextExtractor, WorkoutZone};
pub use matcher::ActivityMatcher;
pub use pipeline::PipelineOrchestrator;
pub use token_cache::TokenCache;
pub use updater::ActivityUpdater;

/// IMAP UID of a candidate email
pub type Uid = u32;

/// Remote activity identifier, normalized to a string
pub type ActivityId = String;

/// The only activity type workouts are matched against
pub const WEIGHT_TRAINING: &str = "WeightTraining";

/// Link prefix that identifies a workout notification email
pub const STRONG_LINK_PREFIX: &str = "https://strong.app.link/";

/// Half-width of the match window around a workout, in seconds
pub const MATCH_WINDOW_SECS: i64 = 3600;

/// Workout details pulled out of one notification email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub title: String,
    pub occurred_at: DateTime<FixedOffset>,
    /// Empty when the body has no narrative section, never absent
    pub description: String,
}

impl WorkoutRecord {
    /// Date-time as written in the email, used in notifications
    pub fn display_time(&self) -> String {
        self.occurred_at.format("%-d %B %Y %H:%M").to_string()
    }
}

/// OAuth token set returned by the refresh grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
    pub access_token: String,
    /// Unix epoch seconds
    pub expires_at: i64,
    pub refresh_token: String,
}

impl TokenState {
    /// Usable only while expiry is strictly in the future
    pub fn is_valid_at(&self, now_secs: i64) -> bool {
        !self.access_token.is_empty() && self.expires_at > now_secs
    }
}

/// Credentials posted to the token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub grant_type: String,
}

/// A fetched candidate email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub uid: Uid,
    pub subject: String,
    pub text_body: String,
}

/// One entry of the remote activity list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: ActivityId,
    pub sport_type: String,
}

/// Body of the partial activity update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityUpdate {
    pub name: String,
    pub description: String,
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<ActivityId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// Result of matching and updating one workout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Success,
    ActivityNotFound,
    UpdateFailed,
}

/// Why a notification was sent instead of marking the email read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    ActivityNotFound,
    UpdateFailed,
    ExtractionFailed,
}

impl FailureKind {
    pub fn as_str(&self) -> &str {
        match self {
            FailureKind::ActivityNotFound => "activity_not_found",
            FailureKind::UpdateFailed => "update_failed",
            FailureKind::ExtractionFailed => "extraction_failed",
        }
    }
}

/// How one candidate email was left at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailResolution {
    MarkedRead,
    NotificationSent(FailureKind),
    /// Unresolved and the notification could not be delivered
    NotificationFailed(FailureKind),
    /// Left as it was: the message could not be fetched, or the activity
    /// was updated but the read flag could not be set
    Skipped,
}

/// Totals for one pass over the mailbox
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub candidates: usize,
    pub marked_read: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn record(&mut self, resolution: EmailResolution) {
        match resolution {
            EmailResolution::MarkedRead => self.marked_read += 1,
            EmailResolution::NotificationSent(_) => self.notifications_sent += 1,
            EmailResolution::NotificationFailed(_) => self.notifications_failed += 1,
            EmailResolution::Skipped => self.skipped += 1,
        }
    }
}
