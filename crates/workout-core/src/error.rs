//! Error taxonomy for the sync pipeline.
//!
//! Collaborators return these from their trait methods. The matcher and
//! updater turn activity-service errors into plain values at their
//! boundary, so only mailbox errors ever reach the orchestrator's caller.

use std::fmt;

use thiserror::Error;

/// Failure to obtain an access token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The token endpoint answered with a non-success status
    #[error("token refresh rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The request never got an answer
    #[error("token refresh transport error: {0}")]
    Transport(String),

    /// The endpoint answered but the body was not a token set
    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

/// Why extraction failed. The email has no usable workout time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionReason {
    BadTimestamp,
}

impl fmt::Display for ExtractionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionReason::BadTimestamp => f.write_str("bad timestamp"),
        }
    }
}

/// Which part of the timestamp was unusable, for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampDefect {
    MissingTime,
    MissingDate,
    Unparseable,
    /// Skipped by a DST transition in the workout zone
    NonexistentLocalTime,
}

impl fmt::Display for TimestampDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TimestampDefect::MissingTime => "no 'at HH:MM' time token",
            TimestampDefect::MissingDate => "no 'D Month YYYY' date token",
            TimestampDefect::Unparseable => "not a valid date-time",
            TimestampDefect::NonexistentLocalTime => "time does not exist in the workout zone",
        };
        f.write_str(text)
    }
}

/// The email's timestamp could not be turned into a date-time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot extract workout time from '{raw_timestamp}': {reason} ({defect})")]
pub struct ExtractionFailure {
    pub reason: ExtractionReason,
    pub defect: TimestampDefect,
    /// Combined "date time" text as found, possibly partial
    pub raw_timestamp: String,
}

impl ExtractionFailure {
    pub fn bad_timestamp(defect: TimestampDefect, raw_timestamp: impl Into<String>) -> Self {
        Self {
            reason: ExtractionReason::BadTimestamp,
            defect,
            raw_timestamp: raw_timestamp.into(),
        }
    }
}

/// Unified error type for collaborator calls
#[derive(Debug, Error)]
pub enum SyncError {
    /// Mailbox, SMTP or HTTP transport failure
    #[error("Connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// The remote rejected a write
    #[error("Update rejected: {0}")]
    Update(String),

    /// Non-success HTTP status on a read
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The collaborator answered with something we cannot decode
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl SyncError {
    pub fn connection(message: impl fmt::Display) -> Self {
        SyncError::Connection(message.to_string())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        SyncError::NotFound(resource.into())
    }

    pub fn decode(message: impl fmt::Display) -> Self {
        SyncError::Decode(message.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
