//! Pulls the workout time and notes out of a Strong notification email.
//!
//! The body is semi-structured text. Tokens are taken on a first-match
//! basis: the first `at HH:MM` and the first `D Month YYYY` in the body
//! win, even when marketing text earlier in the body happens to look
//! like one of them.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;

use crate::error::{ExtractionFailure, TimestampDefect};
use crate::WorkoutRecord;

const TIMESTAMP_FORMAT: &str = "%d %B %Y %H:%M";

fn re_time() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)at ((?:2[0-3]|[01]?[0-9]):(?:[0-5]?[0-9]))").unwrap())
}

fn re_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\d{1,2}\s\w+\s\d{4}").unwrap())
}

// Anchored at the end of the time token. Up to four separator characters
// are skipped before the notes, up to two are dropped before the link.
fn re_description() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)\A\s{0,4}(.*?)\s{0,2}https").unwrap())
}

/// Time zone the email's wall-clock time is interpreted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkoutZone {
    /// The host's local zone
    #[default]
    Local,
    Named(Tz),
}

impl WorkoutZone {
    /// Attach the zone to a wall-clock time.
    ///
    /// Returns `None` for a time skipped by a DST transition. A repeated
    /// time resolves to its earlier instant.
    pub fn resolve(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            WorkoutZone::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
            WorkoutZone::Named(tz) => tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkoutTextExtractor {
    zone: WorkoutZone,
}

impl WorkoutTextExtractor {
    pub fn new(zone: WorkoutZone) -> Self {
        Self { zone }
    }

    /// Build a [`WorkoutRecord`] from one email.
    ///
    /// The subject becomes the title. Fails only on the timestamp; a body
    /// without a notes section yields an empty description.
    pub fn extract(&self, subject: &str, body: &str) -> Result<WorkoutRecord, ExtractionFailure> {
        let time = re_time().captures(body);
        let date = re_date().find(body);

        let time_text = time
            .as_ref()
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let date_text = date.map(|m| m.as_str()).unwrap_or_default();
        let raw_timestamp = format!("{} {}", date_text, time_text).trim().to_string();

        let failure = |defect| ExtractionFailure::bad_timestamp(defect, raw_timestamp.as_str());

        let time = time.ok_or_else(|| failure(TimestampDefect::MissingTime))?;
        if date.is_none() {
            return Err(failure(TimestampDefect::MissingDate));
        }

        let naive = NaiveDateTime::parse_from_str(&raw_timestamp, TIMESTAMP_FORMAT)
            .map_err(|_| failure(TimestampDefect::Unparseable))?;
        let occurred_at = self
            .zone
            .resolve(naive)
            .ok_or_else(|| failure(TimestampDefect::NonexistentLocalTime))?;

        let token_end = time.get(0).map(|m| m.end()).unwrap_or(body.len());
        let description = re_description()
            .captures(&body[token_end..])
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        tracing::debug!(
            "Extracted workout '{}' at {} ({} chars of notes)",
            subject,
            occurred_at,
            description.len()
        );

        Ok(WorkoutRecord {
            title: subject.to_string(),
            occurred_at,
            description,
        })
    }
}
