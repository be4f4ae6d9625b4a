//! Per-email loop: extract, match, update, then mark read or notify.
//!
//! Each candidate ends in exactly one resolution. Only a successful
//! update marks the email read; anything else leaves it unread and sends
//! a notification, so the email is retried (and re-notified) on the next
//! run.

use std::sync::Arc;

use crate::error::{ExtractionFailure, SyncResult};
use crate::extractor::WorkoutTextExtractor;
use crate::matcher::ActivityMatcher;
use crate::ports::{MailSender, MailboxReader};
use crate::updater::ActivityUpdater;
use crate::{
    EmailResolution, FailureKind, MatchOutcome, RunSummary, Uid, WorkoutRecord,
    STRONG_LINK_PREFIX, WEIGHT_TRAINING,
};

pub const NOTIFICATION_SUBJECT: &str = "Strong to Strava activity update failed";

/// Body of the failure notification for one workout
pub fn failure_message(kind: FailureKind, title: &str, when: &str) -> String {
    match kind {
        FailureKind::ActivityNotFound => {
            format!("No matching Strava activity found for {} on {}.", title, when)
        }
        FailureKind::UpdateFailed => format!(
            "Update of matched Strava activity for {} on {} failed.",
            title, when
        ),
        FailureKind::ExtractionFailed => {
            format!("Unknown error while processing {} on {}.", title, when)
        }
    }
}

pub struct PipelineOrchestrator {
    mailbox: Arc<dyn MailboxReader>,
    sender: Arc<dyn MailSender>,
    extractor: WorkoutTextExtractor,
    matcher: ActivityMatcher,
    updater: ActivityUpdater,
    link_prefix: String,
}

impl PipelineOrchestrator {
    pub fn new(
        mailbox: Arc<dyn MailboxReader>,
        sender: Arc<dyn MailSender>,
        extractor: WorkoutTextExtractor,
        matcher: ActivityMatcher,
        updater: ActivityUpdater,
    ) -> Self {
        Self {
            mailbox,
            sender,
            extractor,
            matcher,
            updater,
            link_prefix: STRONG_LINK_PREFIX.to_string(),
        }
    }

    /// Search for candidates containing `link_prefix` instead of the Strong link
    pub fn with_link_prefix(mut self, link_prefix: impl Into<String>) -> Self {
        self.link_prefix = link_prefix.into();
        self
    }

    /// Process every unread workout email once.
    ///
    /// Fails only when the candidate list cannot be read. Failures on a
    /// single email are resolved for that email and the loop moves on.
    pub async fn run(&self) -> SyncResult<RunSummary> {
        let uids = match self.mailbox.list_unread_candidates(&self.link_prefix).await {
            Ok(uids) => uids,
            Err(e) => {
                tracing::error!("Failed to list workout emails: {}", e);
                return Err(e);
            }
        };

        tracing::info!("{} new workout email(s) found", uids.len());

        let mut summary = RunSummary {
            candidates: uids.len(),
            ..Default::default()
        };

        for uid in uids {
            let resolution = self.process_email(uid).await;
            tracing::debug!("Email {} resolved as {:?}", uid, resolution);
            summary.record(resolution);
        }

        tracing::info!(
            "Run complete: {} marked read, {} notification(s), {} undelivered, {} skipped",
            summary.marked_read,
            summary.notifications_sent,
            summary.notifications_failed,
            summary.skipped
        );

        Ok(summary)
    }

    /// Take one candidate email through to its resolution
    pub async fn process_email(&self, uid: Uid) -> EmailResolution {
        let message = match self.mailbox.fetch_message(uid).await {
            Ok(message) => message,
            Err(e) => {
                tracing::error!("Failed to fetch email {}: {}", uid, e);
                return EmailResolution::Skipped;
            }
        };

        let record = match self.extractor.extract(&message.subject, &message.text_body) {
            Ok(record) => record,
            Err(failure) => {
                return self
                    .resolve_extraction_failure(uid, &message.subject, failure)
                    .await
            }
        };

        match self.match_and_update(&record).await {
            MatchOutcome::Success => {
                if let Err(e) = self.mailbox.mark_read(uid).await {
                    // Stays unread, so the next run repeats the same overwrite
                    tracing::error!("Failed to mark email {} as read: {}", uid, e);
                    return EmailResolution::Skipped;
                }
                tracing::info!("Email with uid {} was marked as read", uid);
                EmailResolution::MarkedRead
            }
            MatchOutcome::ActivityNotFound => {
                self.notify(FailureKind::ActivityNotFound, &record).await
            }
            MatchOutcome::UpdateFailed => self.notify(FailureKind::UpdateFailed, &record).await,
        }
    }

    /// Find the matching activity and overwrite it with the workout
    pub async fn match_and_update(&self, record: &WorkoutRecord) -> MatchOutcome {
        let Some(activity_id) = self
            .matcher
            .find_matching_activity(record.occurred_at, WEIGHT_TRAINING)
            .await
        else {
            return MatchOutcome::ActivityNotFound;
        };

        if self
            .updater
            .update_activity(&activity_id, &record.title, &record.description)
            .await
        {
            MatchOutcome::Success
        } else {
            MatchOutcome::UpdateFailed
        }
    }

    async fn resolve_extraction_failure(
        &self,
        uid: Uid,
        subject: &str,
        failure: ExtractionFailure,
    ) -> EmailResolution {
        tracing::error!("Email {} ('{}'): {}", uid, subject, failure);
        let body = failure_message(
            FailureKind::ExtractionFailed,
            subject,
            &failure.raw_timestamp,
        );
        self.send_notification(FailureKind::ExtractionFailed, &body)
            .await
    }

    async fn notify(&self, kind: FailureKind, record: &WorkoutRecord) -> EmailResolution {
        tracing::warn!(
            "Workout '{}' at {} not synced: {}",
            record.title,
            record.occurred_at,
            kind.as_str()
        );
        let body = failure_message(kind, &record.title, &record.display_time());
        self.send_notification(kind, &body).await
    }

    async fn send_notification(&self, kind: FailureKind, body: &str) -> EmailResolution {
        match self.sender.send(NOTIFICATION_SUBJECT, body).await {
            Ok(()) => {
                tracing::info!("Notification sent: {}", body);
                EmailResolution::NotificationSent(kind)
            }
            Err(e) => {
                tracing::error!("Failed to send notification '{}': {}", body, e);
                EmailResolution::NotificationFailed(kind)
            }
        }
    }
}
