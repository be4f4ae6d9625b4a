//! Finds the remote activity recorded around the same time as a workout.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::ports::ActivityApi;
use crate::token_cache::TokenCache;
use crate::{ActivityId, MATCH_WINDOW_SECS};

pub struct ActivityMatcher {
    api: Arc<dyn ActivityApi>,
    tokens: Arc<TokenCache>,
}

impl ActivityMatcher {
    pub fn new(api: Arc<dyn ActivityApi>, tokens: Arc<TokenCache>) -> Self {
        Self { api, tokens }
    }

    /// First activity of type `activity_type` within an hour either side
    /// of `occurred_at`, in the order the service lists them.
    ///
    /// Auth and transport failures are logged and reported as no match.
    pub async fn find_matching_activity(
        &self,
        occurred_at: DateTime<FixedOffset>,
        activity_type: &str,
    ) -> Option<ActivityId> {
        let instant = occurred_at.timestamp();
        let after = instant - MATCH_WINDOW_SECS;
        let before = instant + MATCH_WINDOW_SECS;

        let access_token = match self.tokens.get_access_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(
                    "Cannot look up activities between {} and {} without an access token: {}",
                    after,
                    before,
                    e
                );
                return None;
            }
        };

        let activities = match self.api.list_activities(&access_token, after, before).await {
            Ok(activities) => activities,
            Err(e) => {
                tracing::error!(
                    "HTTP error while trying to get activities between {} and {}: {}",
                    after,
                    before,
                    e
                );
                return None;
            }
        };

        tracing::debug!(
            "{} activities between {} and {}",
            activities.len(),
            after,
            before
        );

        let found = activities
            .into_iter()
            .find(|a| a.sport_type == activity_type)
            .map(|a| a.id);

        match &found {
            Some(id) => tracing::info!("Matched {} activity {}", activity_type, id),
            None => tracing::warn!(
                "No {} activity found between {} and {}",
                activity_type,
                after,
                before
            ),
        }

        found
    }
}
