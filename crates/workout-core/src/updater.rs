use std::sync::Arc;

use crate::ports::ActivityApi;
use crate::token_cache::TokenCache;
use crate::ActivityUpdate;

/// Writes the workout title and notes onto a remote activity
pub struct ActivityUpdater {
    api: Arc<dyn ActivityApi>,
    tokens: Arc<TokenCache>,
}

impl ActivityUpdater {
    pub fn new(api: Arc<dyn ActivityApi>, tokens: Arc<TokenCache>) -> Self {
        Self { api, tokens }
    }

    /// Overwrite the activity's name and description.
    ///
    /// Returns false on any auth, transport or status failure.
    pub async fn update_activity(&self, activity_id: &str, title: &str, description: &str) -> bool {
        let access_token = match self.tokens.get_access_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(
                    "Cannot update activity {} without an access token: {}",
                    activity_id,
                    e
                );
                return false;
            }
        };

        let update = ActivityUpdate {
            name: title.to_string(),
            description: description.to_string(),
        };

        match self
            .api
            .update_activity(&access_token, activity_id, &update)
            .await
        {
            Ok(()) => {
                tracing::info!("Activity {} was updated", activity_id);
                true
            }
            Err(e) => {
                tracing::error!("Error while trying to update activity {}: {}", activity_id, e);
                false
            }
        }
    }
}
