//! In-memory OAuth access token with expiry-aware refresh.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::AuthError;
use crate::ports::{Clock, TokenExchange};
use crate::{RefreshCredentials, TokenState};

struct CacheState {
    credentials: RefreshCredentials,
    token: Option<TokenState>,
}

/// Holds the current access token for the activity service.
///
/// The state lock is held across a refresh, so concurrent callers wait for
/// the refresh in flight instead of starting their own with the same
/// refresh token.
pub struct TokenCache {
    exchange: Arc<dyn TokenExchange>,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState>,
}

impl TokenCache {
    pub fn new(
        exchange: Arc<dyn TokenExchange>,
        clock: Arc<dyn Clock>,
        credentials: RefreshCredentials,
    ) -> Self {
        Self {
            exchange,
            clock,
            state: Mutex::new(CacheState {
                credentials,
                token: None,
            }),
        }
    }

    /// Return a usable access token, refreshing it first if needed.
    ///
    /// A failed refresh leaves the previous state untouched and returns
    /// the error; the stale token is never handed out.
    pub async fn get_access_token(&self) -> Result<String, AuthError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now().timestamp();

        if let Some(token) = state.token.as_ref().filter(|t| t.is_valid_at(now)) {
            return Ok(token.access_token.clone());
        }

        tracing::debug!("Access token missing or expired, refreshing");

        let fresh = match self.exchange.refresh(&state.credentials).await {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::error!("Error trying to refresh access token: {}", e);
                return Err(e);
            }
        };

        if !fresh.is_valid_at(now) {
            tracing::error!(
                "Refreshed access token already expired at {}",
                fresh.expires_at
            );
            return Err(AuthError::InvalidResponse(format!(
                "token expired at {}",
                fresh.expires_at
            )));
        }

        if !fresh.refresh_token.is_empty() {
            state.credentials.refresh_token = fresh.refresh_token.clone();
        }
        let access_token = fresh.access_token.clone();
        state.token = Some(fresh);

        tracing::info!("Access token refreshed");
        Ok(access_token)
    }
}
