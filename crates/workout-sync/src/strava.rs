//! HTTP client for the Strava token endpoint and activities API.

use async_trait::async_trait;
use reqwest::{Client, Response};
use workout_core::error::{AuthError, SyncError, SyncResult};
use workout_core::ports::{ActivityApi, TokenExchange};
use workout_core::{ActivitySummary, ActivityUpdate, RefreshCredentials, TokenState};

use crate::config::StravaConfig;

pub struct StravaClient {
    http: Client,
    token_url: String,
    api_base_url: String,
}

impl StravaClient {
    pub fn new(token_url: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            token_url: token_url.into(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &StravaConfig) -> Self {
        Self::new(&config.token_url, &config.api_base_url)
    }
}

async fn status_and_body(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}

#[async_trait]
impl TokenExchange for StravaClient {
    async fn refresh(&self, credentials: &RefreshCredentials) -> Result<TokenState, AuthError> {
        let response = self
            .http
            .post(&self.token_url)
            .json(credentials)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let (status, body) = status_and_body(response).await;
            tracing::error!("Token refresh failed: {} - {}", status, body);
            return Err(AuthError::Rejected { status, body });
        }

        response
            .json::<TokenState>()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ActivityApi for StravaClient {
    async fn list_activities(
        &self,
        access_token: &str,
        after: i64,
        before: i64,
    ) -> SyncResult<Vec<ActivitySummary>> {
        let response = self
            .http
            .get(format!("{}/athlete/activities", self.api_base_url))
            .bearer_auth(access_token)
            .query(&[("after", after), ("before", before)])
            .send()
            .await
            .map_err(SyncError::connection)?;

        if !response.status().is_success() {
            let (status, body) = status_and_body(response).await;
            return Err(SyncError::Http { status, body });
        }

        response
            .json::<Vec<ActivitySummary>>()
            .await
            .map_err(SyncError::decode)
    }

    async fn update_activity(
        &self,
        access_token: &str,
        activity_id: &str,
        update: &ActivityUpdate,
    ) -> SyncResult<()> {
        let response = self
            .http
            .put(format!("{}/activities/{}", self.api_base_url, activity_id))
            .bearer_auth(access_token)
            .json(update)
            .send()
            .await
            .map_err(SyncError::connection)?;

        if !response.status().is_success() {
            let (status, body) = status_and_body(response).await;
            return Err(SyncError::Update(format!("HTTP {}: {}", status, body)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client(server: &Server) -> StravaClient {
        StravaClient::new(
            format!("{}/oauth/token", server.url()),
            format!("{}/api/v3/", server.url()),
        )
    }

    fn credentials() -> RefreshCredentials {
        RefreshCredentials {
            client_id: "12345".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh-0".to_string(),
            grant_type: "refresh_token".to_string(),
        }
    }

    #[tokio::test]
    async fn test_refresh_posts_credentials() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::PartialJson(json!({
                "client_id": "12345",
                "client_secret": "secret",
                "refresh_token": "refresh-0",
                "grant_type": "refresh_token"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"token_type":"Bearer","access_token":"a1","expires_at":1700003600,"expires_in":3600,"refresh_token":"refresh-1"}"#,
            )
            .create_async()
            .await;

        let state = client(&server).refresh(&credentials()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(state.access_token, "a1");
        assert_eq!(state.expires_at, 1_700_003_600);
        assert_eq!(state.refresh_token, "refresh-1");
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/oauth/token")
            .with_status(400)
            .with_body(r#"{"message":"Bad Request"}"#)
            .create_async()
            .await;

        let err = client(&server).refresh(&credentials()).await.unwrap_err();

        assert_eq!(
            err,
            AuthError::Rejected {
                status: 400,
                body: r#"{"message":"Bad Request"}"#.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_refresh_invalid_body() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = client(&server).refresh(&credentials()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_list_activities_sends_window_as_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/athlete/activities")
            .match_header("authorization", "Bearer a1")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("after".into(), "1710437400".into()),
                Matcher::UrlEncoded("before".into(), "1710444600".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"id":1,"sport_type":"Run","name":"Morning Run"},{"id":999,"sport_type":"WeightTraining"}]"#,
            )
            .create_async()
            .await;

        let activities = client(&server)
            .list_activities("a1", 1_710_437_400, 1_710_444_600)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[1].id, "999");
        assert_eq!(activities[1].sport_type, "WeightTraining");
    }

    #[tokio::test]
    async fn test_list_activities_http_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v3/athlete/activities")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("Authorization Error")
            .create_async()
            .await;

        let err = client(&server).list_activities("bad", 0, 1).await.unwrap_err();
        assert!(matches!(err, SyncError::Http { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_update_activity_puts_name_and_description() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/v3/activities/999")
            .match_header("authorization", "Bearer a1")
            .match_body(Matcher::Json(json!({
                "name": "Leg Day",
                "description": "4 sets squats"
            })))
            .with_status(200)
            .with_body(r#"{"id":999}"#)
            .expect(2)
            .create_async()
            .await;

        let strava = client(&server);
        let update = ActivityUpdate {
            name: "Leg Day".to_string(),
            description: "4 sets squats".to_string(),
        };
        tokio_test::assert_ok!(strava.update_activity("a1", "999", &update).await);
        tokio_test::assert_ok!(strava.update_activity("a1", "999", &update).await);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_activity_rejected() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/api/v3/activities/999")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let update = ActivityUpdate {
            name: "Leg Day".to_string(),
            description: String::new(),
        };
        let err = client(&server)
            .update_activity("a1", "999", &update)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Update(_)));
    }
}
