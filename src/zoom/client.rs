use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::token::{AccessToken, TokenCache};
use super::types::{CreateMeetingRequest, MeetingResource};
use crate::errors::{AppError, UpstreamFailure};
use crate::middleware::metrics;

/// Remote video-meeting operations the meeting service depends on.
#[async_trait]
pub trait MeetingProvider: Send + Sync {
    /// Create a meeting with the fixed instant-meeting settings.
    async fn create_meeting(&self, topic: &str) -> Result<MeetingResource, AppError>;

    /// Fetch a meeting by id. A meeting that no longer exists is
    /// `AppError::NotFound`; anything else is `AppError::Provider` (or
    /// `AppError::Auth` when no token could be obtained).
    async fn get_meeting(&self, meeting_id: &str) -> Result<MeetingResource, AppError>;
}

/// Zoom REST API v2 client.
pub struct ZoomClient {
    http: reqwest::Client,
    api_url: String,
    tokens: Arc<TokenCache>,
}

impl ZoomClient {
    pub fn new(
        http: reqwest::Client,
        api_url: impl Into<String>,
        tokens: Arc<TokenCache>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            tokens,
        }
    }

    /// Turn a Zoom response into a typed value, invalidating `token` on 401.
    async fn read<T: DeserializeOwned>(
        &self,
        context: &str,
        token: &AccessToken,
        resp: reqwest::Response,
    ) -> Result<T, UpstreamFailure> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| UpstreamFailure::transport(context, &e))?;

        if status == StatusCode::UNAUTHORIZED {
            // Token revoked or rotated on Zoom's side; force a new exchange next time.
            self.tokens.invalidate(token).await;
        }
        if !status.is_success() {
            return Err(UpstreamFailure::status(context, status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| UpstreamFailure::malformed(context, e))
    }
}

#[async_trait]
impl MeetingProvider for ZoomClient {
    async fn create_meeting(&self, topic: &str) -> Result<MeetingResource, AppError> {
        const CONTEXT: &str = "Zoom create meeting";

        let token = self.tokens.get_token().await?;
        let request = CreateMeetingRequest::starting_at(topic, Utc::now());

        let result = match self
            .http
            .post(format!("{}/users/me/meetings", self.api_url))
            .bearer_auth(token.secret())
            .json(&request)
            .send()
            .await
        {
            Ok(resp) => self.read::<MeetingResource>(CONTEXT, &token, resp).await,
            Err(e) => Err(UpstreamFailure::transport(CONTEXT, &e)),
        };

        result.map_err(|failure| {
            metrics::record_upstream_error("zoom", "create");
            tracing::warn!(status = ?failure.status, topic = %topic, "{}", failure);
            AppError::Provider(failure)
        })
    }

    async fn get_meeting(&self, meeting_id: &str) -> Result<MeetingResource, AppError> {
        const CONTEXT: &str = "Zoom get meeting";

        let token = self.tokens.get_token().await?;

        let resp = self
            .http
            .get(format!(
                "{}/meetings/{}",
                self.api_url,
                urlencoding::encode(meeting_id)
            ))
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|e| {
                metrics::record_upstream_error("zoom", "get");
                AppError::Provider(UpstreamFailure::transport(CONTEXT, &e))
            })?;

        if resp.status() == StatusCode::NOT_FOUND {
            tracing::info!(meeting_id = %meeting_id, "Zoom reports meeting does not exist");
            return Err(AppError::NotFound(format!(
                "Meeting {} no longer exists",
                meeting_id
            )));
        }

        self.read::<MeetingResource>(CONTEXT, &token, resp)
            .await
            .map_err(|failure| {
                metrics::record_upstream_error("zoom", "get");
                tracing::warn!(status = ?failure.status, meeting_id = %meeting_id, "{}", failure);
                AppError::Provider(failure)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZoomCredentials;
    use std::time::Duration;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_token(server: &MockServer, expected_exchanges: u64) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "zoom-token",
                "expires_in": 3600
            })))
            .expect(expected_exchanges)
            .mount(server)
            .await;
    }

    fn client_for(server: &MockServer) -> ZoomClient {
        let http = reqwest::Client::new();
        let tokens = TokenCache::new(
            http.clone(),
            format!("{}/oauth/token", server.uri()),
            ZoomCredentials::new(Some("acct"), Some("id"), Some("secret")).unwrap(),
        );
        ZoomClient::new(http, format!("{}/v2", server.uri()), Arc::new(tokens))
    }

    fn meeting_json(id: u64) -> serde_json::Value {
        json!({
            "id": id,
            "join_url": format!("https://zoom.us/j/{}", id),
            "start_url": format!("https://zoom.us/s/{}?zak=abc", id),
            "topic": "Meeting for Transaction: T1",
            "type": 2
        })
    }

    #[tokio::test]
    async fn test_create_meeting_sends_settings_with_bearer() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/v2/users/me/meetings"))
            .and(header("authorization", "Bearer zoom-token"))
            .and(body_partial_json(json!({
                "topic": "Meeting for Transaction: T1",
                "type": 2,
                "duration": 60,
                "timezone": "UTC",
                "settings": { "join_before_host": true, "waiting_room": false }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(meeting_json(123)))
            .expect(1)
            .mount(&server)
            .await;

        let meeting = client_for(&server)
            .create_meeting("Meeting for Transaction: T1")
            .await
            .unwrap();
        assert_eq!(meeting.id, "123");
        assert_eq!(meeting.join_url, "https://zoom.us/j/123");
    }

    #[tokio::test]
    async fn test_get_meeting_404_is_not_found() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/v2/meetings/999"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"code": 3001, "message": "Meeting does not exist: 999."})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).get_meeting("999").await.unwrap_err();
        assert!(err.is_not_found(), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_get_meeting_5xx_is_provider_error() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/v2/meetings/123"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        match client_for(&server).get_meeting("123").await {
            Err(AppError::Provider(failure)) => {
                assert_eq!(failure.status, Some(503));
                assert_eq!(failure.body.as_deref(), Some("upstream unavailable"));
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_with_malformed_body_is_provider_error() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/v2/users/me/meetings"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
            .mount(&server)
            .await;

        let err = client_for(&server).create_meeting("t").await.unwrap_err();
        assert!(matches!(err, AppError::Provider(_)));
    }

    #[tokio::test]
    async fn test_unauthorized_invalidates_token() {
        let server = MockServer::start().await;
        // One exchange for the rejected call, one for the call after invalidation.
        mount_token(&server, 2).await;

        Mock::given(method("GET"))
            .and(path("/v2/meetings/123"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"code": 124, "message": "Invalid access token."})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/meetings/123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(meeting_json(123)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.get_meeting("123").await,
            Err(AppError::Provider(_))
        ));
        assert_eq!(client.get_meeting("123").await.unwrap().id, "123");
    }

    #[tokio::test]
    async fn test_token_failure_surfaces_as_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_request"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/users/me/meetings"))
            .respond_with(ResponseTemplate::new(201).set_body_json(meeting_json(1)))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server).create_meeting("t").await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    fn short_timeout_client(server: &MockServer) -> ZoomClient {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let tokens = TokenCache::new(
            http.clone(),
            format!("{}/oauth/token", server.uri()),
            ZoomCredentials::new(Some("acct"), Some("id"), Some("secret")).unwrap(),
        );
        ZoomClient::new(http, format!("{}/v2", server.uri()), Arc::new(tokens))
    }

    #[tokio::test]
    async fn test_get_meeting_timeout_is_provider_error() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/v2/meetings/123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(meeting_json(123))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        match short_timeout_client(&server).get_meeting("123").await {
            Err(AppError::Provider(failure)) => {
                assert!(failure.message.contains("timed out"), "{}", failure);
                assert_eq!(failure.status, None);
            }
            other => panic!("expected provider timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_meeting_timeout_is_provider_error() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/v2/users/me/meetings"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(meeting_json(123))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(1)
            .mount(&server)
            .await;

        match short_timeout_client(&server).create_meeting("t").await {
            Err(AppError::Provider(failure)) => {
                assert!(failure.message.contains("timed out"), "{}", failure)
            }
            other => panic!("expected provider timeout, got {:?}", other),
        }
    }
}
