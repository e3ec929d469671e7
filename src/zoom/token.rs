//! OAuth2 client-credentials token cache for the Zoom server-to-server app.
//!
//! Holds one token for the whole process. The slot is an async mutex that
//! stays locked for the duration of an exchange, so concurrent callers that
//! find the token unusable wait for the single in-flight refresh and then
//! reuse its result instead of issuing exchanges of their own.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::Mutex;

use super::types::TokenResponse;
use crate::config::{Config, ZoomCredentials};
use crate::errors::{AppError, ConfigError, UpstreamFailure};
use crate::middleware::metrics;

pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(300);

/// A bearer token and its absolute expiry.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Usable only while `now < expires_at - margin`.
    pub fn is_usable(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let Ok(margin) = chrono::Duration::from_std(margin) else {
            return false;
        };
        match self.expires_at.checked_sub_signed(margin) {
            Some(deadline) => now < deadline,
            None => false,
        }
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub struct TokenCache {
    http: reqwest::Client,
    token_url: String,
    credentials: ZoomCredentials,
    safety_margin: Duration,
    slot: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        credentials: ZoomCredentials,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            credentials,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            slot: Mutex::new(None),
        }
    }

    /// Build from configuration, failing before any network activity when a
    /// credential is missing.
    pub fn from_config(http: reqwest::Client, cfg: &Config) -> Result<Self, ConfigError> {
        let credentials = cfg.zoom_credentials()?;
        Ok(Self::new(http, cfg.zoom_oauth_url.clone(), credentials)
            .with_safety_margin(cfg.token_safety_margin))
    }

    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Return the cached token while usable, otherwise exchange for a new one.
    ///
    /// A failed exchange leaves the slot empty; there is no retry.
    pub async fn get_token(&self) -> Result<AccessToken, AppError> {
        let mut slot = self.slot.lock().await;

        if let Some(token) = slot.as_ref() {
            if token.is_usable(Utc::now(), self.safety_margin) {
                return Ok(token.clone());
            }
            tracing::debug!(expires_at = %token.expires_at, "cached Zoom token no longer usable");
        }
        // Never hand out an expiring token, even if the exchange below fails.
        *slot = None;

        match self.exchange().await {
            Ok(token) => {
                metrics::record_token_exchange(true);
                tracing::info!(expires_at = %token.expires_at, "obtained Zoom access token");
                *slot = Some(token.clone());
                Ok(token)
            }
            Err(failure) => {
                metrics::record_token_exchange(false);
                tracing::warn!(status = ?failure.status, "Zoom token exchange failed: {}", failure);
                Err(AppError::Auth(failure))
            }
        }
    }

    /// Drop `rejected` so the next call performs a fresh exchange. A token
    /// that has already been replaced by a newer one is left alone.
    pub async fn invalidate(&self, rejected: &AccessToken) {
        let mut slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(current) if current.secret == rejected.secret => {
                *slot = None;
                tracing::info!("Zoom access token invalidated");
            }
            Some(_) => tracing::debug!("rejected Zoom token already replaced"),
            None => {}
        }
    }

    async fn exchange(&self) -> Result<AccessToken, UpstreamFailure> {
        const CONTEXT: &str = "Zoom token endpoint";

        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[
                ("grant_type", "account_credentials"),
                ("account_id", self.credentials.account_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| UpstreamFailure::transport(CONTEXT, &e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| UpstreamFailure::transport(CONTEXT, &e))?;
        if !status.is_success() {
            return Err(UpstreamFailure::status(CONTEXT, status.as_u16(), body));
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| UpstreamFailure::malformed(CONTEXT, e))?;
        if parsed.access_token.trim().is_empty() {
            return Err(UpstreamFailure::malformed(CONTEXT, "empty access_token"));
        }
        if parsed.expires_in < 0 {
            return Err(UpstreamFailure::malformed(
                CONTEXT,
                format!("negative expires_in {}", parsed.expires_in),
            ));
        }

        let expires_at = chrono::Duration::try_seconds(parsed.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                UpstreamFailure::malformed(
                    CONTEXT,
                    format!("expires_in {} out of range", parsed.expires_in),
                )
            })?;
        Ok(AccessToken::new(parsed.access_token, expires_at))
    }
}
