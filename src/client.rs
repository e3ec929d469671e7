//! HTTP client for a running meetbridge server, used by the CLI.

use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::api::translate::TranslateResponse;
use crate::meetings::MeetingRecord;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type")]
    kind: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST /meetings/:transaction_id
    pub async fn ensure_meeting(&self, transaction_id: &str) -> anyhow::Result<MeetingRecord> {
        let url = self.meeting_url(transaction_id);
        let resp = self
            .http
            .post(&url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        read(resp).await
    }

    /// GET /meetings/:transaction_id
    pub async fn get_meeting(&self, transaction_id: &str) -> anyhow::Result<MeetingRecord> {
        let url = self.meeting_url(transaction_id);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        read(resp).await
    }

    /// POST /api/translate
    pub async fn translate(&self, text: &str, target_language: &str) -> anyhow::Result<String> {
        let url = format!("{}/api/translate", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "text": text, "targetLanguage": target_language }))
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        let body: TranslateResponse = read(resp).await?;
        Ok(body.translation)
    }

    fn meeting_url(&self, transaction_id: &str) -> String {
        format!(
            "{}/meetings/{}",
            self.base_url,
            urlencoding::encode(transaction_id)
        )
    }
}

/// Decode a success body, or turn the server's error payload into an error.
async fn read<T: DeserializeOwned>(resp: reqwest::Response) -> anyhow::Result<T> {
    let status = resp.status();
    let body = resp.text().await.context("failed to read response body")?;

    if !status.is_success() {
        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => anyhow::bail!(
                "server returned {} ({}): {}",
                status,
                envelope.error.kind,
                envelope.error.message
            ),
            Err(_) => anyhow::bail!("server returned {}: {}", status, body),
        }
    }

    serde_json::from_str(&body).context("unexpected response body")
}
