//! Single-string translation through an OpenAI-compatible chat completion API.
//!
//! Stateless: no caching, no retries.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::{AppError, UpstreamFailure};
use crate::middleware::metrics;

// ── Wire types ───────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: std::borrow::Cow<'a, str>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

// ── Client ───────────────────────────────────────────────────

pub struct TranslationClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl TranslationClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            max_tokens,
        }
    }

    pub fn from_config(http: reqwest::Client, cfg: &Config) -> Self {
        if cfg.openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set; translation requests will fail");
        }
        Self::new(
            http,
            cfg.openai_base_url.clone(),
            cfg.openai_api_key.clone(),
            cfg.translation_model.clone(),
            cfg.translation_max_tokens,
        )
    }

    /// Translate `text` into `target_language`, returning only the translation.
    pub async fn translate(
        &self,
        text: Option<&str>,
        target_language: Option<&str>,
    ) -> Result<String, AppError> {
        let (text, target_language) = match (non_blank(text), non_blank(target_language)) {
            (Some(t), Some(l)) => (t, l.trim()),
            _ => {
                return Err(AppError::Validation(
                    "Text and target language are required".to_string(),
                ))
            }
        };

        let result = self.complete(text, target_language).await;
        if let Err(failure) = &result {
            metrics::record_upstream_error("openai", "chat_completion");
            tracing::warn!(
                status = ?failure.status,
                target_language = %target_language,
                "{}",
                failure
            );
        }
        let translation = result.map_err(AppError::Upstream)?;

        tracing::debug!(
            target_language = %target_language,
            chars = translation.len(),
            "translation succeeded"
        );
        Ok(translation)
    }

    async fn complete(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, UpstreamFailure> {
        const CONTEXT: &str = "chat completion";

        let Some(api_key) = self.api_key.as_deref() else {
            return Err(UpstreamFailure {
                status: None,
                message: "translation is not configured (OPENAI_API_KEY missing)".to_string(),
                body: None,
            });
        };

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(target_language).into(),
                },
                ChatMessage {
                    role: "user",
                    content: text.into(),
                },
            ],
            max_tokens: self.max_tokens,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
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

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| UpstreamFailure::malformed(CONTEXT, e))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| UpstreamFailure::malformed(CONTEXT, "no message content in choices"))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn system_prompt(target_language: &str) -> String {
    format!(
        "You are a translator. Translate the following text to {}. Only respond with the translation, nothing else.",
        target_language
    )
}
