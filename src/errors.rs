use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Startup configuration problems. Never produced while serving a request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Diagnostics captured from a failed remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFailure {
    /// HTTP status returned by the remote side, `None` for transport failures.
    pub status: Option<u16>,
    pub message: String,
    /// Raw response body, kept for the error payload.
    pub body: Option<String>,
}

impl UpstreamFailure {
    pub fn transport(context: &str, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("{}: request timed out", context)
        } else {
            format!("{}: {}", context, err)
        };
        Self {
            status: None,
            message,
            body: None,
        }
    }

    pub fn status(context: &str, status: u16, body: String) -> Self {
        Self {
            status: Some(status),
            message: format!("{} returned HTTP {}", context, status),
            body: (!body.is_empty()).then_some(body),
        }
    }

    pub fn malformed(context: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            status: None,
            message: format!("{}: malformed response: {}", context, reason),
            body: None,
        }
    }

    /// Upstream body as JSON when it parses, otherwise as a plain string.
    fn details(&self) -> serde_json::Value {
        let body = self.body.as_deref().map(|b| {
            serde_json::from_str::<serde_json::Value>(b)
                .unwrap_or_else(|_| serde_json::Value::String(b.to_string()))
        });
        json!({
            "status": self.status,
            "body": body,
        })
    }
}

impl std::fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("failed to obtain Zoom access token: {0}")]
    Auth(UpstreamFailure),

    #[error("{0}")]
    NotFound(String),

    #[error("meeting provider error: {0}")]
    Provider(UpstreamFailure),

    #[error("translation upstream error: {0}")]
    Upstream(UpstreamFailure),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth(_)
            | AppError::Provider(_)
            | AppError::Upstream(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_type, msg, details) = match &self {
            AppError::Validation(msg) => ("validation_error", msg.clone(), None),
            AppError::NotFound(msg) => ("not_found", msg.clone(), None),
            AppError::Auth(failure) => {
                tracing::error!(status = ?failure.status, "token exchange failed: {}", failure);
                (
                    "auth_error",
                    "Failed to obtain Zoom access token".to_string(),
                    Some(failure.details()),
                )
            }
            AppError::Provider(failure) => {
                tracing::error!(status = ?failure.status, "meeting provider failed: {}", failure);
                (
                    "provider_error",
                    "Meeting provider request failed".to_string(),
                    Some(failure.details()),
                )
            }
            AppError::Upstream(failure) => {
                tracing::error!(status = ?failure.status, "translation failed: {}", failure);
                (
                    "upstream_error",
                    "Translation failed".to_string(),
                    Some(failure.details()),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                ("internal_error", "internal server error".to_string(), None)
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "details": details,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}
