use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: Option<String>,
    pub target_language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translation: String,
    pub timestamp: DateTime<Utc>,
}

/// POST /api/translate
pub async fn translate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslateResponse>, AppError> {
    let Json(req) = body.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let translation = state
        .translator
        .translate(req.text.as_deref(), req.target_language.as_deref())
        .await?;

    Ok(Json(TranslateResponse {
        translation,
        timestamp: Utc::now(),
    }))
}
