use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::meetings::MeetingRecord;
use crate::AppState;

/// Body of the marketplace client's create call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingBody {
    pub transaction_id: Option<String>,
}

/// POST /meetings/:transaction_id: get-or-create. Any body is ignored.
pub async fn ensure_meeting(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<String>,
) -> Result<Json<MeetingRecord>, AppError> {
    let record = state.meetings.get_or_create(Some(&transaction_id)).await?;
    Ok(Json(record))
}

/// GET /meetings/:transaction_id and GET /api/zoom/meetings/:transaction_id.
pub async fn get_meeting(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<String>,
) -> Result<Json<MeetingRecord>, AppError> {
    let record = state.meetings.get(Some(&transaction_id)).await?;
    Ok(Json(record))
}

/// POST /api/zoom/create-meeting-for-transaction
pub async fn create_meeting_for_transaction(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateMeetingBody>, JsonRejection>,
) -> Result<Json<MeetingRecord>, AppError> {
    let Json(body) = body.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let record = state
        .meetings
        .get_or_create(body.transaction_id.as_deref())
        .await?;
    Ok(Json(record))
}

/// POST /meetings/ with no key segment.
pub async fn missing_transaction_id() -> AppError {
    AppError::Validation("Transaction ID is required".to_string())
}
