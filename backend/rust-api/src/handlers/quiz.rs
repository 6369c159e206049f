use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::error::ApiError;
use crate::{
    extractors::ValidatedJson,
    models::{AttemptReview, CreateAttemptRequest, StoredAttempt, WrongAnswer},
    services::{attempt_service::AttemptService, AppState},
};

pub async fn create_attempt(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateAttemptRequest>,
) -> Result<(StatusCode, Json<StoredAttempt>), ApiError> {
    let (attempt, review) = req.into_parts();
    let stored = AttemptService::new(state.store.clone())
        .save_attempt(attempt, review)
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StoredAttempt>>, ApiError> {
    let attempts = AttemptService::new(state.store.clone()).history().await?;
    Ok(Json(attempts))
}

pub async fn get_review(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<String>,
) -> Result<Json<AttemptReview>, ApiError> {
    AttemptService::new(state.store.clone())
        .review(&attempt_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No review stored for attempt {}", attempt_id)))
}

pub async fn get_wrong_answers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WrongAnswer>>, ApiError> {
    let mistakes = AttemptService::new(state.store.clone())
        .recent_mistakes()
        .await?;
    Ok(Json(mistakes))
}

/// One past mistake to re-drill; 204 when there is nothing to recalibrate.
pub async fn get_random_wrong_answer(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let mistake = AttemptService::new(state.store.clone())
        .random_mistake()
        .await?;
    Ok(match mistake {
        Some(mistake) => Json(mistake).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}
