use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::error::ApiError;
use crate::{
    extractors::AppJson,
    models::session::{
        SessionStatusResponse, StartSessionRequest, StartSessionResponse, SubmitAnswerRequest,
        SubmitAnswerResponse,
    },
    services::{session_service::SessionService, AppState},
};

fn session_service(state: &AppState) -> SessionService {
    SessionService::new(
        state.store.clone(),
        state.sessions.clone(),
        state.config.session_tick(),
    )
}

fn parse_session_id(value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value)
        .map_err(|_| ApiError::bad_request(format!("Invalid session id: {}", value)))
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<StartSessionRequest>,
) -> Result<(StatusCode, Json<StartSessionResponse>), ApiError> {
    let response = session_service(&state)
        .start_session(req.game_mode, req.answer_mode)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    let status = session_service(&state).get_session(session_id).await?;
    Ok(Json(status))
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    AppJson(req): AppJson<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    let response = session_service(&state)
        .submit_answer(session_id, &req.answer.into_text())
        .await?;
    Ok(Json(response))
}

pub async fn abandon_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    session_service(&state).abandon_session(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
