use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use super::error::ApiError;
use crate::{
    models::{AssessmentResponse, DashboardResponse, GameMode, StudyTable},
    quiz::study::study_table,
    services::{
        assessment_service::AssessmentService, dashboard_service::DashboardService, AppState,
    },
};

pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let today = Utc::now().date_naive();
    let dashboard = DashboardService::new(state.store.clone())
        .dashboard(today)
        .await?;
    Ok(Json(dashboard))
}

pub async fn get_assessment(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AssessmentResponse>, ApiError> {
    let response = AssessmentService::new(state.store.clone(), state.assessor.clone())
        .assess()
        .await?;
    Ok(Json(response))
}

pub async fn get_study_table(Path(game_mode): Path<String>) -> Result<Json<StudyTable>, ApiError> {
    let mode = game_mode.parse::<GameMode>().map_err(ApiError::bad_request)?;
    Ok(Json(study_table(mode)))
}
