use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use super::error::ApiError;
use crate::{
    extractors::ValidatedJson,
    models::{RecordUsageRequest, UsageOutcome, UsageRecord},
    services::{usage_service::UsageService, AppState},
};

/// 201 when the day is new, 200 when time was added to an existing day.
pub async fn record_usage(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RecordUsageRequest>,
) -> Result<(StatusCode, Json<UsageRecord>), ApiError> {
    let outcome = UsageService::new(state.store.clone())
        .record_usage(req.date, req.time_spent_seconds)
        .await?;

    let status = match outcome {
        UsageOutcome::Created(_) => StatusCode::CREATED,
        UsageOutcome::Updated(_) => StatusCode::OK,
    };
    Ok((status, Json(outcome.into_record())))
}
