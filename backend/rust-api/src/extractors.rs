use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use validator::Validate;

/// Custom JSON extractor that returns JSON error responses instead of HTML
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = format!("Failed to parse JSON request body: {}", rejection);
                tracing::warn!("{}", message);
                Err(bad_request(message))
            }
        }
    }
}

/// [`AppJson`] that also runs the body's `validator` rules.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let AppJson(value) = AppJson::<T>::from_request(req, state).await?;
        if let Err(errors) = value.validate() {
            let message = format!("Validation failed: {}", errors);
            tracing::warn!("{}", message);
            return Err(bad_request(message));
        }
        Ok(ValidatedJson(value))
    }
}

fn bad_request(message: String) -> Response {
    let error_response = json!({
        "message": message,
        "status": 400
    });
    (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
}
