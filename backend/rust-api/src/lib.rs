use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod quiz;
pub mod services;
pub mod stats;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .nest("/api", api_routes().layer(cors))
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quiz", post(handlers::quiz::create_attempt))
        .route("/quiz/{id}/review", get(handlers::quiz::get_review))
        .route("/history", get(handlers::quiz::get_history))
        .route("/wrong-answers", get(handlers::quiz::get_wrong_answers))
        .route(
            "/wrong-answers/random",
            get(handlers::quiz::get_random_wrong_answer),
        )
        .route("/usage", post(handlers::usage::record_usage))
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .route("/assessment", get(handlers::dashboard::get_assessment))
        .route("/study/{game_mode}", get(handlers::dashboard::get_study_table))
        .nest("/sessions", sessions_routes())
}

fn sessions_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(handlers::sessions::create_session))
        .route(
            "/{id}",
            get(handlers::sessions::get_session).delete(handlers::sessions::abandon_session),
        )
        .route("/{id}/answers", post(handlers::sessions::submit_answer))
}
