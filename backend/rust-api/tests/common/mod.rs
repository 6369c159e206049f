#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use speedmath_api::{
    config::{AssessmentConfig, Config},
    create_router,
    services::{gemini_client::AssessmentClient, AppState},
    storage::MemoryStore,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tower::ServiceExt;

/// Assessment stub: replies with a fixed text unless told to fail.
pub struct StubAssessor {
    pub reply: String,
    pub failing: AtomicBool,
}

#[async_trait]
impl AssessmentClient for StubAssessor {
    async fn generate_assessment(&self, _prompt: &str) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("stub assessor offline");
        }
        Ok(self.reply.clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub assessor: Arc<StubAssessor>,
    pub state: Arc<AppState>,
}

pub fn test_config() -> Config {
    Config {
        mongo_uri: "mongodb://localhost:27017".to_string(),
        mongo_database: "speedmath_test".to_string(),
        port: 0,
        assessment: AssessmentConfig {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            api_url: "http://localhost:9".to_string(),
            timeout_secs: 1,
        },
        session_tick_millis: 10,
        session_idle_timeout_secs: 3600,
        metrics_auth: "metrics:secret".to_string(),
    }
}

pub fn create_test_app() -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store = Arc::new(MemoryStore::new());
    let assessor = Arc::new(StubAssessor {
        reply: "Sharp work on squares, keep drilling subtraction!".to_string(),
        failing: AtomicBool::new(false),
    });

    let state = Arc::new(AppState::with_parts(
        test_config(),
        store.clone(),
        assessor.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        store,
        assessor,
        state,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.request("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.request("POST", uri, Some(body)).await
    }
}

/// Body for `POST /api/quiz`.
pub fn attempt_body(
    game_mode: &str,
    score: u32,
    total: u32,
    time: f64,
    wrong: &[(&str, &str, i64)],
) -> serde_json::Value {
    serde_json::json!({
        "game_mode": game_mode,
        "score": score,
        "total_questions": total,
        "time_taken_seconds": time,
        "wrong_answers": wrong
            .iter()
            .map(|(question, given, correct)| serde_json::json!({
                "question": question,
                "incorrect_answer": given,
                "correct_answer": correct,
            }))
            .collect::<Vec<_>>(),
        "started_at": "2024-03-10T10:00:00Z",
        "ended_at": "2024-03-10T10:01:00Z",
    })
}

/// Evaluates a rendered prompt such as `12 × 7`, `81 - 17` or `9²`.
pub fn solve(prompt: &str) -> i64 {
    if let Some(base) = prompt.strip_suffix('²') {
        let n: i64 = base.parse().unwrap();
        return n * n;
    }
    if let Some(base) = prompt.strip_suffix('³') {
        let n: i64 = base.parse().unwrap();
        return n * n * n;
    }
    let parts: Vec<&str> = prompt.split(' ').collect();
    let (a, b): (i64, i64) = (parts[0].parse().unwrap(), parts[2].parse().unwrap());
    match parts[1] {
        "+" => a + b,
        "-" => a - b,
        "×" => a * b,
        other => panic!("unexpected operator {other}"),
    }
}
