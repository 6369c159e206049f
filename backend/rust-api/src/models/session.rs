use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    attempt::StoredAttempt,
    game::{AnswerMode, GameMode},
};
use crate::quiz::SessionState;

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub game_mode: GameMode,
    #[serde(default)]
    pub answer_mode: AnswerMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub index: usize,
    pub total: usize,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub game_mode: GameMode,
    pub answer_mode: AnswerMode,
    pub total_questions: usize,
    pub question: QuestionView,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: Uuid,
    pub game_mode: GameMode,
    pub state: SessionState,
    pub score: u32,
    pub answered: usize,
    pub total_questions: usize,
    /// Ticker value for display only; never used for scoring.
    pub display_elapsed_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
}

/// Answers arrive either as JSON numbers (multiple choice) or typed text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawAnswer {
    Number(i64),
    Text(String),
}

impl RawAnswer {
    pub fn into_text(self) -> String {
        match self {
            RawAnswer::Number(value) => value.to_string(),
            RawAnswer::Text(text) => text,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub answer: RawAnswer,
}

#[derive(Debug, Serialize)]
pub struct PersonalBestNotice {
    pub game_name: String,
    pub score: u32,
    pub total_questions: u32,
    pub time_taken_seconds: f64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub is_correct: bool,
    pub correct_answer: i64,
    pub is_final: bool,
    pub score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<QuestionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<StoredAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_best: Option<PersonalBestNotice>,
}
