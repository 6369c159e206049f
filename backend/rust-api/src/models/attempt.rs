use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::game::GameMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrongAnswer {
    pub question: String,
    pub incorrect_answer: String,
    pub correct_answer: i64,
}

/// One line of the post-quiz review transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: i64,
    pub is_correct: bool,
}

/// Outcome of a finished quiz session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub game_mode: GameMode,
    pub score: u32,
    pub total_questions: u32,
    pub time_taken_seconds: f64,
    pub wrong_answers: Vec<WrongAnswer>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Attempt as returned by the store, with its generated id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAttempt {
    pub id: String,
    #[serde(flatten)]
    pub attempt: AttemptResult,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReview {
    pub quiz_attempt_id: String,
    pub questions: Vec<ReviewEntry>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/quiz`.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_attempt_request"))]
pub struct CreateAttemptRequest {
    pub game_mode: GameMode,

    pub score: u32,

    #[validate(range(min = 1, message = "total_questions must be at least 1"))]
    pub total_questions: u32,

    #[validate(range(min = 0.0, message = "time_taken_seconds must not be negative"))]
    pub time_taken_seconds: f64,

    #[serde(default)]
    pub wrong_answers: Vec<WrongAnswer>,

    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,

    /// Optional full transcript, stored next to the attempt.
    #[serde(default)]
    pub review: Option<Vec<ReviewEntry>>,
}

fn validate_attempt_request(req: &CreateAttemptRequest) -> Result<(), ValidationError> {
    if req.score > req.total_questions {
        let mut err = ValidationError::new("score_exceeds_total");
        err.message = Some("score cannot exceed total_questions".into());
        return Err(err);
    }
    if req.ended_at < req.started_at {
        let mut err = ValidationError::new("ended_before_started");
        err.message = Some("ended_at must not precede started_at".into());
        return Err(err);
    }
    if req.wrong_answers.len() as u32 > req.total_questions {
        let mut err = ValidationError::new("too_many_wrong_answers");
        err.message = Some("wrong_answers cannot outnumber total_questions".into());
        return Err(err);
    }
    if req.score + req.wrong_answers.len() as u32 > req.total_questions {
        let mut err = ValidationError::new("answers_exceed_total");
        err.message = Some("score plus wrong_answers cannot exceed total_questions".into());
        return Err(err);
    }
    Ok(())
}

impl CreateAttemptRequest {
    pub fn into_parts(self) -> (AttemptResult, Option<Vec<ReviewEntry>>) {
        let attempt = AttemptResult {
            game_mode: self.game_mode,
            score: self.score,
            total_questions: self.total_questions,
            time_taken_seconds: self.time_taken_seconds,
            wrong_answers: self.wrong_answers,
            started_at: self.started_at,
            ended_at: self.ended_at,
        };
        (attempt, self.review)
    }
}
