//! Quiz session engine: question generation, the per-session state machine
//! and the display ticker that runs alongside a live session.

pub mod generator;
pub mod session;
pub mod study;
pub mod timer;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::GameMode;

pub use generator::{generate_batch, multiple_choice_options};
pub use session::{CompletedQuiz, QuizSession, SessionState, SubmitOutcome};
pub use timer::DisplayTimer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub answer: i64,
}

#[derive(Debug, Error, PartialEq)]
pub enum QuizError {
    #[error("answer must be a whole number, got {0:?}")]
    InvalidAnswer(String),

    #[error("session is already completed")]
    SessionCompleted,

    #[error("session has no questions yet")]
    NotReady,

    #[error("{mode} offers {available} distinct questions, {requested} requested")]
    ValueSpaceTooSmall {
        mode: GameMode,
        available: usize,
        requested: usize,
    },

    #[error("gave up generating {what} after {attempts} draws")]
    ValueSpaceExhausted { what: &'static str, attempts: usize },
}
