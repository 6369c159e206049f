use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use std::time::{Duration, Instant};

use super::{generator, Question, QuizError};
use crate::models::{AnswerMode, AttemptResult, GameMode, ReviewEntry, WrongAnswer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    Generating,
    InProgress { index: usize },
    Completed,
}

/// Everything produced when the last question is answered.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedQuiz {
    pub attempt: AttemptResult,
    pub review: Vec<ReviewEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub is_correct: bool,
    pub correct_answer: i64,
    pub is_final: bool,
    pub result: Option<CompletedQuiz>,
}

/// One quiz run. `submit_answer` is the only mutating entry point.
///
/// Timing uses two captured instants: the monotonic `started` taken before
/// the batch is generated, and the instant of the final answer. Display
/// tickers never feed into it.
#[derive(Debug)]
pub struct QuizSession {
    game_mode: GameMode,
    answer_mode: AnswerMode,
    questions: Vec<Question>,
    state: SessionState,
    score: u32,
    wrong_answers: Vec<WrongAnswer>,
    review: Vec<ReviewEntry>,
    options: Option<Vec<i64>>,
    started_at: DateTime<Utc>,
    started: Instant,
    rng: StdRng,
}

impl QuizSession {
    pub fn start(game_mode: GameMode, answer_mode: AnswerMode) -> Result<Self, QuizError> {
        Self::with_rng(game_mode, answer_mode, StdRng::from_os_rng())
    }

    pub fn with_rng(
        game_mode: GameMode,
        answer_mode: AnswerMode,
        rng: StdRng,
    ) -> Result<Self, QuizError> {
        let mut session = Self {
            game_mode,
            answer_mode,
            questions: Vec::new(),
            state: SessionState::Generating,
            score: 0,
            wrong_answers: Vec::new(),
            review: Vec::new(),
            options: None,
            started_at: Utc::now(),
            started: Instant::now(),
            rng,
        };

        session.questions = generator::generate_batch(game_mode, &mut session.rng)?;
        session.state = SessionState::InProgress { index: 0 };
        session.refresh_options()?;

        Ok(session)
    }

    pub fn game_mode(&self) -> GameMode {
        self.game_mode
    }

    pub fn answer_mode(&self) -> AnswerMode {
        self.answer_mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn answered(&self) -> usize {
        self.review.len()
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            SessionState::InProgress { index } => Some(index),
            _ => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().and_then(|index| self.questions.get(index))
    }

    pub fn current_options(&self) -> Option<&[i64]> {
        self.options.as_deref()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Scores `raw` against the live question. Unparseable input leaves the
    /// session untouched so the caller can prompt again.
    pub fn submit_answer(&mut self, raw: &str) -> Result<SubmitOutcome, QuizError> {
        let index = match self.state {
            SessionState::InProgress { index } => index,
            SessionState::Completed => return Err(QuizError::SessionCompleted),
            SessionState::Generating => return Err(QuizError::NotReady),
        };

        let input = raw.trim();
        let value: i64 = input
            .parse()
            .map_err(|_| QuizError::InvalidAnswer(raw.to_string()))?;

        let question = &self.questions[index];
        let correct_answer = question.answer;
        let is_correct = value == correct_answer;

        self.review.push(ReviewEntry {
            question: question.prompt.clone(),
            user_answer: input.to_string(),
            correct_answer,
            is_correct,
        });
        if is_correct {
            self.score += 1;
        } else {
            self.wrong_answers.push(WrongAnswer {
                question: question.prompt.clone(),
                incorrect_answer: input.to_string(),
                correct_answer,
            });
        }

        if index + 1 < self.questions.len() {
            self.state = SessionState::InProgress { index: index + 1 };
            self.refresh_options()?;
            return Ok(SubmitOutcome {
                is_correct,
                correct_answer,
                is_final: false,
                result: None,
            });
        }

        let elapsed = Instant::now().duration_since(self.started);
        self.state = SessionState::Completed;
        self.options = None;

        let ended_at = self.started_at
            + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());

        let attempt = AttemptResult {
            game_mode: self.game_mode,
            score: self.score,
            total_questions: self.questions.len() as u32,
            time_taken_seconds: elapsed.as_secs_f64(),
            wrong_answers: self.wrong_answers.clone(),
            started_at: self.started_at,
            ended_at,
        };

        Ok(SubmitOutcome {
            is_correct,
            correct_answer,
            is_final: true,
            result: Some(CompletedQuiz {
                attempt,
                review: self.review.clone(),
            }),
        })
    }

    fn refresh_options(&mut self) -> Result<(), QuizError> {
        self.options = match (self.answer_mode, self.current_index()) {
            (AnswerMode::MultipleChoice, Some(index)) => {
                let answer = self.questions[index].answer;
                Some(generator::multiple_choice_options(answer, &mut self.rng)?)
            }
            _ => None,
        };
        Ok(())
    }
}
