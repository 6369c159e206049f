use rand::{seq::SliceRandom, Rng};
use std::collections::HashSet;

use super::{Question, QuizError};
use crate::models::GameMode;

/// Rejection-sampling budget per requested question.
const DRAWS_PER_QUESTION: usize = 200;
const MAX_DECOY_DRAWS: usize = 1_000;
const DECOY_COUNT: usize = 3;
const MAX_DECOY_OFFSET: i64 = 20;

/// Builds the full batch for `mode`, every prompt distinct.
pub fn generate_batch<R: Rng + ?Sized>(
    mode: GameMode,
    rng: &mut R,
) -> Result<Vec<Question>, QuizError> {
    generate_questions(mode, mode.batch_size(), rng)
}

pub fn generate_questions<R: Rng + ?Sized>(
    mode: GameMode,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Question>, QuizError> {
    let available = mode.prompt_space();
    if available < count {
        return Err(QuizError::ValueSpaceTooSmall {
            mode,
            available,
            requested: count,
        });
    }

    let max_draws = count.saturating_mul(DRAWS_PER_QUESTION);
    let mut seen = HashSet::with_capacity(count);
    let mut questions = Vec::with_capacity(count);
    let mut draws = 0;

    while questions.len() < count {
        if draws == max_draws {
            tracing::warn!(
                "Question generation for {} stalled at {}/{} after {} draws",
                mode,
                questions.len(),
                count,
                draws
            );
            return Err(QuizError::ValueSpaceExhausted {
                what: "questions",
                attempts: draws,
            });
        }
        draws += 1;

        let question = draw_question(mode, rng);
        if seen.insert(question.prompt.clone()) {
            questions.push(question);
        }
    }

    tracing::debug!(
        "Generated {} {} questions in {} draws",
        questions.len(),
        mode,
        draws
    );

    Ok(questions)
}

fn draw_question<R: Rng + ?Sized>(mode: GameMode, rng: &mut R) -> Question {
    match mode {
        GameMode::Addition => {
            let a = rng.random_range(10..=99i64);
            let b = rng.random_range(10..=99i64);
            Question {
                prompt: format!("{} + {}", a, b),
                answer: a + b,
            }
        }
        GameMode::Subtraction => {
            let a = rng.random_range(20..=99i64);
            let b = rng.random_range(10..=a - 10);
            Question {
                prompt: format!("{} - {}", a, b),
                answer: a - b,
            }
        }
        GameMode::Multiplication => {
            let a = rng.random_range(2..=20i64);
            let b = rng.random_range(1..=20i64);
            Question {
                prompt: format!("{} × {}", a, b),
                answer: a * b,
            }
        }
        GameMode::Squares => {
            let n = rng.random_range(1..=30i64);
            Question {
                prompt: format!("{}²", n),
                answer: n * n,
            }
        }
        GameMode::Cubes => {
            let n = rng.random_range(1..=15i64);
            Question {
                prompt: format!("{}³", n),
                answer: n * n * n,
            }
        }
    }
}

/// Three distinct positive decoys near `answer`, plus `answer`, shuffled.
pub fn multiple_choice_options<R: Rng + ?Sized>(
    answer: i64,
    rng: &mut R,
) -> Result<Vec<i64>, QuizError> {
    let mut options = Vec::with_capacity(DECOY_COUNT + 1);
    let mut draws = 0;

    while options.len() < DECOY_COUNT {
        if draws == MAX_DECOY_DRAWS {
            return Err(QuizError::ValueSpaceExhausted {
                what: "decoys",
                attempts: draws,
            });
        }
        draws += 1;

        let offset = rng.random_range(1..=MAX_DECOY_OFFSET);
        let candidate = if rng.random_bool(0.5) {
            answer + offset
        } else {
            answer - offset
        };
        if candidate > 0 && candidate != answer && !options.contains(&candidate) {
            options.push(candidate);
        }
    }

    options.push(answer);
    options.shuffle(rng);
    Ok(options)
}
