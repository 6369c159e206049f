use anyhow::Result;
use std::sync::Arc;

use super::gemini_client::AssessmentClient;
use crate::metrics::ASSESSMENTS_TOTAL;
use crate::models::{AssessmentResponse, AssessmentSource, StoredAttempt};
use crate::storage::Store;

/// Attempts fed into the prompt.
pub const ASSESSMENT_WINDOW: usize = 30;
/// Below this many attempts there is nothing worth analysing.
pub const MIN_ATTEMPTS: usize = 5;

pub const INSUFFICIENT_DATA_MESSAGE: &str =
    "I can't wait to see your results! Complete at least 5 quizzes, and I'll give you my analysis.";
pub const FALLBACK_MESSAGE: &str =
    "I couldn't connect to my thoughts right now. Try again in a bit!";

const COACH_INSTRUCTIONS: &str = "You are a logical, encouraging and supportive speed math coach. \
Your student is practicing mental arithmetic. Analyze their performance data below. \
Provide a concise (3-4 sentences) assessment in a warm and personal tone. \
Start by saying something nice. Then point out one thing they are doing well and one area \
where they could focus more. End with a short motivational sentence. Here is the data:";

pub struct AssessmentService {
    store: Arc<dyn Store>,
    client: Arc<dyn AssessmentClient>,
}

impl AssessmentService {
    pub fn new(store: Arc<dyn Store>, client: Arc<dyn AssessmentClient>) -> Self {
        Self { store, client }
    }

    /// Coach feedback on recent attempts. Only storage errors propagate;
    /// a failing model degrades to [`FALLBACK_MESSAGE`].
    pub async fn assess(&self) -> Result<AssessmentResponse> {
        let attempts = self.store.find_attempts(Some(ASSESSMENT_WINDOW)).await?;

        let response = if attempts.len() < MIN_ATTEMPTS {
            AssessmentResponse {
                assessment: INSUFFICIENT_DATA_MESSAGE.to_string(),
                source: AssessmentSource::InsufficientData,
            }
        } else {
            let prompt = build_prompt(&attempts);
            match self.client.generate_assessment(&prompt).await {
                Ok(text) => AssessmentResponse {
                    assessment: text,
                    source: AssessmentSource::Model,
                },
                Err(e) => {
                    tracing::warn!("Assessment model failed: {:#}", e);
                    AssessmentResponse {
                        assessment: FALLBACK_MESSAGE.to_string(),
                        source: AssessmentSource::Fallback,
                    }
                }
            }
        };

        let source = match response.source {
            AssessmentSource::Model => "model",
            AssessmentSource::Fallback => "fallback",
            AssessmentSource::InsufficientData => "insufficient_data",
        };
        ASSESSMENTS_TOTAL.with_label_values(&[source]).inc();

        Ok(response)
    }
}

/// One summary line per attempt, newest first, after the coach instructions.
pub fn build_prompt(attempts: &[StoredAttempt]) -> String {
    let summary = attempts
        .iter()
        .take(ASSESSMENT_WINDOW)
        .map(|stored| {
            let attempt = &stored.attempt;
            format!(
                "Game: {}, Score: {}/{}, Time: {:.1}s, Mistakes: {}",
                attempt.game_mode,
                attempt.score,
                attempt.total_questions,
                attempt.time_taken_seconds,
                attempt.wrong_answers.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}\n\n{}", COACH_INSTRUCTIONS, summary)
}
