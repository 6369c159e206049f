use anyhow::Result;
use rand::seq::IndexedRandom;
use std::sync::Arc;

use crate::metrics::QUIZ_ATTEMPTS_TOTAL;
use crate::models::{AttemptResult, AttemptReview, ReviewEntry, StoredAttempt, WrongAnswer};
use crate::stats::{dedupe_recent_mistakes, RECENT_MISTAKE_ATTEMPTS};
use crate::storage::Store;

pub struct AttemptService {
    store: Arc<dyn Store>,
}

impl AttemptService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn save_attempt(
        &self,
        attempt: AttemptResult,
        review: Option<Vec<ReviewEntry>>,
    ) -> Result<StoredAttempt> {
        let stored = self.store.save_attempt(attempt, review).await?;

        QUIZ_ATTEMPTS_TOTAL
            .with_label_values(&[stored.attempt.game_mode.as_str()])
            .inc();
        tracing::info!(
            attempt_id = %stored.id,
            game_mode = %stored.attempt.game_mode,
            score = stored.attempt.score,
            total = stored.attempt.total_questions,
            "Quiz attempt stored"
        );

        Ok(stored)
    }

    pub async fn history(&self) -> Result<Vec<StoredAttempt>> {
        self.store.find_attempts(None).await
    }

    pub async fn review(&self, attempt_id: &str) -> Result<Option<AttemptReview>> {
        self.store.find_review(attempt_id).await
    }

    /// Distinct mistaken prompts from the most recent attempts with mistakes.
    pub async fn recent_mistakes(&self) -> Result<Vec<WrongAnswer>> {
        let attempts = self
            .store
            .find_attempts_with_mistakes(RECENT_MISTAKE_ATTEMPTS)
            .await?;
        Ok(dedupe_recent_mistakes(
            attempts.iter().map(|stored| &stored.attempt),
            RECENT_MISTAKE_ATTEMPTS,
        ))
    }

    /// One mistake to re-drill, picked uniformly.
    pub async fn random_mistake(&self) -> Result<Option<WrongAnswer>> {
        let mistakes = self.recent_mistakes().await?;
        Ok(mistakes.choose(&mut rand::rng()).cloned())
    }
}
