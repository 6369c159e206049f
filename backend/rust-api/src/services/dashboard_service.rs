use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::models::{DashboardResponse, PersonalBests};
use crate::stats::{compute_accuracy, compute_current_streak, compute_personal_bests};
use crate::storage::Store;

const RECENT_ATTEMPTS: usize = 5;
const USAGE_DAYS: usize = 7;

pub struct DashboardService {
    store: Arc<dyn Store>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn dashboard(&self, today: NaiveDate) -> Result<DashboardResponse> {
        let mut attempts = self.store.find_attempts(None).await?;
        let mut usage = self.store.recent_usage(USAGE_DAYS).await?;

        // Bests fold newest first, so on equal scores the newest attempt's
        // question count is the one that sticks.
        let performance_stats = compute_personal_bests(attempts.iter().map(|s| &s.attempt));
        let accuracy = compute_accuracy(attempts.iter().map(|s| &s.attempt));
        let current_streak = compute_current_streak(&usage, today);

        attempts.truncate(RECENT_ATTEMPTS);
        usage.reverse();

        Ok(DashboardResponse {
            recent_attempts: attempts,
            performance_stats,
            accuracy,
            daily_usage: usage,
            current_streak,
        })
    }

    pub async fn personal_bests(&self) -> Result<PersonalBests> {
        let attempts = self.store.find_attempts(None).await?;
        Ok(compute_personal_bests(
            attempts.iter().map(|stored| &stored.attempt),
        ))
    }
}
