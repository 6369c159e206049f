//! Persistence for attempts, review transcripts and daily usage.
//!
//! Services only see the [`Store`] trait. [`MongoStore`] is the production
//! backend; [`MemoryStore`] backs tests and local runs without a database.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{AttemptResult, AttemptReview, ReviewEntry, StoredAttempt, UsageRecord};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Persists the attempt and, when given, its review transcript.
    /// If the transcript write fails the attempt is removed again.
    async fn save_attempt(
        &self,
        attempt: AttemptResult,
        review: Option<Vec<ReviewEntry>>,
    ) -> Result<StoredAttempt>;

    /// Newest first. `None` returns the full history.
    async fn find_attempts(&self, limit: Option<usize>) -> Result<Vec<StoredAttempt>>;

    /// Newest first, only attempts with at least one wrong answer.
    async fn find_attempts_with_mistakes(&self, limit: usize) -> Result<Vec<StoredAttempt>>;

    async fn find_review(&self, attempt_id: &str) -> Result<Option<AttemptReview>>;

    async fn find_usage(&self, date: NaiveDate) -> Result<Option<UsageRecord>>;

    /// Returns `false` when a record for that date already exists.
    async fn insert_usage(&self, record: &UsageRecord) -> Result<bool>;

    /// Atomically adds to the day's time. Returns the updated record, or
    /// `None` if the day has no record.
    async fn increment_usage_time(
        &self,
        date: NaiveDate,
        seconds: f64,
    ) -> Result<Option<UsageRecord>>;

    async fn set_usage_streak(&self, date: NaiveDate, streak: u32) -> Result<()>;

    /// Newest first.
    async fn recent_usage(&self, limit: usize) -> Result<Vec<UsageRecord>>;

    async fn ping(&self) -> Result<()>;
}
