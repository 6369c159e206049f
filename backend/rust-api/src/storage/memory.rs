use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::Store;
use crate::models::{AttemptResult, AttemptReview, ReviewEntry, StoredAttempt, UsageRecord};

#[derive(Default)]
struct Tables {
    /// Insertion order, oldest first.
    attempts: Vec<StoredAttempt>,
    reviews: HashMap<String, AttemptReview>,
    usage: BTreeMap<NaiveDate, UsageRecord>,
}

/// Process-local store with the same semantics as [`super::MongoStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_review_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent review writes fail, for exercising the rollback path.
    pub fn fail_review_writes(&self, fail: bool) {
        self.fail_review_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_attempt(
        &self,
        attempt: AttemptResult,
        review: Option<Vec<ReviewEntry>>,
    ) -> Result<StoredAttempt> {
        let mut tables = self.tables.write().await;
        let stored = StoredAttempt {
            id: ObjectId::new().to_hex(),
            attempt,
            created_at: Utc::now(),
        };
        tables.attempts.push(stored.clone());

        if let Some(questions) = review {
            if self.fail_review_writes.load(Ordering::SeqCst) {
                tables.attempts.retain(|existing| existing.id != stored.id);
                bail!("Failed to insert quiz review");
            }
            tables.reviews.insert(
                stored.id.clone(),
                AttemptReview {
                    quiz_attempt_id: stored.id.clone(),
                    questions,
                    created_at: stored.created_at,
                },
            );
        }

        Ok(stored)
    }

    async fn find_attempts(&self, limit: Option<usize>) -> Result<Vec<StoredAttempt>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn find_attempts_with_mistakes(&self, limit: usize) -> Result<Vec<StoredAttempt>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .iter()
            .rev()
            .filter(|stored| !stored.attempt.wrong_answers.is_empty())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_review(&self, attempt_id: &str) -> Result<Option<AttemptReview>> {
        Ok(self.tables.read().await.reviews.get(attempt_id).cloned())
    }

    async fn find_usage(&self, date: NaiveDate) -> Result<Option<UsageRecord>> {
        Ok(self.tables.read().await.usage.get(&date).cloned())
    }

    async fn insert_usage(&self, record: &UsageRecord) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.usage.contains_key(&record.date) {
            return Ok(false);
        }
        tables.usage.insert(record.date, record.clone());
        Ok(true)
    }

    async fn increment_usage_time(
        &self,
        date: NaiveDate,
        seconds: f64,
    ) -> Result<Option<UsageRecord>> {
        let mut tables = self.tables.write().await;
        Ok(tables.usage.get_mut(&date).map(|record| {
            record.time_spent_seconds += seconds;
            record.clone()
        }))
    }

    async fn set_usage_streak(&self, date: NaiveDate, streak: u32) -> Result<()> {
        if let Some(record) = self.tables.write().await.usage.get_mut(&date) {
            record.streak = streak;
        }
        Ok(())
    }

    async fn recent_usage(&self, limit: usize) -> Result<Vec<UsageRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.usage.values().rev().take(limit).cloned().collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
