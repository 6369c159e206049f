use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    error::{ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};

use super::Store;
use crate::metrics::track_db_operation;
use crate::models::{
    AttemptResult, AttemptReview, GameMode, ReviewEntry, StoredAttempt, UsageRecord, WrongAnswer,
};
use crate::utils::time::{bson_to_chrono, chrono_to_bson};

const ATTEMPTS: &str = "quiz_attempts";
const REVIEWS: &str = "quiz_reviews";
const USAGE: &str = "usage_stats";

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Serialize, Deserialize)]
struct AttemptDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    game_mode: GameMode,
    score: u32,
    total_questions: u32,
    time_taken_seconds: f64,
    #[serde(default)]
    wrong_answers: Vec<WrongAnswer>,
    started_at: BsonDateTime,
    ended_at: BsonDateTime,
    created_at: BsonDateTime,
}

impl AttemptDocument {
    fn into_stored(self) -> Result<StoredAttempt> {
        let id = self
            .id
            .ok_or_else(|| anyhow!("Stored attempt has no _id"))?;
        Ok(StoredAttempt {
            id: id.to_hex(),
            attempt: AttemptResult {
                game_mode: self.game_mode,
                score: self.score,
                total_questions: self.total_questions,
                time_taken_seconds: self.time_taken_seconds,
                wrong_answers: self.wrong_answers,
                started_at: bson_to_chrono(self.started_at),
                ended_at: bson_to_chrono(self.ended_at),
            },
            created_at: bson_to_chrono(self.created_at),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ReviewDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    quiz_attempt_id: ObjectId,
    questions: Vec<ReviewEntry>,
    created_at: BsonDateTime,
}

/// Usage days are keyed by their ISO date string, which also sorts
/// chronologically.
#[derive(Debug, Serialize, Deserialize)]
struct UsageDocument {
    date: String,
    time_spent_seconds: f64,
    streak: u32,
}

impl UsageDocument {
    fn from_record(record: &UsageRecord) -> Self {
        Self {
            date: date_key(record.date),
            time_spent_seconds: record.time_spent_seconds,
            streak: record.streak,
        }
    }

    fn into_record(self) -> Result<UsageRecord> {
        let date = self
            .date
            .parse::<NaiveDate>()
            .with_context(|| format!("Invalid usage date stored: {}", self.date))?;
        Ok(UsageRecord {
            date,
            time_spent_seconds: self.time_spent_seconds,
            streak: self.streak,
        })
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == DUPLICATE_KEY
    )
}

pub struct MongoStore {
    mongo: Database,
}

impl MongoStore {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn attempts(&self) -> Collection<AttemptDocument> {
        self.mongo.collection(ATTEMPTS)
    }

    fn reviews(&self) -> Collection<ReviewDocument> {
        self.mongo.collection(REVIEWS)
    }

    fn usage(&self) -> Collection<UsageDocument> {
        self.mongo.collection(USAGE)
    }

    /// Creates the indexes the store relies on. The unique `date` index is
    /// what turns concurrent first writes of a day into a single record.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique = IndexOptions::builder().unique(true).build();
        self.usage()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "date": 1 })
                    .options(unique)
                    .build(),
            )
            .await
            .context("Failed to create usage date index")?;

        self.attempts()
            .create_index(IndexModel::builder().keys(doc! { "created_at": -1 }).build())
            .await
            .context("Failed to create attempts created_at index")?;

        self.reviews()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "quiz_attempt_id": 1 })
                    .build(),
            )
            .await
            .context("Failed to create review attempt index")?;

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }

    async fn list_attempts(
        &self,
        filter: mongodb::bson::Document,
        limit: Option<usize>,
    ) -> Result<Vec<StoredAttempt>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .limit(limit.map(|value| value as i64))
            .build();

        let collection = self.attempts();
        let documents = track_db_operation("find", ATTEMPTS, async {
            collection
                .find(filter)
                .with_options(options)
                .await
                .context("Failed to query quiz attempts")?
                .try_collect::<Vec<_>>()
                .await
                .context("Failed to iterate quiz attempts")
        })
        .await?;

        documents
            .into_iter()
            .map(AttemptDocument::into_stored)
            .collect()
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn save_attempt(
        &self,
        attempt: AttemptResult,
        review: Option<Vec<ReviewEntry>>,
    ) -> Result<StoredAttempt> {
        let now = Utc::now();
        let id = ObjectId::new();
        let document = AttemptDocument {
            id: Some(id),
            game_mode: attempt.game_mode,
            score: attempt.score,
            total_questions: attempt.total_questions,
            time_taken_seconds: attempt.time_taken_seconds,
            wrong_answers: attempt.wrong_answers.clone(),
            started_at: chrono_to_bson(attempt.started_at),
            ended_at: chrono_to_bson(attempt.ended_at),
            created_at: chrono_to_bson(now),
        };

        let attempts = self.attempts();
        track_db_operation("insert_one", ATTEMPTS, async {
            attempts
                .insert_one(&document)
                .await
                .map(|_| ())
                .context("Failed to insert quiz attempt")
        })
        .await?;

        if let Some(questions) = review {
            let review_document = ReviewDocument {
                id: None,
                quiz_attempt_id: id,
                questions,
                created_at: chrono_to_bson(now),
            };
            let reviews = self.reviews();
            let inserted = track_db_operation("insert_one", REVIEWS, async {
                reviews
                    .insert_one(&review_document)
                    .await
                    .map(|_| ())
                    .context("Failed to insert quiz review")
            })
            .await;

            if let Err(err) = inserted {
                tracing::error!(attempt_id = %id, "Review write failed, removing attempt: {:#}", err);
                if let Err(cleanup) = attempts.delete_one(doc! { "_id": id }).await {
                    tracing::error!(attempt_id = %id, "Failed to remove orphaned attempt: {}", cleanup);
                }
                return Err(err);
            }
        }

        Ok(StoredAttempt {
            id: id.to_hex(),
            attempt,
            created_at: bson_to_chrono(document.created_at),
        })
    }

    async fn find_attempts(&self, limit: Option<usize>) -> Result<Vec<StoredAttempt>> {
        self.list_attempts(doc! {}, limit).await
    }

    async fn find_attempts_with_mistakes(&self, limit: usize) -> Result<Vec<StoredAttempt>> {
        self.list_attempts(doc! { "wrong_answers.0": { "$exists": true } }, Some(limit))
            .await
    }

    async fn find_review(&self, attempt_id: &str) -> Result<Option<AttemptReview>> {
        let Ok(attempt_oid) = ObjectId::parse_str(attempt_id) else {
            return Ok(None);
        };

        let reviews = self.reviews();
        let document = track_db_operation("find_one", REVIEWS, async {
            reviews
                .find_one(doc! { "quiz_attempt_id": attempt_oid })
                .await
                .context("Failed to query quiz review")
        })
        .await?;

        Ok(document.map(|review| AttemptReview {
            quiz_attempt_id: review.quiz_attempt_id.to_hex(),
            questions: review.questions,
            created_at: bson_to_chrono(review.created_at),
        }))
    }

    async fn find_usage(&self, date: NaiveDate) -> Result<Option<UsageRecord>> {
        let usage = self.usage();
        let document = track_db_operation("find_one", USAGE, async {
            usage
                .find_one(doc! { "date": date_key(date) })
                .await
                .context("Failed to query usage")
        })
        .await?;

        document.map(UsageDocument::into_record).transpose()
    }

    async fn insert_usage(&self, record: &UsageRecord) -> Result<bool> {
        let usage = self.usage();
        let document = UsageDocument::from_record(record);
        track_db_operation("insert_one", USAGE, async {
            match usage.insert_one(&document).await {
                Ok(_) => Ok(true),
                Err(err) if is_duplicate_key(&err) => Ok(false),
                Err(err) => Err(anyhow::Error::new(err).context("Failed to insert usage")),
            }
        })
        .await
    }

    async fn increment_usage_time(
        &self,
        date: NaiveDate,
        seconds: f64,
    ) -> Result<Option<UsageRecord>> {
        let usage = self.usage();
        let document = track_db_operation("find_one_and_update", USAGE, async {
            usage
                .find_one_and_update(
                    doc! { "date": date_key(date) },
                    doc! { "$inc": { "time_spent_seconds": seconds } },
                )
                .return_document(ReturnDocument::After)
                .await
                .context("Failed to increment usage time")
        })
        .await?;

        document.map(UsageDocument::into_record).transpose()
    }

    async fn set_usage_streak(&self, date: NaiveDate, streak: u32) -> Result<()> {
        let usage = self.usage();
        track_db_operation("update_one", USAGE, async {
            usage
                .update_one(
                    doc! { "date": date_key(date) },
                    doc! { "$set": { "streak": streak as i64 } },
                )
                .await
                .map(|_| ())
                .context("Failed to update usage streak")
        })
        .await
    }

    async fn recent_usage(&self, limit: usize) -> Result<Vec<UsageRecord>> {
        let options = FindOptions::builder()
            .sort(doc! { "date": -1 })
            .limit(limit as i64)
            .build();

        let usage = self.usage();
        let documents = track_db_operation("find", USAGE, async {
            usage
                .find(doc! {})
                .with_options(options)
                .await
                .context("Failed to query usage")?
                .try_collect::<Vec<_>>()
                .await
                .context("Failed to iterate usage")
        })
        .await?;

        documents
            .into_iter()
            .map(UsageDocument::into_record)
            .collect()
    }

    async fn ping(&self) -> Result<()> {
        self.mongo
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .context("MongoDB ping failed")
    }
}
