use anyhow::{anyhow, Result};
use chrono::{Days, NaiveDate};
use std::sync::Arc;

use crate::models::{UsageOutcome, UsageRecord};
use crate::stats::next_streak;
use crate::storage::Store;

/// Bounds the streak re-flow after a backfilled day.
const MAX_REFLOW_DAYS: usize = 3660;

pub struct UsageService {
    store: Arc<dyn Store>,
}

impl UsageService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Adds practice time to `date`.
    ///
    /// An existing day is incremented atomically. A new day gets
    /// `previous day's streak + 1` (or 1), and any consecutive days already
    /// recorded after it are renumbered so that every stored streak keeps
    /// matching its predecessor.
    pub async fn record_usage(&self, date: NaiveDate, seconds: f64) -> Result<UsageOutcome> {
        if let Some(updated) = self.store.increment_usage_time(date, seconds).await? {
            tracing::debug!(%date, total = updated.time_spent_seconds, "Usage time incremented");
            return Ok(UsageOutcome::Updated(updated));
        }

        let previous = match date.checked_sub_days(Days::new(1)) {
            Some(day) => self.store.find_usage(day).await?,
            None => None,
        };

        let record = UsageRecord {
            date,
            time_spent_seconds: seconds,
            streak: next_streak(previous.as_ref()),
        };

        if self.store.insert_usage(&record).await? {
            tracing::info!(%date, streak = record.streak, "Usage day created");
            self.reflow_following(&record).await?;
            return Ok(UsageOutcome::Created(record));
        }

        // A concurrent request created the day first.
        tracing::debug!(%date, "Usage insert lost race, incrementing instead");
        self.store
            .increment_usage_time(date, seconds)
            .await?
            .map(UsageOutcome::Updated)
            .ok_or_else(|| anyhow!("Usage record for {} missing after duplicate insert", date))
    }

    async fn reflow_following(&self, start: &UsageRecord) -> Result<()> {
        let mut streak = start.streak;
        let mut day = start.date;

        for _ in 0..MAX_REFLOW_DAYS {
            let Some(next_day) = day.checked_add_days(Days::new(1)) else {
                break;
            };
            let Some(next) = self.store.find_usage(next_day).await? else {
                break;
            };

            let expected = streak + 1;
            if next.streak == expected {
                break;
            }

            tracing::info!(date = %next_day, from = next.streak, to = expected, "Renumbering streak");
            self.store.set_usage_streak(next_day, expected).await?;
            streak = expected;
            day = next_day;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn day(value: &str) -> NaiveDate {
        value.parse().unwrap()
    }

    fn service() -> (UsageService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (UsageService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_first_day_starts_streak_at_one() {
        let (service, _) = service();
        let outcome = service.record_usage(day("2024-03-10"), 30.0).await.unwrap();
        assert!(matches!(outcome, UsageOutcome::Created(_)));
        assert_eq!(outcome.record().streak, 1);
    }

    #[tokio::test]
    async fn test_same_day_accumulates_time() {
        let (service, _) = service();
        service.record_usage(day("2024-03-10"), 30.0).await.unwrap();
        let outcome = service.record_usage(day("2024-03-10"), 12.5).await.unwrap();

        assert!(matches!(outcome, UsageOutcome::Updated(_)));
        assert_eq!(outcome.record().time_spent_seconds, 42.5);
        assert_eq!(outcome.record().streak, 1);
    }

    #[tokio::test]
    async fn test_consecutive_days_extend_streak_and_gap_resets() {
        let (service, _) = service();
        service.record_usage(day("2024-03-09"), 1.0).await.unwrap();
        let second = service.record_usage(day("2024-03-10"), 1.0).await.unwrap();
        assert_eq!(second.record().streak, 2);

        let after_gap = service.record_usage(day("2024-03-12"), 1.0).await.unwrap();
        assert_eq!(after_gap.record().streak, 1);
    }

    #[tokio::test]
    async fn test_backfilled_day_renumbers_following_days() {
        let (service, store) = service();
        service.record_usage(day("2024-03-10"), 1.0).await.unwrap();
        service.record_usage(day("2024-03-11"), 1.0).await.unwrap();
        service.record_usage(day("2024-03-12"), 1.0).await.unwrap();
        service.record_usage(day("2024-03-14"), 1.0).await.unwrap();

        // 03-09 arrives late
        let late = service.record_usage(day("2024-03-09"), 1.0).await.unwrap();
        assert_eq!(late.record().streak, 1);

        let streaks: Vec<_> = store
            .recent_usage(10)
            .await
            .unwrap()
            .into_iter()
            .rev()
            .map(|record| (record.date.to_string(), record.streak))
            .collect();
        assert_eq!(
            streaks,
            [
                ("2024-03-09".to_string(), 1),
                ("2024-03-10".to_string(), 2),
                ("2024-03-11".to_string(), 3),
                ("2024-03-12".to_string(), 4),
                ("2024-03-14".to_string(), 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_first_writes_create_one_record() {
        let (service, store) = service();
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.record_usage(day("2024-03-10"), 10.0).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if let UsageOutcome::Created(_) = handle.await.unwrap().unwrap() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        let record = store.find_usage(day("2024-03-10")).await.unwrap().unwrap();
        assert_eq!(record.time_spent_seconds, 80.0);
    }
}
