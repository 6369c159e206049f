use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Practice time logged for one calendar day. `date` is the unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub date: NaiveDate,
    pub time_spent_seconds: f64,
    pub streak: u32,
}

/// Body of `POST /api/usage`.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordUsageRequest {
    pub date: NaiveDate,

    #[validate(range(
        min = 0.0,
        max = 86400.0,
        message = "time_spent_seconds must be between 0 and 86400"
    ))]
    pub time_spent_seconds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UsageOutcome {
    Created(UsageRecord),
    Updated(UsageRecord),
}

impl UsageOutcome {
    pub fn record(&self) -> &UsageRecord {
        match self {
            UsageOutcome::Created(record) | UsageOutcome::Updated(record) => record,
        }
    }

    pub fn into_record(self) -> UsageRecord {
        match self {
            UsageOutcome::Created(record) | UsageOutcome::Updated(record) => record,
        }
    }
}
