use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{attempt::StoredAttempt, game::GameMode, usage::UsageRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalBestEntry {
    pub game_mode: GameMode,
    pub score: u32,
    pub time_taken_seconds: f64,
    pub total_questions: u32,
}

pub type PersonalBests = BTreeMap<GameMode, PersonalBestEntry>;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub recent_attempts: Vec<StoredAttempt>,
    pub performance_stats: PersonalBests,
    pub accuracy: f64,
    /// Last seven usage records, oldest first.
    pub daily_usage: Vec<UsageRecord>,
    pub current_streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentSource {
    Model,
    Fallback,
    InsufficientData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub assessment: String,
    pub source: AssessmentSource,
}

#[derive(Debug, Serialize)]
pub struct StudyTable {
    pub game_mode: GameMode,
    pub entries: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
