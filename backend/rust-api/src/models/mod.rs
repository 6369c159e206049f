pub mod attempt;
pub mod dashboard;
pub mod game;
pub mod session;
pub mod usage;

pub use attempt::{
    AttemptResult, AttemptReview, CreateAttemptRequest, ReviewEntry, StoredAttempt, WrongAnswer,
};
pub use dashboard::{
    AssessmentResponse, AssessmentSource, DashboardResponse, PersonalBestEntry, PersonalBests,
    StudyTable,
};
pub use game::{AnswerMode, GameMode};
pub use usage::{RecordUsageRequest, UsageOutcome, UsageRecord};
