use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{attempt_service::AttemptService, dashboard_service::DashboardService};
use crate::metrics::{ANSWERS_SUBMITTED_TOTAL, SESSIONS_ACTIVE, SESSIONS_TOTAL};
use crate::models::session::{
    PersonalBestNotice, QuestionView, SessionStatusResponse, StartSessionResponse,
    SubmitAnswerResponse,
};
use crate::models::{AnswerMode, AttemptResult, GameMode};
use crate::quiz::{CompletedQuiz, DisplayTimer, QuizError, QuizSession};
use crate::stats::is_new_personal_best;
use crate::storage::Store;
use crate::utils::time::format_duration;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Quiz(#[from] QuizError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Final answer whose attempt has not been persisted yet.
struct UnsavedResult {
    is_correct: bool,
    correct_answer: i64,
    score: u32,
    completed: CompletedQuiz,
}

struct ActiveSession {
    session: QuizSession,
    timer: DisplayTimer,
    last_activity: Instant,
    unsaved: Option<UnsavedResult>,
}

/// Live quiz sessions of this process. The lock is never held across an
/// `.await`. A completed session stays registered until its attempt is
/// saved.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, ActiveSession>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every live session, stopping their timers. Returns how many
    /// were discarded.
    pub async fn clear(&self) -> usize {
        let drained: Vec<_> = self.sessions.lock().await.drain().collect();
        let count = drained.len();
        for (_, active) in drained {
            active.timer.cancel();
        }
        record_abandoned(count);
        count
    }

    /// Removes sessions idle for longer than the configured timeout and
    /// counts them as abandoned.
    pub async fn evict_idle(&self) -> usize {
        let evicted: Vec<_> = {
            let mut sessions = self.sessions.lock().await;
            let expired: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, active)| active.last_activity.elapsed() >= self.idle_timeout)
                .map(|(id, _)| *id)
                .collect();
            expired
                .into_iter()
                .filter_map(|id| sessions.remove(&id).map(|active| (id, active)))
                .collect()
        };

        for (session_id, active) in &evicted {
            active.timer.cancel();
            if active.unsaved.is_some() {
                tracing::warn!(%session_id, "Evicted session with an unsaved attempt");
            }
        }
        record_abandoned(evicted.len());
        evicted.len()
    }

    /// Sweeps idle sessions every `every` until the task is aborted.
    pub async fn run_sweeper(self: Arc<Self>, every: Duration) {
        tracing::info!(
            "Starting session sweeper (interval {}ms, idle timeout {}s)",
            every.as_millis(),
            self.idle_timeout.as_secs()
        );
        loop {
            tokio::time::sleep(every).await;
            let evicted = self.evict_idle().await;
            if evicted > 0 {
                tracing::info!(evicted, "Idle quiz sessions evicted");
            }
        }
    }
}

fn record_abandoned(count: usize) {
    if count > 0 {
        SESSIONS_ACTIVE.sub(count as i64);
        SESSIONS_TOTAL
            .with_label_values(&["abandoned"])
            .inc_by(count as u64);
    }
}

pub struct SessionService {
    store: Arc<dyn Store>,
    registry: Arc<SessionRegistry>,
    tick: Duration,
}

impl SessionService {
    pub fn new(store: Arc<dyn Store>, registry: Arc<SessionRegistry>, tick: Duration) -> Self {
        Self {
            store,
            registry,
            tick,
        }
    }

    pub async fn start_session(
        &self,
        game_mode: GameMode,
        answer_mode: AnswerMode,
    ) -> Result<StartSessionResponse, SessionError> {
        self.registry.evict_idle().await;

        let session = QuizSession::start(game_mode, answer_mode)?;
        let session_id = Uuid::new_v4();

        let question = question_view(&session).ok_or(QuizError::NotReady)?;
        let response = StartSessionResponse {
            session_id,
            game_mode,
            answer_mode,
            total_questions: session.total_questions(),
            question,
        };

        let timer = DisplayTimer::spawn(self.tick);
        self.registry.sessions.lock().await.insert(
            session_id,
            ActiveSession {
                session,
                timer,
                last_activity: Instant::now(),
                unsaved: None,
            },
        );

        SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        SESSIONS_ACTIVE.inc();
        tracing::info!(%session_id, %game_mode, ?answer_mode, "Quiz session started");

        Ok(response)
    }

    pub async fn get_session(&self, session_id: Uuid) -> Result<SessionStatusResponse, SessionError> {
        let mut sessions = self.registry.sessions.lock().await;
        let active = sessions
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        active.last_activity = Instant::now();

        Ok(SessionStatusResponse {
            session_id,
            game_mode: active.session.game_mode(),
            state: active.session.state(),
            score: active.session.score(),
            answered: active.session.answered(),
            total_questions: active.session.total_questions(),
            display_elapsed_seconds: active.timer.display_seconds(),
            question: question_view(&active.session),
        })
    }

    /// Scores one answer. The final answer stops the timer and persists the
    /// attempt with its review transcript; the session is removed only once
    /// that save succeeds. While a save is outstanding, the next submit
    /// retries it and ignores `raw`.
    pub async fn submit_answer(
        &self,
        session_id: Uuid,
        raw: &str,
    ) -> Result<SubmitAnswerResponse, SessionError> {
        let unsaved = {
            let mut sessions = self.registry.sessions.lock().await;
            let active = sessions
                .get_mut(&session_id)
                .ok_or(SessionError::NotFound(session_id))?;
            active.last_activity = Instant::now();

            match active.unsaved.take() {
                Some(unsaved) => {
                    tracing::info!(%session_id, "Retrying save of completed quiz");
                    unsaved
                }
                None => {
                    let outcome = active.session.submit_answer(raw)?;
                    ANSWERS_SUBMITTED_TOTAL
                        .with_label_values(&[if outcome.is_correct { "true" } else { "false" }])
                        .inc();

                    let score = active.session.score();
                    let Some(completed) = outcome.result else {
                        return Ok(SubmitAnswerResponse {
                            is_correct: outcome.is_correct,
                            correct_answer: outcome.correct_answer,
                            is_final: false,
                            score,
                            next_question: question_view(&active.session),
                            attempt: None,
                            personal_best: None,
                        });
                    };

                    active.timer.cancel();
                    UnsavedResult {
                        is_correct: outcome.is_correct,
                        correct_answer: outcome.correct_answer,
                        score,
                        completed,
                    }
                }
            }
        };

        self.persist_completed(session_id, unsaved).await
    }

    async fn persist_completed(
        &self,
        session_id: Uuid,
        unsaved: UnsavedResult,
    ) -> Result<SubmitAnswerResponse, SessionError> {
        // the notice is optional; a failed lookup must not block the save
        let personal_best = match self.personal_best_notice(&unsaved.completed.attempt).await {
            Ok(notice) => notice,
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "Personal best lookup failed");
                None
            }
        };

        let CompletedQuiz { attempt, review } = unsaved.completed.clone();
        let stored = match AttemptService::new(self.store.clone())
            .save_attempt(attempt, Some(review))
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                let mut sessions = self.registry.sessions.lock().await;
                match sessions.get_mut(&session_id) {
                    Some(active) => active.unsaved = Some(unsaved),
                    None => tracing::warn!(%session_id, "Session gone before its attempt was saved"),
                }
                return Err(e.into());
            }
        };

        if self.registry.sessions.lock().await.remove(&session_id).is_some() {
            SESSIONS_ACTIVE.dec();
            SESSIONS_TOTAL.with_label_values(&["completed"]).inc();
        }

        tracing::info!(
            %session_id,
            attempt_id = %stored.id,
            new_best = personal_best.is_some(),
            "Quiz session completed"
        );

        Ok(SubmitAnswerResponse {
            is_correct: unsaved.is_correct,
            correct_answer: unsaved.correct_answer,
            is_final: true,
            score: unsaved.score,
            next_question: None,
            attempt: Some(stored),
            personal_best,
        })
    }

    /// Discards a session mid-batch. Nothing is persisted.
    pub async fn abandon_session(&self, session_id: Uuid) -> Result<(), SessionError> {
        let removed = self.registry.sessions.lock().await.remove(&session_id);
        let active = removed.ok_or(SessionError::NotFound(session_id))?;
        active.timer.cancel();

        record_abandoned(1);
        tracing::info!(%session_id, answered = active.session.answered(), "Quiz session abandoned");
        Ok(())
    }

    async fn personal_best_notice(
        &self,
        attempt: &AttemptResult,
    ) -> anyhow::Result<Option<PersonalBestNotice>> {
        let bests = DashboardService::new(self.store.clone())
            .personal_bests()
            .await?;

        if !is_new_personal_best(&bests, attempt) {
            return Ok(None);
        }

        let game_name = attempt.game_mode.display_name().to_string();
        let time = format_duration(attempt.time_taken_seconds);
        let message = format!(
            "New personal best! {}/{} in {}, completed in just {}.",
            attempt.score, attempt.total_questions, game_name, time
        );

        Ok(Some(PersonalBestNotice {
            game_name,
            score: attempt.score,
            total_questions: attempt.total_questions,
            time_taken_seconds: attempt.time_taken_seconds,
            message,
        }))
    }
}

fn question_view(session: &QuizSession) -> Option<QuestionView> {
    let index = session.current_index()?;
    let question = session.current_question()?;
    Some(QuestionView {
        index,
        total: session.total_questions(),
        prompt: question.prompt.clone(),
        options: session.current_options().map(<[i64]>::to_vec),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::SessionState;
    use crate::storage::MemoryStore;

    fn service() -> (SessionService, Arc<MemoryStore>, Arc<SessionRegistry>) {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(SessionRegistry::new(Duration::from_secs(3600)));
        let service = SessionService::new(
            store.clone(),
            registry.clone(),
            Duration::from_millis(10),
        );
        (service, store, registry)
    }

    /// Evaluates a rendered prompt such as `12 × 7` or `9²`.
    fn solve(prompt: &str) -> i64 {
        if let Some(base) = prompt.strip_suffix('²') {
            let n: i64 = base.parse().unwrap();
            return n * n;
        }
        if let Some(base) = prompt.strip_suffix('³') {
            let n: i64 = base.parse().unwrap();
            return n * n * n;
        }
        let parts: Vec<&str> = prompt.split(' ').collect();
        let (a, b): (i64, i64) = (parts[0].parse().unwrap(), parts[2].parse().unwrap());
        match parts[1] {
            "+" => a + b,
            "-" => a - b,
            "×" => a * b,
            other => panic!("unexpected operator {other}"),
        }
    }

    #[tokio::test]
    async fn test_full_session_persists_attempt_and_review() {
        let (service, store, registry) = service();
        let started = service
            .start_session(GameMode::Cubes, AnswerMode::Direct)
            .await
            .unwrap();
        assert_eq!(started.total_questions, 15);
        assert!(started.question.options.is_none());

        let mut prompt = started.question.prompt;
        let mut last = None;
        for n in 0..15 {
            // miss the first one
            let answer = if n == 0 { -1 } else { solve(&prompt) };
            let response = service
                .submit_answer(started.session_id, &answer.to_string())
                .await
                .unwrap();
            if let Some(next) = &response.next_question {
                prompt = next.prompt.clone();
            }
            last = Some(response);
        }

        let last = last.unwrap();
        assert!(last.is_final);
        assert_eq!(last.score, 14);
        let attempt = last.attempt.unwrap();
        assert_eq!(attempt.attempt.wrong_answers.len(), 1);
        assert!(last.personal_best.is_some());

        let review = store.find_review(&attempt.id).await.unwrap().unwrap();
        assert_eq!(review.questions.len(), 15);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_answer_leaves_session_untouched() {
        let (service, _, _) = service();
        let started = service
            .start_session(GameMode::Squares, AnswerMode::MultipleChoice)
            .await
            .unwrap();
        assert_eq!(started.question.options.as_ref().map(Vec::len), Some(4));

        let err = service
            .submit_answer(started.session_id, "twelve")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Quiz(QuizError::InvalidAnswer(_))));

        let status = service.get_session(started.session_id).await.unwrap();
        assert_eq!(status.answered, 0);
        assert_eq!(status.state, SessionState::InProgress { index: 0 });
    }

    #[tokio::test]
    async fn test_abandon_discards_without_persisting() {
        let (service, store, registry) = service();
        let started = service
            .start_session(GameMode::Addition, AnswerMode::Direct)
            .await
            .unwrap();
        service
            .submit_answer(started.session_id, "1")
            .await
            .unwrap();

        service.abandon_session(started.session_id).await.unwrap();
        assert!(registry.is_empty().await);
        assert!(store.find_attempts(None).await.unwrap().is_empty());

        let err = service.get_session(started.session_id).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_result_for_retry() {
        let (service, store, registry) = service();
        let started = service
            .start_session(GameMode::Cubes, AnswerMode::Direct)
            .await
            .unwrap();
        let session_id = started.session_id;

        let mut prompt = started.question.prompt;
        for _ in 0..14 {
            let response = service
                .submit_answer(session_id, &solve(&prompt).to_string())
                .await
                .unwrap();
            prompt = response.next_question.unwrap().prompt;
        }

        store.fail_review_writes(true);
        let err = service
            .submit_answer(session_id, &solve(&prompt).to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
        assert!(store.find_attempts(None).await.unwrap().is_empty());
        assert_eq!(registry.len().await, 1);

        let status = service.get_session(session_id).await.unwrap();
        assert_eq!(status.state, SessionState::Completed);
        assert_eq!(status.score, 15);

        // the retry ignores its answer and saves the finished batch
        store.fail_review_writes(false);
        let retried = service.submit_answer(session_id, "").await.unwrap();
        assert!(retried.is_final);
        assert!(retried.is_correct);
        assert_eq!(retried.score, 15);
        assert_eq!(retried.attempt.unwrap().attempt.score, 15);
        assert!(retried.personal_best.is_some());

        assert_eq!(store.find_attempts(None).await.unwrap().len(), 1);
        assert!(registry.is_empty().await);

        let err = service.submit_answer(session_id, "1").await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let registry = Arc::new(SessionRegistry::new(Duration::from_millis(200)));
        let service = SessionService::new(
            Arc::new(MemoryStore::new()),
            registry.clone(),
            Duration::from_millis(1),
        );

        let mut ids = Vec::new();
        for _ in 0..20 {
            let started = service
                .start_session(GameMode::Cubes, AnswerMode::Direct)
                .await
                .unwrap();
            ids.push(started.session_id);
        }

        tokio::time::sleep(Duration::from_millis(120)).await;
        // polling counts as activity
        service.get_session(ids[0]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(registry.evict_idle().await, 19);
        assert_eq!(registry.len().await, 1);
        assert!(service.get_session(ids[0]).await.is_ok());

        let err = service.get_session(ids[1]).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_sweeper_drains_untouched_sessions() {
        let registry = Arc::new(SessionRegistry::new(Duration::from_millis(20)));
        let service = SessionService::new(
            Arc::new(MemoryStore::new()),
            registry.clone(),
            Duration::from_millis(1),
        );
        for _ in 0..50 {
            service
                .start_session(GameMode::Squares, AnswerMode::MultipleChoice)
                .await
                .unwrap();
        }
        assert_eq!(registry.len().await, 50);

        let sweeper = tokio::spawn(registry.clone().run_sweeper(Duration::from_millis(10)));
        tokio::time::sleep(Duration::from_millis(200)).await;
        sweeper.abort();

        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear_drops_all_sessions() {
        let (service, _, registry) = service();
        for _ in 0..3 {
            service
                .start_session(GameMode::Cubes, AnswerMode::Direct)
                .await
                .unwrap();
        }
        assert_eq!(registry.clear().await, 3);
        assert!(registry.is_empty().await);
    }
}
