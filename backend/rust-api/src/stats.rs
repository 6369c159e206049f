//! Dashboard aggregation over attempt and usage history.
//!
//! Everything here is a pure function of its inputs; callers pass "today"
//! explicitly so results do not depend on the wall clock.

use chrono::{Days, NaiveDate};
use std::collections::{btree_map::Entry, HashSet};

use crate::models::{AttemptResult, PersonalBestEntry, PersonalBests, UsageRecord, WrongAnswer};

/// How many recent attempts with mistakes feed the review list.
pub const RECENT_MISTAKE_ATTEMPTS: usize = 20;

/// Best attempt per game mode, folded in input order.
///
/// A strictly higher score replaces the whole entry. An equal score with a
/// strictly lower time only overwrites the time; the earlier winner's
/// `total_questions` stays.
pub fn compute_personal_bests<'a, I>(attempts: I) -> PersonalBests
where
    I: IntoIterator<Item = &'a AttemptResult>,
{
    let mut bests = PersonalBests::new();

    for attempt in attempts {
        match bests.entry(attempt.game_mode) {
            Entry::Vacant(slot) => {
                slot.insert(entry_for(attempt));
            }
            Entry::Occupied(mut slot) => {
                let best = slot.get_mut();
                if attempt.score > best.score {
                    *best = entry_for(attempt);
                } else if attempt.score == best.score
                    && attempt.time_taken_seconds < best.time_taken_seconds
                {
                    best.time_taken_seconds = attempt.time_taken_seconds;
                }
            }
        }
    }

    bests
}

fn entry_for(attempt: &AttemptResult) -> PersonalBestEntry {
    PersonalBestEntry {
        game_mode: attempt.game_mode,
        score: attempt.score,
        time_taken_seconds: attempt.time_taken_seconds,
        total_questions: attempt.total_questions,
    }
}

/// Whether `attempt` would displace the current best for its mode.
/// Zero-score runs never count as a record.
pub fn is_new_personal_best(bests: &PersonalBests, attempt: &AttemptResult) -> bool {
    if attempt.score == 0 {
        return false;
    }
    match bests.get(&attempt.game_mode) {
        None => true,
        Some(best) => {
            attempt.score > best.score
                || (attempt.score == best.score
                    && attempt.time_taken_seconds < best.time_taken_seconds)
        }
    }
}

/// Correct answers over questions asked; zero when nothing was attempted.
pub fn compute_accuracy<'a, I>(attempts: I) -> f64
where
    I: IntoIterator<Item = &'a AttemptResult>,
{
    let (score, total) = attempts
        .into_iter()
        .fold((0u64, 0u64), |(score, total), attempt| {
            (
                score + u64::from(attempt.score),
                total + u64::from(attempt.total_questions),
            )
        });

    if total == 0 {
        0.0
    } else {
        score as f64 / total as f64
    }
}

/// Stored streak of the latest record, if that record is from today or
/// yesterday. Older streaks have lapsed and read as zero.
pub fn compute_current_streak(usage: &[UsageRecord], today: NaiveDate) -> u32 {
    let Some(latest) = usage.iter().max_by_key(|record| record.date) else {
        return 0;
    };

    let yesterday = today.checked_sub_days(Days::new(1));
    if latest.date == today || Some(latest.date) == yesterday {
        latest.streak
    } else {
        0
    }
}

/// Streak for a record created on the day after `previous`.
pub fn next_streak(previous: Option<&UsageRecord>) -> u32 {
    previous.map_or(1, |record| record.streak + 1)
}

/// First occurrence of each mistaken prompt across the newest `limit`
/// attempts that contain mistakes. `attempts` must be newest first.
pub fn dedupe_recent_mistakes<'a, I>(attempts: I, limit: usize) -> Vec<WrongAnswer>
where
    I: IntoIterator<Item = &'a AttemptResult>,
{
    let mut seen = HashSet::new();
    let mut mistakes = Vec::new();

    for attempt in attempts
        .into_iter()
        .filter(|attempt| !attempt.wrong_answers.is_empty())
        .take(limit)
    {
        for wrong in &attempt.wrong_answers {
            if seen.insert(wrong.question.as_str()) {
                mistakes.push(wrong.clone());
            }
        }
    }

    mistakes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameMode;
    use chrono::Utc;

    fn attempt(mode: GameMode, score: u32, total: u32, time: f64) -> AttemptResult {
        let now = Utc::now();
        AttemptResult {
            game_mode: mode,
            score,
            total_questions: total,
            time_taken_seconds: time,
            wrong_answers: Vec::new(),
            started_at: now,
            ended_at: now,
        }
    }

    fn with_mistakes(prompts: &[(&str, &str)]) -> AttemptResult {
        let mut result = attempt(GameMode::Multiplication, 40, 50, 60.0);
        result.wrong_answers = prompts
            .iter()
            .map(|(question, given)| WrongAnswer {
                question: question.to_string(),
                incorrect_answer: given.to_string(),
                correct_answer: 0,
            })
            .collect();
        result
    }

    fn usage(date: &str, streak: u32) -> UsageRecord {
        UsageRecord {
            date: date.parse().unwrap(),
            time_spent_seconds: 10.0,
            streak,
        }
    }

    fn day(value: &str) -> NaiveDate {
        value.parse().unwrap()
    }

    #[test]
    fn test_equal_score_faster_time_updates_only_time() {
        let attempts = [
            attempt(GameMode::Squares, 8, 30, 12.0),
            attempt(GameMode::Squares, 8, 10, 9.5),
        ];
        let bests = compute_personal_bests(&attempts);
        let best = &bests[&GameMode::Squares];
        assert_eq!(best.score, 8);
        assert_eq!(best.time_taken_seconds, 9.5);
        // total_questions kept from the first winner
        assert_eq!(best.total_questions, 30);
    }

    #[test]
    fn test_higher_score_replaces_whole_entry() {
        let attempts = [
            attempt(GameMode::Squares, 8, 30, 9.5),
            attempt(GameMode::Squares, 9, 25, 20.0),
        ];
        let bests = compute_personal_bests(&attempts);
        assert_eq!(
            bests[&GameMode::Squares],
            PersonalBestEntry {
                game_mode: GameMode::Squares,
                score: 9,
                time_taken_seconds: 20.0,
                total_questions: 25,
            }
        );
    }

    #[test]
    fn test_lower_or_slower_attempts_ignored() {
        let attempts = [
            attempt(GameMode::Cubes, 10, 15, 30.0),
            attempt(GameMode::Cubes, 9, 15, 5.0),
            attempt(GameMode::Cubes, 10, 15, 31.0),
            attempt(GameMode::Addition, 20, 25, 80.0),
        ];
        let bests = compute_personal_bests(&attempts);
        assert_eq!(bests.len(), 2);
        assert_eq!(bests[&GameMode::Cubes].score, 10);
        assert_eq!(bests[&GameMode::Cubes].time_taken_seconds, 30.0);
        assert_eq!(bests[&GameMode::Addition].score, 20);
    }

    #[test]
    fn test_new_personal_best_detection() {
        let bests = compute_personal_bests(&[attempt(GameMode::Cubes, 10, 15, 30.0)]);
        assert!(is_new_personal_best(&bests, &attempt(GameMode::Cubes, 11, 15, 50.0)));
        assert!(is_new_personal_best(&bests, &attempt(GameMode::Cubes, 10, 15, 29.0)));
        assert!(!is_new_personal_best(&bests, &attempt(GameMode::Cubes, 10, 15, 30.0)));
        assert!(is_new_personal_best(&bests, &attempt(GameMode::Squares, 1, 30, 90.0)));
        assert!(!is_new_personal_best(&bests, &attempt(GameMode::Squares, 0, 30, 1.0)));
    }

    #[test]
    fn test_accuracy() {
        let none: [AttemptResult; 0] = [];
        assert_eq!(compute_accuracy(&none), 0.0);
        assert_eq!(
            compute_accuracy(&[attempt(GameMode::Addition, 5, 10, 1.0)]),
            0.5
        );
        assert_eq!(
            compute_accuracy(&[
                attempt(GameMode::Addition, 5, 10, 1.0),
                attempt(GameMode::Cubes, 15, 15, 1.0),
            ]),
            0.8
        );
    }

    #[test]
    fn test_current_streak_counts_today_and_yesterday() {
        let history = [usage("2024-03-09", 3), usage("2024-03-10", 4)];
        assert_eq!(compute_current_streak(&history, day("2024-03-10")), 4);
        assert_eq!(compute_current_streak(&history, day("2024-03-11")), 4);
    }

    #[test]
    fn test_current_streak_lapses_after_gap() {
        let history = [usage("2024-03-10", 9)];
        assert_eq!(compute_current_streak(&history, day("2024-03-12")), 0);
        assert_eq!(compute_current_streak(&[], day("2024-03-12")), 0);
    }

    #[test]
    fn test_current_streak_uses_latest_regardless_of_order() {
        let history = [usage("2024-03-10", 2), usage("2024-03-01", 7)];
        assert_eq!(compute_current_streak(&history, day("2024-03-10")), 2);
    }

    #[test]
    fn test_next_streak() {
        assert_eq!(next_streak(None), 1);
        assert_eq!(next_streak(Some(&usage("2024-03-10", 3))), 4);
    }

    #[test]
    fn test_dedupe_keeps_most_recent_occurrence() {
        // newest first
        let attempts = [
            with_mistakes(&[("3 × 4", "13"), ("7 × 8", "54")]),
            attempt(GameMode::Cubes, 15, 15, 10.0),
            with_mistakes(&[("3 × 4", "11"), ("9 × 9", "80")]),
        ];
        let mistakes = dedupe_recent_mistakes(&attempts, RECENT_MISTAKE_ATTEMPTS);

        let prompts: Vec<_> = mistakes.iter().map(|m| m.question.as_str()).collect();
        assert_eq!(prompts, ["3 × 4", "7 × 8", "9 × 9"]);
        assert_eq!(mistakes[0].incorrect_answer, "13");
    }

    #[test]
    fn test_dedupe_scans_only_limit_attempts_with_mistakes() {
        let attempts = [
            with_mistakes(&[("2 × 2", "5")]),
            attempt(GameMode::Cubes, 15, 15, 10.0),
            with_mistakes(&[("3 × 3", "8")]),
            with_mistakes(&[("4 × 4", "15")]),
        ];
        let mistakes = dedupe_recent_mistakes(&attempts, 2);
        let prompts: Vec<_> = mistakes.iter().map(|m| m.question.as_str()).collect();
        assert_eq!(prompts, ["2 × 2", "3 × 3"]);
    }
}
