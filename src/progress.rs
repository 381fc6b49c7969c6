//! Read-only derivations over a [`WorkoutSession`].

use chrono::{DateTime, Utc};

use crate::session::WorkoutSession;
use crate::util;

/// Sum of target sets across all exercises.
pub fn total_sets(session: &WorkoutSession) -> u64 {
    session
        .exercises
        .iter()
        .map(|e| u64::from(e.total_sets()))
        .sum()
}

pub fn completed_sets_count(session: &WorkoutSession) -> u64 {
    session.completed_sets.iter().map(|&c| u64::from(c)).sum()
}

/// Completed share of all sets, in `[0, 100]`.
pub fn progress_percent(session: &WorkoutSession) -> f64 {
    util::percent(completed_sets_count(session), total_sets(session))
}

/// True when every exercise has reached its target.
pub fn is_complete(session: &WorkoutSession) -> bool {
    (0..session.exercises.len()).all(|i| session.is_exercise_done(i))
}

/// The set about to be performed for exercise `index`, 1-based.
pub fn current_set_number(session: &WorkoutSession, index: usize) -> u32 {
    session.completed_for(index) + 1
}

/// Seconds since the session started. Frozen at `ended_at` once the session
/// has ended.
pub fn elapsed_seconds(session: &WorkoutSession, now: DateTime<Utc>) -> u64 {
    let until = match (session.is_active, session.ended_at) {
        (false, Some(ended)) => ended,
        _ => now,
    };
    (until - session.start_time).num_seconds().max(0) as u64
}

pub fn format_elapsed(secs: u64) -> String {
    util::format_clock(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::Exercise;
    use crate::session::SessionSource;
    use chrono::Duration;

    fn session(exercises: Vec<Exercise>) -> WorkoutSession {
        WorkoutSession::new(exercises, SessionSource::default(), Utc::now())
    }

    #[test]
    fn test_totals_default_missing_sets_to_one() {
        let s = session(vec![
            Exercise::new("a").with_sets(3),
            Exercise::new("b").with_sets(2),
            Exercise::new("c"),
        ]);
        assert_eq!(total_sets(&s), 6);
        assert_eq!(completed_sets_count(&s), 0);
        assert_eq!(progress_percent(&s), 0.0);
    }

    #[test]
    fn test_progress_and_completion() {
        let mut s = session(vec![Exercise::new("a").with_sets(3), Exercise::new("b").with_sets(2)]);
        s.completed_sets = vec![1, 0];
        assert_eq!(progress_percent(&s), 20.0);
        assert!(!is_complete(&s));

        s.completed_sets = vec![3, 2];
        assert_eq!(progress_percent(&s), 100.0);
        assert!(is_complete(&s));
    }

    #[test]
    fn test_empty_session_does_not_divide_by_zero() {
        let s = session(vec![]);
        assert_eq!(progress_percent(&s), 0.0);
        // vacuously complete; start_session never builds one of these
        assert!(is_complete(&s));
    }

    #[test]
    fn test_current_set_number_is_derived() {
        let mut s = session(vec![Exercise::new("a").with_sets(3)]);
        assert_eq!(current_set_number(&s, 0), 1);
        s.completed_sets[0] = 2;
        assert_eq!(current_set_number(&s, 0), 3);
    }

    #[test]
    fn test_elapsed_freezes_after_end() {
        let mut s = session(vec![Exercise::new("a")]);
        let start = s.start_time;
        assert_eq!(elapsed_seconds(&s, start + Duration::seconds(90)), 90);

        s.is_active = false;
        s.ended_at = Some(start + Duration::seconds(120));
        assert_eq!(elapsed_seconds(&s, start + Duration::hours(3)), 120);
    }

    #[test]
    fn test_elapsed_never_negative_on_clock_skew() {
        let s = session(vec![Exercise::new("a")]);
        assert_eq!(elapsed_seconds(&s, s.start_time - Duration::seconds(30)), 0);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(754), "12:34");
    }
}
