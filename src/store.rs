use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::exercise::{self, Exercise};
use crate::progress;
use crate::rest_clock;
use crate::session::{SessionSource, WorkoutSession};
use crate::snapshot::{SessionSnapshot, SnapshotWriter};

/// What a `complete_set` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// No active session, or the current exercise was already done.
    Ignored,
    /// More sets remain; a rest countdown runs until `until`.
    Resting { until: DateTime<Utc> },
    /// The exercise finished and the session moved on to exercise `to`.
    Advanced { to: usize },
    /// The last exercise finished; the session stays on it.
    ExerciseDone,
}

/// Sole owner of the live workout session.
///
/// Every mutation goes through one of the actions below, each of which leaves
/// the session invariants intact. Accepted mutations are handed to the
/// snapshot writer, if one is attached; nothing here waits on I/O.
pub struct SessionStore {
    session: Option<WorkoutSession>,
    clock: Box<dyn Clock>,
    writer: Option<SnapshotWriter>,
    revision: u64,
}

impl SessionStore {
    /// A store that keeps everything in memory.
    pub fn new<C: Clock + 'static>(clock: C) -> Self {
        Self {
            session: None,
            clock: Box::new(clock),
            writer: None,
            revision: 0,
        }
    }

    pub fn with_writer<C: Clock + 'static>(clock: C, writer: SnapshotWriter) -> Self {
        Self {
            writer: Some(writer),
            ..Self::new(clock)
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The live session, if any. Ended sessions are released, never returned.
    pub fn session(&self) -> Option<&WorkoutSession> {
        self.session.as_ref()
    }

    pub fn has_active_session(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_active)
    }

    /// Bumped on every accepted mutation; views compare it to notice changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Start a new session, replacing any existing one. An empty list is
    /// refused and leaves the store as it was.
    pub fn start_session(&mut self, exercises: Vec<Exercise>, source: SessionSource) -> bool {
        if exercises.is_empty() {
            warn!("refusing to start a session with no exercises");
            return false;
        }
        if let Some(previous) = &self.session {
            info!(
                completed = progress::completed_sets_count(previous),
                "replacing the active session"
            );
        }

        let session = WorkoutSession::new(exercises, source, self.clock.now());
        info!(
            exercises = session.exercises.len(),
            total_sets = progress::total_sets(&session),
            "session started"
        );
        self.session = Some(session);
        self.commit();
        true
    }

    /// Bring back a persisted session using the caller's descriptors.
    ///
    /// The descriptor identities must match the snapshot exactly and in
    /// order. Counts and index are clamped into range; rest is not restored.
    pub fn restore(&mut self, exercises: Vec<Exercise>, snapshot: &SessionSnapshot) -> bool {
        if exercises.is_empty() || exercise::identities(&exercises) != snapshot.exercise_identities {
            debug!("snapshot does not match the supplied exercises; not restoring");
            return false;
        }

        let completed_sets = exercises
            .iter()
            .enumerate()
            .map(|(i, ex)| {
                snapshot
                    .completed_sets
                    .get(i)
                    .copied()
                    .unwrap_or(0)
                    .min(ex.total_sets())
            })
            .collect();
        let current_exercise_index = snapshot.current_exercise_index.min(exercises.len() - 1);

        self.session = Some(WorkoutSession {
            exercises,
            current_exercise_index,
            completed_sets,
            rest_deadline: None,
            start_time: snapshot.start_time,
            ended_at: None,
            is_active: true,
            source: snapshot.source(),
        });
        info!(index = current_exercise_index, "session restored from snapshot");
        self.commit();
        true
    }

    /// Record one set of the current exercise.
    ///
    /// Safe to call repeatedly: once the exercise has reached its target the
    /// call does nothing.
    pub fn complete_set(&mut self) -> SetOutcome {
        let now = self.clock.now();
        let Some(session) = self.active_mut() else {
            return SetOutcome::Ignored;
        };

        let index = session.current_exercise_index;
        let Some(total) = session.exercises.get(index).map(Exercise::total_sets) else {
            return SetOutcome::Ignored;
        };
        let done = session.completed_for(index);
        if done >= total {
            debug!(index, "exercise already complete; ignoring set");
            return SetOutcome::Ignored;
        }

        session.completed_sets[index] = done + 1;

        let outcome = if done + 1 < total {
            let rest = session.exercises[index].rest_seconds();
            let until = now + Duration::seconds(i64::from(rest));
            session.rest_deadline = Some(until);
            SetOutcome::Resting { until }
        } else {
            session.rest_deadline = None;
            if index + 1 < session.exercises.len() {
                session.current_exercise_index = index + 1;
                SetOutcome::Advanced { to: index + 1 }
            } else {
                SetOutcome::ExerciseDone
            }
        };

        debug!(index, set = done + 1, total, ?outcome, "set completed");
        self.commit();
        outcome
    }

    pub fn skip_rest(&mut self) {
        let Some(session) = self.active_mut() else { return };
        if session.rest_deadline.take().is_some() {
            debug!("rest skipped");
            self.commit();
        }
    }

    /// Push the running rest deadline back by `delta_secs`. No-op when not
    /// resting.
    pub fn extend_rest(&mut self, delta_secs: u32) {
        let now = self.clock.now();
        let Some(session) = self.active_mut() else { return };
        let Some(deadline) = session.rest_deadline else {
            return;
        };
        if !rest_clock::is_resting(session, now) {
            // rest already ran out; drop the stale deadline
            session.rest_deadline = None;
            debug!("rest already finished; not extending");
            return;
        }
        session.rest_deadline = Some(deadline + Duration::seconds(i64::from(delta_secs)));
        debug!(delta_secs, "rest extended");
        self.commit();
    }

    /// Jump to exercise `index`, clamped into range. Any running rest is
    /// dropped; it belonged to the exercise being left.
    pub fn go_to_exercise(&mut self, index: i64) {
        let Some(session) = self.active_mut() else { return };
        let last = session.last_index() as i64;
        let target = index.clamp(0, last) as usize;
        session.current_exercise_index = target;
        session.rest_deadline = None;
        debug!(requested = index, target, "moved to exercise");
        self.commit();
    }

    pub fn go_to_next_exercise(&mut self) {
        if let Some(current) = self.current_index() {
            self.go_to_exercise(current as i64 + 1);
        }
    }

    pub fn go_to_prev_exercise(&mut self) {
        if let Some(current) = self.current_index() {
            self.go_to_exercise(current as i64 - 1);
        }
    }

    /// End and release the session, deleting any persisted snapshot.
    /// Returns the released record with `ended_at` set.
    pub fn end_session(&mut self) -> Option<WorkoutSession> {
        let now = self.clock.now();
        let ended = self.session.take().map(|mut session| {
            session.is_active = false;
            session.rest_deadline = None;
            session.ended_at = Some(now);
            info!(
                completed = progress::completed_sets_count(&session),
                total = progress::total_sets(&session),
                elapsed_secs = progress::elapsed_seconds(&session, now),
                "session ended"
            );
            session
        });

        self.revision += 1;
        if let Some(writer) = &self.writer {
            writer.clear();
        }
        ended
    }

    /// Acknowledged finish. Runs `on_complete` first when every set is done,
    /// then ends the session. Both the full view and the resume affordance
    /// finish through here.
    pub fn finish_session<F>(&mut self, on_complete: F) -> Option<WorkoutSession>
    where
        F: FnOnce(&WorkoutSession),
    {
        if let Some(session) = self.session.as_ref().filter(|s| s.is_active) {
            if progress::is_complete(session) {
                on_complete(session);
            } else {
                debug!("finishing an incomplete session; completion callback skipped");
            }
        }
        self.end_session()
    }

    /// Wait for queued snapshot writes. Only needed before exit and in tests.
    pub fn flush(&self) {
        if let Some(writer) = &self.writer {
            writer.flush();
        }
    }

    fn current_index(&self) -> Option<usize> {
        self.session
            .as_ref()
            .filter(|s| s.is_active)
            .map(|s| s.current_exercise_index)
    }

    fn active_mut(&mut self) -> Option<&mut WorkoutSession> {
        self.session.as_mut().filter(|s| s.is_active)
    }

    fn commit(&mut self) {
        self.revision += 1;
        if let (Some(writer), Some(session)) = (&self.writer, &self.session) {
            writer.save(SessionSnapshot::from_session(session));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::snapshot::{MemorySnapshotStore, SnapshotStore};
    use assert_matches::assert_matches;

    fn two_exercises() -> Vec<Exercise> {
        vec![
            Exercise::new("a").with_sets(3).with_repetitions(10).with_rest(30),
            Exercise::new("b").with_sets(2).with_repetitions(12),
        ]
    }

    fn started() -> (SessionStore, ManualClock) {
        let clock = ManualClock::default();
        let mut store = SessionStore::new(clock.clone());
        assert!(store.start_session(two_exercises(), SessionSource::default()));
        (store, clock)
    }

    #[test]
    fn test_start_rejects_empty_list() {
        let mut store = SessionStore::new(ManualClock::default());
        assert!(!store.start_session(vec![], SessionSource::default()));
        assert!(store.session().is_none());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_start_replaces_existing_session() {
        let (mut store, _clock) = started();
        store.complete_set();

        store.start_session(vec![Exercise::new("z")], SessionSource::default());

        let s = store.session().unwrap();
        assert_eq!(s.identities(), vec!["z"]);
        assert_eq!(s.completed_sets, vec![0]);
    }

    #[test]
    fn test_complete_set_starts_rest_with_exercise_rest() {
        let (mut store, clock) = started();
        let outcome = store.complete_set();

        let expected = clock.now() + Duration::seconds(30);
        assert_eq!(outcome, SetOutcome::Resting { until: expected });
        assert_eq!(store.session().unwrap().rest_deadline, Some(expected));
    }

    #[test]
    fn test_default_rest_is_sixty_seconds() {
        let (mut store, clock) = started();
        store.go_to_exercise(1);
        store.complete_set();
        let deadline = store.session().unwrap().rest_deadline.unwrap();
        assert_eq!(rest_clock::remaining_seconds(deadline, clock.now()), 60);
    }

    #[test]
    fn test_finishing_exercise_advances_and_clears_rest() {
        let (mut store, _clock) = started();
        store.complete_set();
        store.complete_set();
        let outcome = store.complete_set();

        assert_eq!(outcome, SetOutcome::Advanced { to: 1 });
        let s = store.session().unwrap();
        assert_eq!(s.current_exercise_index, 1);
        assert!(s.rest_deadline.is_none());
    }

    #[test]
    fn test_last_exercise_stays_put_and_guard_holds() {
        let clock = ManualClock::default();
        let mut store = SessionStore::new(clock);
        store.start_session(vec![Exercise::new("only")], SessionSource::default());

        assert_eq!(store.complete_set(), SetOutcome::ExerciseDone);
        let before = store.session().cloned();
        let rev = store.revision();

        assert_matches!(store.complete_set(), SetOutcome::Ignored);
        assert_eq!(store.session().cloned(), before);
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn test_actions_without_session_are_noops() {
        let mut store = SessionStore::new(ManualClock::default());
        assert_eq!(store.complete_set(), SetOutcome::Ignored);
        store.skip_rest();
        store.extend_rest(30);
        store.go_to_exercise(3);
        store.go_to_next_exercise();
        store.go_to_prev_exercise();
        assert!(store.session().is_none());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_extend_rest_only_when_resting() {
        let (mut store, clock) = started();
        store.extend_rest(15);
        assert!(store.session().unwrap().rest_deadline.is_none());

        store.complete_set();
        store.extend_rest(15);
        let deadline = store.session().unwrap().rest_deadline.unwrap();
        assert_eq!(rest_clock::remaining_seconds(deadline, clock.now()), 45);
    }

    #[test]
    fn test_extend_after_rest_ran_out_is_noop() {
        let (mut store, clock) = started();
        store.complete_set();
        clock.advance_secs(35);
        let rev = store.revision();

        store.extend_rest(15);

        let s = store.session().unwrap();
        assert_eq!(rest_clock::session_remaining(s, clock.now()), 0);
        assert!(s.rest_deadline.is_none());
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn test_extend_adds_exactly_delta_mid_rest() {
        let (mut store, clock) = started();
        store.complete_set();
        clock.advance_millis(12_400);
        let before = rest_clock::session_remaining(store.session().unwrap(), clock.now());

        store.extend_rest(15);

        let after = rest_clock::session_remaining(store.session().unwrap(), clock.now());
        assert_eq!(after, before + 15);
    }

    #[test]
    fn test_navigation_clamps_and_clears_rest() {
        let (mut store, _clock) = started();
        store.complete_set();
        assert!(store.session().unwrap().rest_deadline.is_some());

        store.go_to_exercise(99);
        assert_eq!(store.session().unwrap().current_exercise_index, 1);
        assert!(store.session().unwrap().rest_deadline.is_none());

        store.go_to_exercise(-4);
        assert_eq!(store.session().unwrap().current_exercise_index, 0);

        store.go_to_prev_exercise();
        assert_eq!(store.session().unwrap().current_exercise_index, 0);
        store.go_to_next_exercise();
        store.go_to_next_exercise();
        assert_eq!(store.session().unwrap().current_exercise_index, 1);
    }

    #[test]
    fn test_end_session_releases_and_freezes_elapsed() {
        let (mut store, clock) = started();
        clock.advance_secs(125);
        let ended = store.end_session().unwrap();

        assert!(!ended.is_active);
        assert!(ended.rest_deadline.is_none());
        assert!(store.session().is_none());
        clock.advance_secs(600);
        assert_eq!(progress::elapsed_seconds(&ended, clock.now()), 125);
    }

    #[test]
    fn test_finish_calls_back_only_when_complete() {
        let (mut store, _clock) = started();
        let mut called = false;
        store.finish_session(|_| called = true);
        assert!(!called);
        assert!(store.session().is_none());

        let (mut store, _clock) = started();
        for _ in 0..5 {
            store.complete_set();
        }
        let mut seen_active = None;
        store.finish_session(|s| seen_active = Some(s.is_active));
        // callback sees the session before it is torn down
        assert_eq!(seen_active, Some(true));
        assert!(store.session().is_none());
    }

    #[test]
    fn test_accepted_mutations_are_persisted() {
        let snapshots = MemorySnapshotStore::new();
        let clock = ManualClock::default();
        let mut store = SessionStore::with_writer(clock, SnapshotWriter::spawn(snapshots.clone()));

        store.start_session(two_exercises(), SessionSource::new("p", 1, None));
        store.complete_set();
        store.go_to_exercise(1);
        store.flush();

        let snap = snapshots.load().unwrap();
        assert_eq!(snap.completed_sets, vec![1, 0]);
        assert_eq!(snap.current_exercise_index, 1);
        assert_eq!(snap.source_program_id.as_deref(), Some("p"));

        store.end_session();
        store.flush();
        assert!(snapshots.load().is_none());
    }

    #[test]
    fn test_restore_requires_matching_identities() {
        let (mut store, _clock) = started();
        store.complete_set();
        let snap = SessionSnapshot::from_session(store.session().unwrap());
        store.end_session();

        let reordered = vec![two_exercises()[1].clone(), two_exercises()[0].clone()];
        assert!(!store.restore(reordered, &snap));
        assert!(store.session().is_none());

        assert!(store.restore(two_exercises(), &snap));
        let s = store.session().unwrap();
        assert_eq!(s.completed_sets, vec![1, 0]);
        assert_eq!(s.start_time, snap.start_time);
        assert!(s.rest_deadline.is_none());
    }

    #[test]
    fn test_restore_clamps_out_of_range_values() {
        let mut store = SessionStore::new(ManualClock::default());
        let snap = SessionSnapshot {
            exercise_identities: vec!["a".into(), "b".into()],
            current_exercise_index: 9,
            completed_sets: vec![10, 1],
            start_time: Utc::now(),
            source_program_id: None,
            source_day_number: None,
            source_week_id: None,
        };
        assert!(store.restore(two_exercises(), &snap));
        let s = store.session().unwrap();
        assert_eq!(s.completed_sets, vec![3, 1]);
        assert_eq!(s.current_exercise_index, 1);
    }
}
