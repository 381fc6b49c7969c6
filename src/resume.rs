//! App-wide discovery of an in-progress session.
//!
//! The controller never owns the session. It is handed the
//! [`SessionStore`] on every call and decides two things: whether the
//! compact resume affordance is shown on the current screen, and whether a
//! freshly mounted exercise list should reopen the full session view.

use std::collections::HashSet;
use tracing::{debug, info};

use crate::exercise::{self, Exercise};
use crate::progress;
use crate::session::WorkoutSession;
use crate::snapshot::{SessionSnapshot, SnapshotStore};
use crate::store::SessionStore;

/// How a screen relates to the resume affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ScreenRole {
    /// Owns exercise selection and start; shows its own inline resume.
    Selection,
    /// Displays an exercise list and reconciles it on mount.
    ExerciseList,
    /// The full session view itself.
    Session,
    Other,
}

/// Token for one mount of a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    /// The list is the session's list: open the full view in place.
    AutoReopen,
    /// A session exists for a different list; leave it on the affordance.
    AffordanceOnly,
    NoSession,
}

/// Data the compact affordance displays.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeBadge {
    pub progress_percent: f64,
    pub is_complete: bool,
    pub exercise_identity: String,
    pub elapsed_secs: u64,
}

impl ResumeBadge {
    fn from_session(session: &WorkoutSession, elapsed_secs: u64) -> Self {
        Self {
            progress_percent: progress::progress_percent(session),
            is_complete: progress::is_complete(session),
            exercise_identity: session
                .current_exercise()
                .map(|e| e.identity.clone())
                .unwrap_or_default(),
            elapsed_secs,
        }
    }
}

/// Order-sensitive comparison of identity lists.
pub fn identities_match(persisted: &[String], displayed: &[String]) -> bool {
    !persisted.is_empty() && persisted == displayed
}

pub struct ResumeController {
    snapshots: Box<dyn SnapshotStore>,
    next_mount: u64,
    reconciled: HashSet<MountId>,
}

impl ResumeController {
    pub fn new<S: SnapshotStore>(snapshots: S) -> Self {
        Self {
            snapshots: Box::new(snapshots),
            next_mount: 0,
            reconciled: HashSet::new(),
        }
    }

    pub fn persisted(&self) -> Option<SessionSnapshot> {
        self.snapshots.load()
    }

    /// The affordance for `role`, or `None` when it should be hidden.
    pub fn badge(&self, store: &SessionStore, role: ScreenRole) -> Option<ResumeBadge> {
        if matches!(role, ScreenRole::Selection | ScreenRole::Session) {
            return None;
        }
        let session = store.session().filter(|s| s.is_active)?;
        Some(ResumeBadge::from_session(
            session,
            progress::elapsed_seconds(session, store.now()),
        ))
    }

    pub fn mount(&mut self) -> MountId {
        self.next_mount += 1;
        MountId(self.next_mount)
    }

    pub fn unmount(&mut self, mount: MountId) {
        self.reconciled.remove(&mount);
    }

    /// Compare a mounted list with the live or persisted session.
    ///
    /// Returns `None` when this mount has already been reconciled. When the
    /// list matches a persisted snapshot and nothing is live, the session is
    /// restored into `store` before `AutoReopen` is returned.
    pub fn reconcile(
        &mut self,
        mount: MountId,
        displayed: &[Exercise],
        store: &mut SessionStore,
    ) -> Option<ResumeDecision> {
        if !self.reconciled.insert(mount) {
            return None;
        }

        let displayed = exercise::without_warmups(displayed);
        let displayed_ids = exercise::identities(&displayed);

        let decision = if let Some(session) = store.session().filter(|s| s.is_active) {
            if identities_match(&session.identities(), &displayed_ids) {
                ResumeDecision::AutoReopen
            } else {
                ResumeDecision::AffordanceOnly
            }
        } else {
            match self.snapshots.load() {
                Some(snapshot)
                    if identities_match(&snapshot.exercise_identities, &displayed_ids) =>
                {
                    if store.restore(displayed, &snapshot) {
                        ResumeDecision::AutoReopen
                    } else {
                        ResumeDecision::NoSession
                    }
                }
                _ => ResumeDecision::NoSession,
            }
        };

        debug!(?mount, ?decision, "reconciled exercise list");
        Some(decision)
    }

    /// Start-up path: bring back the persisted session for `exercises`, the
    /// caller's lookup of the day named by the snapshot's source.
    pub fn rehydrate(&self, store: &mut SessionStore, exercises: &[Exercise]) -> bool {
        if store.has_active_session() {
            return false;
        }
        let Some(snapshot) = self.snapshots.load() else {
            return false;
        };
        let restored = store.restore(exercise::without_warmups(exercises), &snapshot);
        if restored {
            info!(
                program = ?snapshot.source_program_id,
                day = ?snapshot.source_day_number,
                "resumed persisted session"
            );
        }
        restored
    }

    /// End requested from the affordance. Same completion contract as the
    /// full view.
    pub fn finish<F>(&self, store: &mut SessionStore, on_complete: F) -> Option<WorkoutSession>
    where
        F: FnOnce(&WorkoutSession),
    {
        store.finish_session(on_complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::SessionSource;
    use crate::snapshot::MemorySnapshotStore;

    fn day(ids: &[&str]) -> Vec<Exercise> {
        ids.iter().map(|id| Exercise::new(*id).with_sets(2)).collect()
    }

    fn live(ids: &[&str]) -> SessionStore {
        let mut store = SessionStore::new(ManualClock::default());
        store.start_session(day(ids), SessionSource::default());
        store
    }

    #[test]
    fn test_identities_match_is_order_sensitive() {
        let ab = vec!["a".to_string(), "b".to_string()];
        let ba = vec!["b".to_string(), "a".to_string()];
        assert!(identities_match(&ab, &ab));
        assert!(!identities_match(&ab, &ba));
        assert!(!identities_match(&ab, &ab[..1]));
        assert!(!identities_match(&[], &[]));
    }

    #[test]
    fn test_matching_list_auto_reopens() {
        let mut store = live(&["a", "b"]);
        let mut controller = ResumeController::new(MemorySnapshotStore::new());
        let mount = controller.mount();

        let decision = controller.reconcile(mount, &day(&["a", "b"]), &mut store);
        assert_eq!(decision, Some(ResumeDecision::AutoReopen));
    }

    #[test]
    fn test_mismatched_list_leaves_affordance_only() {
        let mut store = live(&["a", "b"]);
        let mut controller = ResumeController::new(MemorySnapshotStore::new());
        let mount = controller.mount();

        let decision = controller.reconcile(mount, &day(&["a", "c"]), &mut store);
        assert_eq!(decision, Some(ResumeDecision::AffordanceOnly));
        assert!(controller.badge(&store, ScreenRole::ExerciseList).is_some());
    }

    #[test]
    fn test_warmups_are_ignored_when_matching() {
        let mut store = live(&["a", "b"]);
        let mut controller = ResumeController::new(MemorySnapshotStore::new());
        let mount = controller.mount();

        let mut shown = vec![Exercise::new("jog").warmup()];
        shown.extend(day(&["a", "b"]));
        assert_eq!(
            controller.reconcile(mount, &shown, &mut store),
            Some(ResumeDecision::AutoReopen)
        );
    }

    #[test]
    fn test_reconcile_runs_once_per_mount() {
        let mut store = live(&["a"]);
        let mut controller = ResumeController::new(MemorySnapshotStore::new());
        let mount = controller.mount();

        assert!(controller.reconcile(mount, &day(&["a"]), &mut store).is_some());
        assert!(controller.reconcile(mount, &day(&["a"]), &mut store).is_none());

        controller.unmount(mount);
        let again = controller.mount();
        assert!(controller.reconcile(again, &day(&["a"]), &mut store).is_some());
    }

    #[test]
    fn test_snapshot_match_restores_session() {
        let snapshots = MemorySnapshotStore::new();
        let mut old = live(&["a", "b"]);
        old.complete_set();
        snapshots
            .save(&SessionSnapshot::from_session(old.session().unwrap()))
            .unwrap();

        let mut store = SessionStore::new(ManualClock::default());
        let mut controller = ResumeController::new(snapshots);
        let mount = controller.mount();

        let decision = controller.reconcile(mount, &day(&["a", "b"]), &mut store);
        assert_eq!(decision, Some(ResumeDecision::AutoReopen));
        assert_eq!(store.session().unwrap().completed_sets, vec![1, 0]);
    }

    #[test]
    fn test_no_session_anywhere() {
        let mut store = SessionStore::new(ManualClock::default());
        let mut controller = ResumeController::new(MemorySnapshotStore::new());
        let mount = controller.mount();
        assert_eq!(
            controller.reconcile(mount, &day(&["a"]), &mut store),
            Some(ResumeDecision::NoSession)
        );
    }

    #[test]
    fn test_badge_hidden_on_selection_and_session_screens() {
        let mut store = live(&["a", "b"]);
        store.complete_set();
        let controller = ResumeController::new(MemorySnapshotStore::new());

        assert!(controller.badge(&store, ScreenRole::Selection).is_none());
        assert!(controller.badge(&store, ScreenRole::Session).is_none());

        let badge = controller.badge(&store, ScreenRole::Other).unwrap();
        assert_eq!(badge.progress_percent, 25.0);
        assert!(!badge.is_complete);
        assert_eq!(badge.exercise_identity, "a");
    }

    #[test]
    fn test_finish_from_badge_uses_completion_contract() {
        let mut store = live(&["a"]);
        store.complete_set();
        store.complete_set();
        let controller = ResumeController::new(MemorySnapshotStore::new());

        let mut completed = Vec::new();
        controller.finish(&mut store, |s| completed.push(s.identities()));

        assert_eq!(completed, vec![vec!["a".to_string()]]);
        assert!(controller.badge(&store, ScreenRole::Other).is_none());
    }
}
