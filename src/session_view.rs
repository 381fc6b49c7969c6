use spotter::progress;
use spotter::rest_clock::RestCountdown;
use spotter::store::SessionStore;
use spotter::WorkoutSession;

/// Callback for the exercise video link. Forwarded as-is; the engine has no
/// opinion on what it does.
pub type VideoHandler = Box<dyn FnMut(&str)>;

/// State of the mounted full session view.
///
/// Exists only while the view is on screen. It reads the store, never writes
/// it, so dropping it (closing the view) leaves the session untouched.
pub struct SessionView {
    countdown: Option<RestCountdown>,
    seen_revision: Option<u64>,
    /// Exercise index and completed-set total the countdown was started for
    rest_owner: Option<(usize, u64)>,
    on_video_click: Option<VideoHandler>,
}

impl SessionView {
    pub fn mount(store: &SessionStore) -> Self {
        let mut view = Self {
            countdown: None,
            seen_revision: None,
            rest_owner: None,
            on_video_click: None,
        };
        view.on_tick(store);
        view
    }

    pub fn with_video_handler(mut self, handler: VideoHandler) -> Self {
        self.on_video_click = Some(handler);
        self
    }

    /// Pick up store changes and re-sample the countdown. Returns the
    /// remaining rest seconds.
    pub fn on_tick(&mut self, store: &SessionStore) -> u64 {
        let now = store.now();
        if self.seen_revision != Some(store.revision()) {
            self.seen_revision = Some(store.revision());
            let session = store.session();
            let deadline = session.and_then(|s| s.rest_deadline);
            let owner = session.map(rest_owner);
            let same_rest = owner.is_some() && owner == self.rest_owner;
            self.countdown = match (self.countdown.take(), deadline) {
                (_, None) => None,
                // a later deadline for the same set is an extension
                (Some(mut countdown), Some(deadline)) if same_rest && deadline > countdown.deadline() => {
                    countdown.retarget(deadline, now);
                    Some(countdown)
                }
                (Some(countdown), Some(deadline)) if same_rest && deadline == countdown.deadline() => Some(countdown),
                (_, Some(deadline)) => Some(RestCountdown::new(deadline, now)),
            };
            self.rest_owner = owner;
        }
        self.countdown.as_mut().map_or(0, |c| c.sample(now))
    }

    pub fn countdown(&self) -> Option<&RestCountdown> {
        self.countdown.as_ref()
    }

    pub fn is_resting(&self) -> bool {
        self.countdown.as_ref().is_some_and(|c| !c.is_finished())
    }

    pub fn video_click(&mut self, identity: &str) {
        if let Some(handler) = self.on_video_click.as_mut() {
            handler(identity);
        }
    }
}

fn rest_owner(session: &WorkoutSession) -> (usize, u64) {
    (
        session.current_exercise_index,
        progress::completed_sets_count(session),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotter::clock::ManualClock;
    use spotter::{Exercise, SessionSource};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store() -> (SessionStore, ManualClock) {
        let clock = ManualClock::default();
        let mut store = SessionStore::new(clock.clone());
        store.start_session(
            vec![Exercise::new("a").with_sets(3).with_rest(30)],
            SessionSource::default(),
        );
        (store, clock)
    }

    #[test]
    fn test_countdown_follows_store() {
        let (mut store, clock) = store();
        let mut view = SessionView::mount(&store);
        assert!(view.countdown().is_none());

        store.complete_set();
        assert_eq!(view.on_tick(&store), 30);

        clock.advance_secs(10);
        assert_eq!(view.on_tick(&store), 20);

        store.extend_rest(15);
        assert_eq!(view.on_tick(&store), 35);
        assert_eq!(view.countdown().unwrap().granted_secs(), 45);

        store.skip_rest();
        assert_eq!(view.on_tick(&store), 0);
        assert!(!view.is_resting());
    }

    #[test]
    fn test_set_logged_mid_rest_starts_full_countdown() {
        let (mut store, clock) = store();
        let mut view = SessionView::mount(&store);

        store.complete_set();
        view.on_tick(&store);
        clock.advance_secs(10);
        view.on_tick(&store);

        store.complete_set();
        assert_eq!(view.on_tick(&store), 30);
        let countdown = view.countdown().unwrap();
        assert_eq!(countdown.granted_secs(), 30);
        assert_eq!(countdown.fraction_remaining(), 1.0);
    }

    #[test]
    fn test_set_logged_after_rest_ran_out_starts_full_countdown() {
        let (mut store, clock) = store();
        let mut view = SessionView::mount(&store);

        store.complete_set();
        view.on_tick(&store);
        clock.advance_secs(100);
        assert_eq!(view.on_tick(&store), 0);

        store.complete_set();
        assert_eq!(view.on_tick(&store), 30);
        let countdown = view.countdown().unwrap();
        assert_eq!(countdown.granted_secs(), 30);
        assert_eq!(countdown.fraction_remaining(), 1.0);
    }

    #[test]
    fn test_closing_view_keeps_session() {
        let (mut store, clock) = store();
        store.complete_set();
        let before = store.session().cloned();

        let view = SessionView::mount(&store);
        drop(view);
        clock.advance_secs(600);

        assert_eq!(store.session().cloned(), before);
        let mut reopened = SessionView::mount(&store);
        assert_eq!(reopened.on_tick(&store), 0);
    }

    #[test]
    fn test_video_click_passthrough() {
        let (store, _clock) = store();
        let clicks = Rc::new(RefCell::new(Vec::new()));
        let sink = clicks.clone();
        let mut view = SessionView::mount(&store)
            .with_video_handler(Box::new(move |id| sink.borrow_mut().push(id.to_string())));

        view.video_click("a");
        assert_eq!(*clicks.borrow(), vec!["a".to_string()]);
    }
}
