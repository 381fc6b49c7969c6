//! Rest countdown derived from an absolute deadline.
//!
//! Nothing here counts down. Remaining time is recomputed from the deadline
//! every time it is asked for, so a view that was suspended for a while
//! shows the right value on its next sample.

use chrono::{DateTime, Utc};

use crate::session::WorkoutSession;

/// Whole seconds left until `deadline`, rounded up. Zero once the deadline
/// has passed.
pub fn remaining_seconds(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (deadline - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis as u64).div_ceil(1000)
    }
}

/// Remaining rest for the session, zero when not resting.
pub fn session_remaining(session: &WorkoutSession, now: DateTime<Utc>) -> u64 {
    session
        .rest_deadline
        .map_or(0, |deadline| remaining_seconds(deadline, now))
}

pub fn is_resting(session: &WorkoutSession, now: DateTime<Utc>) -> bool {
    session_remaining(session, now) > 0
}

/// Countdown sampler owned by a mounted view.
///
/// Created when the view mounts (or the deadline changes) and dropped when it
/// unmounts; holds no timer of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct RestCountdown {
    deadline: DateTime<Utc>,
    granted_secs: u64,
    last_sample: u64,
}

impl RestCountdown {
    pub fn new(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let remaining = remaining_seconds(deadline, now);
        Self {
            deadline,
            granted_secs: remaining,
            last_sample: remaining,
        }
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Follow a deadline moved by `extend_rest`. The granted total grows with
    /// it so the ring does not jump backwards.
    pub fn retarget(&mut self, deadline: DateTime<Utc>, now: DateTime<Utc>) {
        if deadline == self.deadline {
            return;
        }
        let remaining = remaining_seconds(deadline, now);
        if deadline > self.deadline {
            let added = remaining_seconds(deadline, self.deadline);
            self.granted_secs += added;
        } else {
            self.granted_secs = remaining;
        }
        self.deadline = deadline;
        self.last_sample = remaining;
    }

    /// Re-sample against `now` and return the remaining seconds.
    pub fn sample(&mut self, now: DateTime<Utc>) -> u64 {
        self.last_sample = remaining_seconds(self.deadline, now);
        self.last_sample
    }

    pub fn last_sample(&self) -> u64 {
        self.last_sample
    }

    pub fn granted_secs(&self) -> u64 {
        self.granted_secs
    }

    pub fn is_finished(&self) -> bool {
        self.last_sample == 0
    }

    /// Share of the granted rest still left, in `[0, 1]`.
    pub fn fraction_remaining(&self) -> f64 {
        if self.granted_secs == 0 {
            return 0.0;
        }
        (self.last_sample as f64 / self.granted_secs as f64).clamp(0.0, 1.0)
    }
}
