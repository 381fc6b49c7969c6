use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exercise::Exercise;

/// Where a session came from. Opaque to the engine, handed back to the
/// completion callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSource {
    pub program_id: Option<String>,
    pub day_number: Option<u32>,
    pub week_id: Option<String>,
}

impl SessionSource {
    pub fn new(program_id: impl Into<String>, day_number: u32, week_id: Option<String>) -> Self {
        Self {
            program_id: Some(program_id.into()),
            day_number: Some(day_number),
            week_id,
        }
    }
}

/// The single in-progress workout owned by [`crate::store::SessionStore`].
///
/// Fields are public for reading; mutation outside the store is not part of
/// the contract. The current set number is never stored, see
/// [`crate::progress::current_set_number`].
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutSession {
    pub exercises: Vec<Exercise>,
    pub current_exercise_index: usize,
    /// Completed sets per exercise, same order as `exercises`.
    pub completed_sets: Vec<u32>,
    pub rest_deadline: Option<DateTime<Utc>>,
    pub start_time: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub source: SessionSource,
}

impl WorkoutSession {
    pub(crate) fn new(exercises: Vec<Exercise>, source: SessionSource, now: DateTime<Utc>) -> Self {
        let completed_sets = vec![0; exercises.len()];
        Self {
            exercises,
            current_exercise_index: 0,
            completed_sets,
            rest_deadline: None,
            start_time: now,
            ended_at: None,
            is_active: true,
            source,
        }
    }

    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.exercises.get(self.current_exercise_index)
    }

    pub fn next_exercise(&self) -> Option<&Exercise> {
        self.exercises.get(self.current_exercise_index + 1)
    }

    pub fn completed_for(&self, index: usize) -> u32 {
        self.completed_sets.get(index).copied().unwrap_or(0)
    }

    pub fn is_exercise_done(&self, index: usize) -> bool {
        match self.exercises.get(index) {
            Some(ex) => self.completed_for(index) >= ex.total_sets(),
            None => false,
        }
    }

    pub fn identities(&self) -> Vec<String> {
        crate::exercise::identities(&self.exercises)
    }

    pub fn last_index(&self) -> usize {
        self.exercises.len().saturating_sub(1)
    }
}
