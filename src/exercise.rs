use serde::{Deserialize, Serialize};

/// Rest granted between sets when an exercise does not specify one.
pub const DEFAULT_REST_SECS: u32 = 60;

/// One entry of a workout day, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    #[serde(alias = "id")]
    pub identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetitions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_warmup: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_part: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
}

impl Exercise {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            sets: None,
            repetitions: None,
            rest_seconds: None,
            is_warmup: None,
            body_part: None,
            duration_seconds: None,
        }
    }

    pub fn with_sets(mut self, sets: u32) -> Self {
        self.sets = Some(sets);
        self
    }

    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = Some(repetitions);
        self
    }

    pub fn with_rest(mut self, rest_seconds: u32) -> Self {
        self.rest_seconds = Some(rest_seconds);
        self
    }

    pub fn with_duration(mut self, duration_seconds: u32) -> Self {
        self.duration_seconds = Some(duration_seconds);
        self
    }

    pub fn warmup(mut self) -> Self {
        self.is_warmup = Some(true);
        self
    }

    /// Target number of sets; an exercise without `sets` counts as one.
    pub fn total_sets(&self) -> u32 {
        self.sets.unwrap_or(1)
    }

    pub fn rest_seconds(&self) -> u32 {
        self.rest_seconds.unwrap_or(DEFAULT_REST_SECS)
    }

    pub fn is_warmup(&self) -> bool {
        self.is_warmup.unwrap_or(false)
    }

    /// Short prescription label, e.g. `3 x 10` or `45s`.
    pub fn prescription(&self) -> String {
        match (self.sets, self.repetitions, self.duration_seconds) {
            (_, Some(reps), _) => format!("{} x {}", self.total_sets(), reps),
            (_, None, Some(secs)) if self.total_sets() > 1 => {
                format!("{} x {}s", self.total_sets(), secs)
            }
            (_, None, Some(secs)) => format!("{secs}s"),
            (Some(sets), None, None) => format!("{sets} sets"),
            (None, None, None) => "1 set".to_string(),
        }
    }
}

/// Drops warmup entries, keeping the order of the rest.
pub fn without_warmups(exercises: &[Exercise]) -> Vec<Exercise> {
    exercises.iter().filter(|e| !e.is_warmup()).cloned().collect()
}

/// Ordered identity list used for resume-matching.
pub fn identities(exercises: &[Exercise]) -> Vec<String> {
    exercises.iter().map(|e| e.identity.clone()).collect()
}
