use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::exercise::{self, Exercise};
use crate::session::SessionSource;
use crate::snapshot::SessionSnapshot;

static PROGRAM_DIR: Dir = include_dir!("src/programs");

/// Name of the program shipped with the binary.
pub const STARTER_PROGRAM: &str = "starter";

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("failed to read program file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid program json in {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("built-in program '{0}' not found")]
    UnknownBuiltin(String),
    #[error("program '{0}' has no days with exercises")]
    Empty(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramDay {
    pub day_number: u32,
    #[serde(default)]
    pub week_id: Option<String>,
    #[serde(default)]
    pub title: String,
    pub exercises: Vec<Exercise>,
}

impl ProgramDay {
    /// Exercises the session engine sees: warmups removed.
    pub fn session_exercises(&self) -> Vec<Exercise> {
        exercise::without_warmups(&self.exercises)
    }

    pub fn session_identities(&self) -> Vec<String> {
        exercise::identities(&self.session_exercises())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
    pub name: String,
    pub days: Vec<ProgramDay>,
}

impl Program {
    pub fn builtin(name: &str) -> Result<Self, ProgramError> {
        let file = PROGRAM_DIR
            .get_file(format!("{name}.json"))
            .ok_or_else(|| ProgramError::UnknownBuiltin(name.to_string()))?;
        Self::parse(file.contents(), name)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProgramError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ProgramError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&bytes, &path.display().to_string())
    }

    fn parse(bytes: &[u8], origin: &str) -> Result<Self, ProgramError> {
        let program: Program = serde_json::from_slice(bytes).map_err(|source| ProgramError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        if program.days.iter().all(|d| d.session_exercises().is_empty()) {
            return Err(ProgramError::Empty(program.id));
        }
        Ok(program)
    }

    pub fn day(&self, day_number: u32) -> Option<&ProgramDay> {
        self.days.iter().find(|d| d.day_number == day_number)
    }

    pub fn source_for(&self, day: &ProgramDay) -> SessionSource {
        SessionSource::new(self.id.clone(), day.day_number, day.week_id.clone())
    }

    /// The day a persisted snapshot was started from, if it belongs to this
    /// program.
    pub fn day_for_snapshot(&self, snapshot: &SessionSnapshot) -> Option<&ProgramDay> {
        if snapshot.source_program_id.as_deref() != Some(self.id.as_str()) {
            return None;
        }
        let day = self.day(snapshot.source_day_number?)?;
        match (&snapshot.source_week_id, &day.week_id) {
            (Some(a), Some(b)) if a != b => None,
            _ => Some(day),
        }
    }
}
