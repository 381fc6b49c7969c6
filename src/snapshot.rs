use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use crate::app_dirs::AppDirs;
use crate::session::{SessionSource, WorkoutSession};

/// Persisted shape of a session. Identities only; descriptors come back from
/// the caller on resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub exercise_identities: Vec<String>,
    pub current_exercise_index: usize,
    pub completed_sets: Vec<u32>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_program_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_day_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_week_id: Option<String>,
}

impl SessionSnapshot {
    pub fn from_session(session: &WorkoutSession) -> Self {
        Self {
            exercise_identities: session.identities(),
            current_exercise_index: session.current_exercise_index,
            completed_sets: session.completed_sets.clone(),
            start_time: session.start_time,
            source_program_id: session.source.program_id.clone(),
            source_day_number: session.source.day_number,
            source_week_id: session.source.week_id.clone(),
        }
    }

    pub fn source(&self) -> SessionSource {
        SessionSource {
            program_id: self.source_program_id.clone(),
            day_number: self.source_day_number,
            week_id: self.source_week_id.clone(),
        }
    }

    /// Structurally usable: non-empty and with one count per identity.
    pub fn is_well_formed(&self) -> bool {
        !self.exercise_identities.is_empty()
            && self.exercise_identities.len() == self.completed_sets.len()
    }

    /// Parse a snapshot, treating anything unusable as absent.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match serde_json::from_slice::<SessionSnapshot>(bytes) {
            Ok(snapshot) if snapshot.is_well_formed() => Some(snapshot),
            Ok(_) => {
                warn!("ignoring malformed session snapshot");
                None
            }
            Err(e) => {
                warn!(error = %e, "ignoring unparsable session snapshot");
                None
            }
        }
    }
}

pub trait SnapshotStore: Send + 'static {
    /// Absent or corrupt snapshots load as `None`.
    fn load(&self) -> Option<SessionSnapshot>;
    fn save(&self, snapshot: &SessionSnapshot) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::snapshot_path().unwrap_or_else(|| PathBuf::from("spotter_session.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileSnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Option<SessionSnapshot> {
        let bytes = fs::read(&self.path).ok()?;
        SessionSnapshot::parse(&bytes)
    }

    fn save(&self, snapshot: &SessionSnapshot) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(snapshot).map_err(io::Error::other)?;
        // readers never see a half-written file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// In-process store, shared between clones. Used by tests and `--no-persist`.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    slot: Arc<Mutex<Option<SessionSnapshot>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Option<SessionSnapshot> {
        self.slot.lock().ok()?.clone()
    }

    fn save(&self, snapshot: &SessionSnapshot) -> io::Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| io::Error::other("snapshot slot poisoned"))?;
        *slot = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| io::Error::other("snapshot slot poisoned"))?;
        *slot = None;
        Ok(())
    }
}

enum WriteOp {
    Save(SessionSnapshot),
    Clear,
    Flush(Sender<()>),
}

/// Background writer that applies snapshot writes off the caller's thread.
///
/// Sends never block and failures never reach the caller: they are logged
/// and the in-memory session stays authoritative.
pub struct SnapshotWriter {
    tx: Option<Sender<WriteOp>>,
    handle: Option<JoinHandle<()>>,
}

impl SnapshotWriter {
    pub fn spawn<S: SnapshotStore>(store: S) -> Self {
        let (tx, rx) = mpsc::channel::<WriteOp>();

        let handle = thread::spawn(move || {
            for op in rx {
                match op {
                    WriteOp::Save(snapshot) => match store.save(&snapshot) {
                        Ok(()) => debug!(
                            index = snapshot.current_exercise_index,
                            "session snapshot written"
                        ),
                        Err(e) => warn!(error = %e, "failed to write session snapshot"),
                    },
                    WriteOp::Clear => match store.clear() {
                        Ok(()) => debug!("session snapshot cleared"),
                        Err(e) => warn!(error = %e, "failed to clear session snapshot"),
                    },
                    WriteOp::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn save(&self, snapshot: SessionSnapshot) {
        self.send(WriteOp::Save(snapshot));
    }

    pub fn clear(&self) {
        self.send(WriteOp::Clear);
    }

    /// Block until every write queued so far has been applied.
    pub fn flush(&self) {
        let (done_tx, done_rx) = mpsc::channel();
        self.send(WriteOp::Flush(done_tx));
        let _ = done_rx.recv();
    }

    fn send(&self, op: WriteOp) {
        let Some(tx) = &self.tx else { return };
        if tx.send(op).is_err() {
            warn!("snapshot writer has stopped; dropping write");
        }
    }
}

impl Drop for SnapshotWriter {
    fn drop(&mut self) {
        // closing the channel ends the worker loop after pending writes
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
