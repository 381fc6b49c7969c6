use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Mutex, Once};
use tracing::info;
use tracing_subscriber::EnvFilter;

static INIT_TRACING: Once = Once::new();

/// Environment variable holding the log filter, e.g. `SPOTTER_LOG=debug`.
pub const LOG_ENV: &str = "SPOTTER_LOG";

/// Route tracing output to `path`. The terminal belongs to the UI, so nothing
/// is written to stdout or stderr. Only the first call does anything; later
/// calls return `Ok`.
pub fn init_file_logging(path: &Path) -> io::Result<()> {
    let mut result = Ok(());
    INIT_TRACING.call_once(|| {
        result = open_log_file(path).map(|file| {
            let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();

            info!("spotter tracing initialized");
        });
    });
    result
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_log_file_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("spotter.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_open_log_file_reports_unusable_directory() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("state");
        fs::write(&blocker, b"not a directory").unwrap();

        assert!(open_log_file(&blocker.join("spotter.log")).is_err());
    }
}
