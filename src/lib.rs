// Library surface: the session engine plus the pieces the binary and the
// integration tests share. Terminal rendering stays in the binary.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod exercise;
pub mod history;
pub mod logging;
pub mod program;
pub mod progress;
pub mod rest_clock;
pub mod resume;
pub mod runtime;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod util;

pub use exercise::Exercise;
pub use session::{SessionSource, WorkoutSession};
pub use store::{SessionStore, SetOutcome};
