//! Photo Gallery Logging & Observability
//!
//! Provides structured logging, the crash-report panic hook and, in debug
//! builds, a background deadlock detector for the `parking_lot` locks used by
//! the viewing subsystem.

mod logging;
mod panic_hook;

pub use logging::{cleanup_old_logs, cleanup_logs_in, init_logging, LogGuard};
pub use panic_hook::init_panic_hook;

use directories::ProjectDirs;
use std::path::PathBuf;

/// Application log directory
pub fn log_dir() -> PathBuf {
    ProjectDirs::from("com", "PhotoGallery", "PhotoGallery")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Initialize all observability features.
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// the lifetime of the process.
pub fn init() -> anyhow::Result<LogGuard> {
    let guard = init_logging(&log_dir())?;
    init_panic_hook();

    #[cfg(debug_assertions)]
    init_deadlock_detector();

    Ok(guard)
}

#[cfg(debug_assertions)]
fn init_deadlock_detector() {
    use std::thread;
    use std::time::Duration;

    let spawned = thread::Builder::new()
        .name("deadlock-detector".into())
        .spawn(|| loop {
            thread::sleep(Duration::from_secs(10));
            let deadlocks = parking_lot::deadlock::check_deadlock();
            if deadlocks.is_empty() {
                continue;
            }
            tracing::error!(count = deadlocks.len(), "Deadlock detected");
            for (i, threads) in deadlocks.iter().enumerate() {
                for t in threads {
                    tracing::error!(cycle = i, thread_id = ?t.thread_id(), "{:#?}", t.backtrace());
                }
            }
        });

    if let Err(e) = spawned {
        tracing::warn!("Failed to start deadlock detector: {}", e);
    }
}
