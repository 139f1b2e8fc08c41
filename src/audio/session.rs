//! Recording session metadata and scratch-file allocation
//!
//! One session exists at a time. Its output file lives in a crate-scoped
//! subdirectory of the OS temp dir and is named uniquely per session, so
//! concurrent app instances and rapid restart cycles never collide.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use jiff::{Timestamp, Zoned};
use uuid::Uuid;

use super::CaptureError;

/// Metadata for the active recording session.
pub struct RecordingSession {
    /// Monotonic start for duration computation.
    pub started: Instant,
    /// Wall-clock start published to consumers.
    pub started_at: Timestamp,
    /// Session output file.
    pub path: PathBuf,
}

impl RecordingSession {
    pub fn begin(path: PathBuf) -> Self {
        Self {
            started: Instant::now(),
            started_at: Timestamp::now(),
            path,
        }
    }
}

/// Directory holding session scratch files, created on demand.
pub fn scratch_dir() -> Result<PathBuf, CaptureError> {
    let dir = std::env::temp_dir().join("voxcap");
    fs::create_dir_all(&dir).map_err(|e| CaptureError::FileSetup(e.to_string()))?;
    Ok(dir)
}

/// Allocate a unique output path: `capture-<timestamp>-<uuid>.wav`.
pub fn allocate_output_path() -> Result<PathBuf, CaptureError> {
    let stamp = Zoned::now().strftime("%Y%m%d-%H%M%S");
    let name = format!("capture-{stamp}-{}.wav", Uuid::new_v4());
    Ok(scratch_dir()?.join(name))
}

/// Delete a session file, best-effort. Failures are logged, never
/// propagated; a missing file is not an error.
pub fn remove_output_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed session file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove session file")
        }
    }
}
