//! Optional input volume boost collaborator
//!
//! Some hosts crank the input gain for the duration of a recording and
//! restore it afterwards. Both calls are best-effort: the engine logs
//! failures at debug level and carries on.

use std::sync::Arc;

use anyhow::Result;

/// Boost/restore hooks invoked around the session lifecycle.
pub trait VolumeBoost: Send + Sync {
    /// Raise the input volume for the session.
    fn boost(&self) -> Result<()>;

    /// Restore the pre-session input volume.
    fn restore(&self) -> Result<()>;
}

/// Shared handle to an optional boost service.
pub type VolumeBoostHandle = Arc<dyn VolumeBoost>;
