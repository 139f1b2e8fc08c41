//! Microphone permission oracle
//!
//! The engine checks permission synchronously before touching any
//! hardware, and pokes `recheck` whenever a start attempt fails so the
//! host app can refresh its cached permission state (and re-prompt if it
//! chooses to).

use std::sync::Arc;

/// Synchronously queryable microphone permission state.
pub trait PermissionOracle: Send + Sync {
    /// Whether capture is currently permitted.
    fn is_granted(&self) -> bool;

    /// Invoked as a side effect of a failed start so the host can refresh
    /// its permission state. Default: no-op.
    fn recheck(&self) {}
}

/// Default oracle: reports granted and lets the OS prompt at stream-open
/// time on platforms that gate microphone access.
pub struct AssumeGranted;

impl PermissionOracle for AssumeGranted {
    fn is_granted(&self) -> bool {
        true
    }
}

/// Shared handle to the oracle used by the engine.
pub type PermissionHandle = Arc<dyn PermissionOracle>;

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Test oracle with a settable grant flag and a recheck counter.
    #[derive(Default)]
    pub struct FakeOracle {
        pub granted: AtomicBool,
        pub rechecks: AtomicUsize,
    }

    impl FakeOracle {
        pub fn denied() -> Arc<Self> {
            Arc::new(Self {
                granted: AtomicBool::new(false),
                rechecks: AtomicUsize::new(0),
            })
        }
    }

    impl PermissionOracle for FakeOracle {
        fn is_granted(&self) -> bool {
            self.granted.load(Ordering::SeqCst)
        }

        fn recheck(&self) {
            self.rechecks.fetch_add(1, Ordering::SeqCst);
        }
    }
}
