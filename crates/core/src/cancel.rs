//! Process-wide cancellation flag.
//!
//! A single atomic boolean, shared by reference across workers, the
//! progress reporter, and the adaptive controller's polling loop. Raised
//! once (typically from a SIGINT handler installed by the binary crate) and
//! never cleared; every blocking loop in this crate polls it at bounded
//! intervals so cancellation latency stays sub-second. Raising it is not an
//! error: in-flight segments finish their current chunk, the plan and
//! partial output are left on disk, and the caller maps this to exit code
//! 130.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Borrows the underlying flag for call sites that poll it directly
    /// (e.g. a curl `write_function` interrupt check) instead of going
    /// through [`CancelFlag::is_set`].
    pub fn as_atomic(&self) -> &AtomicBool {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear_and_latches() {
        let flag = CancelFlag::new();
        assert!(!flag.is_set());
        flag.set();
        assert!(flag.is_set());
    }

    #[test]
    fn clone_shares_state() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        clone.set();
        assert!(flag.is_set());
    }
}
