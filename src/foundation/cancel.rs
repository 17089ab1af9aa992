use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::error::{ReelError, ReelResult};

/// Cooperative cancellation flag shared between an export and its caller.
///
/// Setting the flag never interrupts work in flight; the pipeline observes it at its next
/// checkpoint (before each frame render, around each chunk stage, before merge).
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// `true` once [`CancelHandle::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail with [`ReelError::Cancelled`] when cancellation was requested.
    pub fn checkpoint(&self) -> ReelResult<()> {
        if self.is_cancelled() {
            return Err(ReelError::Cancelled);
        }
        Ok(())
    }
}
