//! Opaque progress/cancellation token passed through to drivers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cancellation handle threaded through pool and volume operations.
///
/// The storage core never acts on the token itself; it is handed through to
/// driver calls, which may honor it mid-operation. Cloning is cheap and all
/// clones observe the same cancellation state.
#[derive(Clone, Debug, Default)]
pub struct ProgressToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
}

impl ProgressToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the operation this token was passed to.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }
}
