//! Cooperative cancellation.
//!
//! A reflow is polled for cancellation before each logical line and before
//! each token or row-sized chunk inside a line. A cancelled call produces no
//! output; callers should treat it as "nothing to draw this frame".

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Error returned when a reflow was cancelled before it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("reflow cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Something a long-running reflow can poll to learn it should stop.
pub trait CancelSignal {
    /// Whether the operation should stop.
    fn is_cancelled(&self) -> bool;

    /// Return `Err(Cancelled)` once cancellation has been requested.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when [`is_cancelled`](Self::is_cancelled) is true.
    fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A signal that never fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    #[inline]
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A cloneable cancellation flag shared between the caller and a reflow.
///
/// Clones observe the same flag, so a UI thread can cancel a reflow running
/// on another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl CancelSignal for CancelToken {
    #[inline]
    fn is_cancelled(&self) -> bool {
        CancelToken::is_cancelled(self)
    }
}

impl CancelSignal for AtomicBool {
    #[inline]
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<T: CancelSignal + ?Sized> CancelSignal for &T {
    #[inline]
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}
