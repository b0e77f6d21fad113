//! Cooperative cancellation for blocked queue operations
//!
//! A [`CancelToken`] is shared between the thread that may block and the
//! thread that wants to stop it. Before suspending, a blocking call parks
//! the queue it waits on with the token; [`CancelToken::cancel`] raises the
//! flag and wakes every queue currently parked there. The flag is checked
//! under the queue's lock, right next to the wait, so the suspension point
//! is the only place a cancellation takes effect.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::trace::trace;

/// Something a cancelled token must wake up.
pub(crate) trait Interrupt: Send + Sync {
    /// Wakes every thread suspended on this target.
    ///
    /// Must take the target's lock before notifying so a waiter that is
    /// between its flag check and its wait cannot miss the wakeup.
    fn interrupt(&self);
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    parked: Mutex<Vec<Arc<dyn Interrupt>>>,
}

/// Cloneable handle used to cancel blocked `put`/`take` calls.
///
/// All clones share one flag. Once cancelled, a token stays cancelled.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels every call waiting on this token, and every later call that
    /// would have to wait.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        // Snapshot so the list lock is not held while taking queue locks.
        let parked: Vec<Arc<dyn Interrupt>> = self.inner.parked.lock().clone();
        trace!(waiters = parked.len(), "cancel token fired");
        for target in parked {
            target.interrupt();
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Registers `target` to be interrupted on cancel until the guard drops.
    pub(crate) fn park(&self, target: Arc<dyn Interrupt>) -> Parked<'_> {
        self.inner.parked.lock().push(Arc::clone(&target));
        Parked { token: self, target }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Keeps a queue registered with a token for the duration of one wait.
pub(crate) struct Parked<'a> {
    token: &'a CancelToken,
    target: Arc<dyn Interrupt>,
}

impl Drop for Parked<'_> {
    fn drop(&mut self) {
        let mut parked = self.token.inner.parked.lock();
        let addr = Arc::as_ptr(&self.target) as *const ();
        if let Some(pos) = parked
            .iter()
            .position(|t| Arc::as_ptr(t) as *const () == addr)
        {
            parked.swap_remove(pos);
        }
    }
}
