//! Bounded blocking FIFO queue
//!
//! A fixed-capacity queue guarded by one mutex and two condition variables,
//! `not_full` and `not_empty`. Every operation funnels through the mutex;
//! blocking operations wait on the matching condition and re-check it after
//! every wake, since several waiters may race for the same slot or element.
//!
//! The lock is only ever held through a guard, so it is released on every
//! exit path including cancellation, timeout and unwinding.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::cancel::{CancelToken, Interrupt};
use crate::common::{QueueOps, Ring, WakePolicy};
use crate::error::{CapacityError, OfferError, PutError, TakeError};
use crate::trace::{debug, trace};
use crate::Element;

/// Lock and conditions shared between the queue and any cancel tokens
/// it is parked on.
struct Monitor<T> {
    state: CachePadded<Mutex<Ring<T>>>,
    /// Signalled when an element is removed ("space available").
    not_full: Condvar,
    /// Signalled when an element is inserted ("item available").
    not_empty: Condvar,
    policy: WakePolicy,
}

impl<T> Monitor<T> {
    #[inline]
    fn signal(&self, condition: &Condvar) {
        match self.policy {
            WakePolicy::One => {
                condition.notify_one();
            }
            WakePolicy::All => {
                condition.notify_all();
            }
        }
    }

    /// Waits on `condition`, until `deadline` if one is given.
    ///
    /// Returns true if the deadline passed.
    #[inline]
    fn wait(
        condition: &Condvar,
        guard: &mut MutexGuard<'_, Ring<T>>,
        deadline: Option<Instant>,
    ) -> bool {
        match deadline {
            Some(deadline) => condition.wait_until(guard, deadline).timed_out(),
            None => {
                condition.wait(guard);
                false
            }
        }
    }
}

impl<T: Element> Interrupt for Monitor<T> {
    fn interrupt(&self) {
        let _guard = self.state.lock();
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

/// A bounded, thread-safe FIFO queue with blocking, non-blocking, timed
/// and cancellable operations.
///
/// Share it between threads with an `Arc`. The queue owns each element
/// while it is inside and hands it back on removal.
///
/// ```
/// use bounded_blocking_queue::BlockingQueue;
///
/// let queue = BlockingQueue::new(2).unwrap();
/// queue.put(Box::new(1)).unwrap();
/// assert!(queue.offer(Box::new(2)).is_ok());
/// assert!(queue.offer(Box::new(3)).unwrap_err().is_would_block());
/// assert_eq!(*queue.take(), 1);
/// ```
pub struct BlockingQueue<T: Element> {
    monitor: Arc<Monitor<T>>,
    capacity: usize,
}

impl<T: Element> BlockingQueue<T> {
    /// Creates an empty queue that holds at most `capacity` elements.
    ///
    /// Storage is allocated as elements arrive, so any non-zero capacity up
    /// to `usize::MAX` is accepted.
    pub fn new(capacity: usize) -> Result<Self, CapacityError> {
        Self::with_wake_policy(capacity, WakePolicy::default())
    }

    /// Creates an empty queue that signals waiters according to `policy`.
    pub fn with_wake_policy(capacity: usize, policy: WakePolicy) -> Result<Self, CapacityError> {
        if capacity == 0 {
            return Err(CapacityError::Zero);
        }
        debug!(capacity, ?policy, "queue created");
        Ok(Self {
            monitor: Arc::new(Monitor {
                state: CachePadded::new(Mutex::new(Ring::new(capacity))),
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
                policy,
            }),
            capacity,
        })
    }

    /// Returns the fixed capacity. Never takes the lock.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of held elements, read under the lock.
    ///
    /// Other threads may change the queue as soon as the lock is released,
    /// so treat the result as a hint.
    pub fn size(&self) -> usize {
        self.monitor.state.lock().len()
    }

    /// Hint: whether the queue held no elements during this call.
    pub fn is_empty(&self) -> bool {
        self.monitor.state.lock().is_empty()
    }

    /// Hint: whether the queue held `capacity` elements during this call.
    pub fn is_full(&self) -> bool {
        self.monitor.state.lock().is_full()
    }

    /// Inserts `element` at the tail, blocking while the queue is full.
    ///
    /// A null element is rejected immediately, without blocking.
    pub fn put(&self, element: T) -> Result<(), PutError<T>> {
        self.put_inner(element, None, None)
    }

    /// Like [`put`](Self::put), but returns `PutError::Cancelled` with the
    /// element if `token` is cancelled while the call is waiting for space.
    pub fn put_cancellable(&self, element: T, token: &CancelToken) -> Result<(), PutError<T>> {
        self.put_inner(element, Some(token), None)
    }

    /// Like [`put`](Self::put), but returns `PutError::Timeout` with the
    /// element if no space appears within `timeout`.
    pub fn put_timeout(&self, element: T, timeout: Duration) -> Result<(), PutError<T>> {
        self.put_inner(element, None, Instant::now().checked_add(timeout))
    }

    fn put_inner(
        &self,
        element: T,
        token: Option<&CancelToken>,
        deadline: Option<Instant>,
    ) -> Result<(), PutError<T>> {
        if element.is_null() {
            return Err(PutError::Null(element));
        }

        let monitor = &*self.monitor;
        let _parked = token.map(|t| t.park(self.monitor.clone()));
        let mut ring = monitor.state.lock();
        let mut timed_out = false;

        while ring.is_full() {
            if timed_out {
                trace!("put timed out");
                return Err(PutError::Timeout(element));
            }
            if token.is_some_and(CancelToken::is_cancelled) {
                trace!("put cancelled");
                return Err(PutError::Cancelled(element));
            }
            trace!(size = ring.len(), "put waiting for space");
            timed_out = Monitor::wait(&monitor.not_full, &mut ring, deadline);
        }

        ring.insert(element).map_err(PutError::Exhausted)?;
        monitor.signal(&monitor.not_empty);
        Ok(())
    }

    /// Inserts `element` at the tail if that is possible without waiting.
    ///
    /// Fails with `Contended` if another thread holds the lock and with
    /// `Full` if the queue is at capacity; both are would-block outcomes.
    pub fn offer(&self, element: T) -> Result<(), OfferError<T>> {
        if element.is_null() {
            return Err(OfferError::Null(element));
        }

        let monitor = &*self.monitor;
        let Some(mut ring) = monitor.state.try_lock() else {
            return Err(OfferError::Contended(element));
        };
        if ring.is_full() {
            return Err(OfferError::Full(element));
        }

        ring.insert(element).map_err(OfferError::Exhausted)?;
        monitor.signal(&monitor.not_empty);
        Ok(())
    }

    /// Removes and returns the head element, blocking while the queue is empty.
    pub fn take(&self) -> T {
        let monitor = &*self.monitor;
        let mut ring = monitor.state.lock();
        loop {
            if let Some(element) = ring.remove() {
                monitor.signal(&monitor.not_full);
                return element;
            }
            trace!("take waiting for an element");
            monitor.not_empty.wait(&mut ring);
        }
    }

    /// Like [`take`](Self::take), but returns `TakeError::Cancelled` if
    /// `token` is cancelled while the call is waiting for an element.
    pub fn take_cancellable(&self, token: &CancelToken) -> Result<T, TakeError> {
        self.take_inner(Some(token), None)
    }

    /// Like [`take`](Self::take), but returns `TakeError::Timeout` if no
    /// element appears within `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Result<T, TakeError> {
        self.take_inner(None, Instant::now().checked_add(timeout))
    }

    fn take_inner(
        &self,
        token: Option<&CancelToken>,
        deadline: Option<Instant>,
    ) -> Result<T, TakeError> {
        let monitor = &*self.monitor;
        let _parked = token.map(|t| t.park(self.monitor.clone()));
        let mut ring = monitor.state.lock();
        let mut timed_out = false;

        loop {
            if let Some(element) = ring.remove() {
                monitor.signal(&monitor.not_full);
                return Ok(element);
            }
            if timed_out {
                trace!("take timed out");
                return Err(TakeError::Timeout);
            }
            if token.is_some_and(CancelToken::is_cancelled) {
                trace!("take cancelled");
                return Err(TakeError::Cancelled);
            }
            trace!("take waiting for an element");
            timed_out = Monitor::wait(&monitor.not_empty, &mut ring, deadline);
        }
    }

    /// Removes and returns the head element if that is possible without
    /// waiting. Returns `None` if the queue is empty or the lock is contended.
    pub fn poll(&self) -> Option<T> {
        let monitor = &*self.monitor;
        let mut ring = monitor.state.try_lock()?;
        let element = ring.remove()?;
        monitor.signal(&monitor.not_full);
        Some(element)
    }

    /// Removes every held element in FIFO order and wakes all blocked producers.
    pub fn drain(&self) -> Vec<T> {
        let monitor = &*self.monitor;
        let mut ring = monitor.state.lock();
        let drained: Vec<T> = ring.drain().collect();
        if !drained.is_empty() {
            monitor.not_full.notify_all();
        }
        drained
    }

    /// Destroys the queue.
    ///
    /// `dtor` is called once for every element still inside, in FIFO order,
    /// and takes ownership of it. Without a destructor the remaining
    /// elements are dropped; drain the queue first to keep them.
    pub fn destroy(self, dtor: Option<&mut dyn FnMut(T)>) {
        let remaining = self.drain();
        debug!(remaining = remaining.len(), "queue destroyed");
        if let Some(dtor) = dtor {
            remaining.into_iter().for_each(dtor);
        }
    }
}

impl<T: Element> QueueOps<T> for BlockingQueue<T> {
    fn put(&self, element: T) -> Result<(), PutError<T>> {
        Self::put(self, element)
    }

    fn offer(&self, element: T) -> Result<(), OfferError<T>> {
        Self::offer(self, element)
    }

    fn take(&self) -> T {
        Self::take(self)
    }

    fn poll(&self) -> Option<T> {
        Self::poll(self)
    }

    fn put_cancellable(&self, element: T, token: &CancelToken) -> Result<(), PutError<T>> {
        Self::put_cancellable(self, element, token)
    }

    fn take_cancellable(&self, token: &CancelToken) -> Result<T, TakeError> {
        Self::take_cancellable(self, token)
    }

    fn put_timeout(&self, element: T, timeout: Duration) -> Result<(), PutError<T>> {
        Self::put_timeout(self, element, timeout)
    }

    fn take_timeout(&self, timeout: Duration) -> Result<T, TakeError> {
        Self::take_timeout(self, timeout)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn size(&self) -> usize {
        Self::size(self)
    }
}

impl<T: Element> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingQueue")
            .field("capacity", &self.capacity)
            .field("size", &self.size())
            .field("policy", &self.monitor.policy)
            .finish()
    }
}
