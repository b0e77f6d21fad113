//! Common functionality for bounded queues
//!
//! This module provides the operations trait every queue exposes, the
//! unsynchronized ring state that lives behind the queue's lock, and the
//! wake policy used when signalling waiters.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::{OfferError, PutError, TakeError};

/// How many waiters are signalled after a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WakePolicy {
    /// Wake a single waiter per inserted or removed element.
    #[default]
    One,
    /// Wake every waiter and let them race to re-check the condition.
    All,
}

/// Trait for bounded queue operations
///
/// This trait defines the interface shared by the queue and by handles to
/// it, so producers and consumers can be written generically.
pub trait QueueOps<T> {
    /// Inserts an element at the tail, waiting while the queue is full.
    fn put(&self, element: T) -> Result<(), PutError<T>>;

    /// Inserts an element at the tail without waiting.
    fn offer(&self, element: T) -> Result<(), OfferError<T>>;

    /// Removes the head element, waiting while the queue is empty.
    fn take(&self) -> T;

    /// Removes the head element without waiting.
    ///
    /// Returns None if the queue was empty or the lock was contended.
    fn poll(&self) -> Option<T>;

    /// Like `put`, but returns early once `token` is cancelled.
    fn put_cancellable(&self, element: T, token: &CancelToken) -> Result<(), PutError<T>>;

    /// Like `take`, but returns early once `token` is cancelled.
    fn take_cancellable(&self, token: &CancelToken) -> Result<T, TakeError>;

    /// Like `put`, but gives up after `timeout`.
    fn put_timeout(&self, element: T, timeout: Duration) -> Result<(), PutError<T>>;

    /// Like `take`, but gives up after `timeout`.
    fn take_timeout(&self, timeout: Duration) -> Result<T, TakeError>;

    /// Returns the fixed capacity of the queue
    fn capacity(&self) -> usize;

    /// Returns the number of held elements
    ///
    /// The value may be stale by the time the caller looks at it.
    fn size(&self) -> usize;
}

impl<T, Q: QueueOps<T>> QueueOps<T> for Arc<Q> {
    fn put(&self, element: T) -> Result<(), PutError<T>> {
        (**self).put(element)
    }

    fn offer(&self, element: T) -> Result<(), OfferError<T>> {
        (**self).offer(element)
    }

    fn take(&self) -> T {
        (**self).take()
    }

    fn poll(&self) -> Option<T> {
        (**self).poll()
    }

    fn put_cancellable(&self, element: T, token: &CancelToken) -> Result<(), PutError<T>> {
        (**self).put_cancellable(element, token)
    }

    fn take_cancellable(&self, token: &CancelToken) -> Result<T, TakeError> {
        (**self).take_cancellable(token)
    }

    fn put_timeout(&self, element: T, timeout: Duration) -> Result<(), PutError<T>> {
        (**self).put_timeout(element, timeout)
    }

    fn take_timeout(&self, timeout: Duration) -> Result<T, TakeError> {
        (**self).take_timeout(timeout)
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn size(&self) -> usize {
        (**self).size()
    }
}

/// FIFO storage for held elements
///
/// Not synchronized: every method must be called with the queue's lock held.
/// Storage grows on demand up to `capacity`, so a huge capacity costs nothing
/// until elements actually arrive.
pub(crate) struct Ring<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> Ring<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Appends `element` at the tail.
    ///
    /// The caller has checked `!is_full()`. Hands the element back if storage
    /// could not be grown, leaving the ring untouched.
    pub(crate) fn insert(&mut self, element: T) -> Result<(), T> {
        debug_assert!(!self.is_full());
        if self.items.len() == self.items.capacity() && self.items.try_reserve(1).is_err() {
            return Err(element);
        }
        self.items.push_back(element);
        Ok(())
    }

    /// Removes the head element.
    #[inline]
    pub(crate) fn remove(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Removes every element in FIFO order.
    pub(crate) fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, T> {
        self.items.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_fifo_and_bounds() {
        let mut ring = Ring::new(2);
        assert!(ring.is_empty());
        assert!(!ring.is_full());

        assert!(ring.insert(1).is_ok());
        assert!(ring.insert(2).is_ok());
        assert!(ring.is_full());
        assert_eq!(ring.len(), 2);

        assert_eq!(ring.remove(), Some(1));
        assert!(ring.insert(3).is_ok());
        assert_eq!(ring.drain().collect::<Vec<_>>(), vec![2, 3]);
        assert!(ring.is_empty());
        assert_eq!(ring.remove(), None);
    }

    #[test]
    fn test_ring_huge_capacity_is_lazy() {
        let mut ring = Ring::new(usize::MAX);
        assert!(!ring.is_full());
        assert!(ring.insert(42u8).is_ok());
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_default_wake_policy() {
        assert_eq!(WakePolicy::default(), WakePolicy::One);
    }
}
