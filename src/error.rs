//! Error types returned by queue operations
//!
//! Every error that rejects an element hands it back, so a failed insert
//! never loses the caller's value. `Debug` is implemented by hand so that
//! the element type does not need to be `Debug` itself.

use std::fmt;

use thiserror::Error;

/// Returned by [`BlockingQueue::new`](crate::BlockingQueue::new) for an invalid capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// A queue must be able to hold at least one element.
    #[error("queue capacity must be greater than zero")]
    Zero,
}

/// Error returned by the blocking insert operations.
#[derive(PartialEq, Eq, Error)]
pub enum PutError<T> {
    /// The element is a null handle and was not inserted.
    #[error("cannot insert a null element")]
    Null(T),
    /// The waiting call was cancelled through its token before space appeared.
    #[error("insert cancelled while waiting for space")]
    Cancelled(T),
    /// No space appeared before the deadline.
    #[error("timed out waiting for space")]
    Timeout(T),
    /// Element storage could not be grown.
    #[error("failed to allocate storage for the element")]
    Exhausted(T),
}

/// Error returned by [`BlockingQueue::offer`](crate::BlockingQueue::offer).
#[derive(PartialEq, Eq, Error)]
pub enum OfferError<T> {
    /// The element is a null handle and was not inserted.
    #[error("cannot insert a null element")]
    Null(T),
    /// The queue holds `capacity` elements.
    #[error("queue is full")]
    Full(T),
    /// Another thread held the lock.
    #[error("queue lock is contended")]
    Contended(T),
    /// Element storage could not be grown.
    #[error("failed to allocate storage for the element")]
    Exhausted(T),
}

/// Error returned by the blocking remove operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TakeError {
    /// The waiting call was cancelled through its token before an element appeared.
    #[error("take cancelled while waiting for an element")]
    Cancelled,
    /// No element appeared before the deadline.
    #[error("timed out waiting for an element")]
    Timeout,
}

impl<T> PutError<T> {
    /// Returns the element that was not inserted.
    pub fn into_inner(self) -> T {
        match self {
            PutError::Null(e)
            | PutError::Cancelled(e)
            | PutError::Timeout(e)
            | PutError::Exhausted(e) => e,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PutError::Cancelled(_))
    }
}

impl<T> OfferError<T> {
    /// Returns the element that was not inserted.
    pub fn into_inner(self) -> T {
        match self {
            OfferError::Null(e)
            | OfferError::Full(e)
            | OfferError::Contended(e)
            | OfferError::Exhausted(e) => e,
        }
    }

    /// True for the outcomes a blocking `put` would have waited out.
    ///
    /// A contended lock is reported the same way as a full queue here.
    pub fn is_would_block(&self) -> bool {
        matches!(self, OfferError::Full(_) | OfferError::Contended(_))
    }
}

impl<T> fmt::Debug for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutError::Null(_) => f.write_str("Null(..)"),
            PutError::Cancelled(_) => f.write_str("Cancelled(..)"),
            PutError::Timeout(_) => f.write_str("Timeout(..)"),
            PutError::Exhausted(_) => f.write_str("Exhausted(..)"),
        }
    }
}

impl<T> fmt::Debug for OfferError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferError::Null(_) => f.write_str("Null(..)"),
            OfferError::Full(_) => f.write_str("Full(..)"),
            OfferError::Contended(_) => f.write_str("Contended(..)"),
            OfferError::Exhausted(_) => f.write_str("Exhausted(..)"),
        }
    }
}
