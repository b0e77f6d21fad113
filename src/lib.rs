//! # bounded_blocking_queue
//!
//! A bounded, thread-safe FIFO queue for handing owned work items between
//! producer and consumer threads.
//!
//! The queue offers three flavours of every operation:
//!
//! - blocking: [`BlockingQueue::put`] and [`BlockingQueue::take`] wait for
//!   space or an element;
//! - non-blocking: [`BlockingQueue::offer`] and [`BlockingQueue::poll`]
//!   return immediately with a would-block outcome;
//! - bounded waits: the `_cancellable` variants stop at a [`CancelToken`],
//!   the `_timeout` variants at a deadline. Neither changes the queue when
//!   it gives up.

mod cancel;
mod common;
mod error;
mod trace;

pub mod blocking_queue;

// Re-exports for convenience
pub use blocking_queue::BlockingQueue;
pub use cancel::CancelToken;
pub use common::{QueueOps, WakePolicy};
pub use error::{CapacityError, OfferError, PutError, TakeError};
pub use trace::init_tracing;

use std::sync::Arc;

/// Trait for elements that can be stored in a blocking queue
///
/// An element is an owned handle. A handle that refers to nothing is
/// "null" and is rejected by every insert operation.
pub trait Element: Send + 'static {
    /// Whether this handle refers to nothing.
    #[inline]
    fn is_null(&self) -> bool {
        false
    }
}

// Implement Element trait for common owned types
impl Element for u8 {}
impl Element for u16 {}
impl Element for u32 {}
impl Element for u64 {}
impl Element for usize {}
impl Element for i8 {}
impl Element for i16 {}
impl Element for i32 {}
impl Element for i64 {}
impl Element for isize {}
impl Element for String {}

impl<T: ?Sized + Send + 'static> Element for Box<T> {}
impl<T: ?Sized + Send + Sync + 'static> Element for Arc<T> {}
impl<T: Send + 'static> Element for Vec<T> {}

impl<T: Element> Element for Option<T> {
    #[inline]
    fn is_null(&self) -> bool {
        self.as_ref().map_or(true, Element::is_null)
    }
}
