//! Producer-facing side of an iteration.

use alloc::sync::Arc;
use core::fmt;

use crate::error::{HandlerError, Watermark};
use crate::queue::Queue;

/// Given to a producer when an iteration starts.
///
/// Cheap to clone; every clone feeds the same queue. None of the methods
/// block, so they can be called from event callbacks.
pub struct Handle<T, E> {
    queue: Arc<Queue<T, E>>,
}

impl<T, E> Handle<T, E> {
    pub(crate) fn new(queue: Arc<Queue<T, E>>) -> Self {
        Self { queue }
    }

    /// Deliver a value. Goes straight to the oldest waiting `next()` if there
    /// is one, otherwise into the buffer. Dropped once the queue is closed.
    #[inline]
    pub fn push(&self, value: T) {
        self.queue.push(value)
    }

    /// End the stream after everything pushed so far.
    ///
    /// Called while the producer's `start` is still running, it takes effect
    /// once `start` returns. Later calls apply immediately: the teardown runs
    /// and the queue closes before this returns.
    #[inline]
    pub fn stop(&self) {
        self.queue.stop()
    }

    /// Report a producer error. It reaches exactly one `next()` call, in
    /// order with the values pushed before it.
    #[inline]
    pub fn fail(&self, error: E) {
        self.queue.fail(error)
    }

    /// Register a backpressure handler. Each watermark accepts one handler,
    /// including one given through the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::AlreadyRegistered`] if the watermark already has one.
    pub fn on(
        &self,
        watermark: Watermark,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> Result<(), HandlerError> {
        self.queue.register(watermark, Arc::new(handler))
    }

    /// Whether the consumer currently asks the producer to hold back.
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.queue.is_paused()
    }

    /// Whether the queue stopped accepting values.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }
}

impl<T, E> Clone for Handle<T, E> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Handle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("paused", &self.is_paused())
            .field("closed", &self.is_closed())
            .finish()
    }
}
