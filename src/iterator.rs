//! Consumer-facing iteration over a push-based producer.
//!
//! # Overview
//! - [`EventSource`] holds a producer and a validated [`IteratorConfig`].
//!   Every call to [`EventSource::iter`] starts a new iteration: a fresh queue,
//!   one invocation of the producer, one [`EventIterator`].
//! - [`EventIterator::next`] registers the request when called, so several
//!   outstanding `next()` futures are served in call order.
//! - Dropping the iterator cancels it and tears the producer down.

use alloc::sync::Arc;
use core::fmt;
use core::future::Future;
use core::marker::PhantomData;
use core::mem;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::stream::{FusedStream, Stream};

use crate::config::IteratorConfig;
use crate::error::{ConfigError, NextError};
use crate::handle::Handle;
use crate::queue::{Pull, PullSlot, Queue, Resolution};
use crate::teardown::Teardown;

/// Something that feeds values into a [`Handle`].
///
/// `start` runs once per iteration and may return a [`Teardown`] to release
/// whatever it attached to. Implemented for `Fn(Handle<T, E>) -> Teardown`.
pub trait Producer<T, E> {
    fn start(&self, handle: Handle<T, E>) -> Teardown;
}

impl<T, E, F> Producer<T, E> for F
where
    F: Fn(Handle<T, E>) -> Teardown,
{
    #[inline]
    fn start(&self, handle: Handle<T, E>) -> Teardown {
        self(handle)
    }
}

/// Reusable entry point: a producer plus its configuration.
pub struct EventSource<T, E, P> {
    producer: P,
    config: IteratorConfig,
    _marker: PhantomData<fn() -> (T, E)>,
}

impl<T, E, P: Producer<T, E>> EventSource<T, E, P> {
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is inconsistent, e.g. a
    /// pause handler without a resume handler.
    pub fn new(producer: P, config: IteratorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            producer,
            config,
            _marker: PhantomData,
        })
    }

    /// Start an iteration. The producer runs before this returns.
    pub fn iter(&self) -> EventIterator<T, E> {
        EventIterator::start(&self.config, |handle| self.producer.start(handle))
    }

    #[inline]
    pub fn config(&self) -> &IteratorConfig {
        &self.config
    }
}

impl<T, E, P> fmt::Debug for EventSource<T, E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Pull side of one iteration.
pub struct EventIterator<T, E> {
    queue: Arc<Queue<T, E>>,
    in_flight: Option<Next<T, E>>,
}

impl<T, E> EventIterator<T, E> {
    /// One-shot iteration over a producer that can only be started once.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is inconsistent; the
    /// producer is not started in that case.
    pub fn new(
        producer: impl FnOnce(Handle<T, E>) -> Teardown,
        config: IteratorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::start(&config, producer))
    }

    fn start(config: &IteratorConfig, producer: impl FnOnce(Handle<T, E>) -> Teardown) -> Self {
        let queue = Arc::new(Queue::new(config));
        let teardown = producer(Handle::new(queue.clone()));
        queue.install_teardown(teardown);
        queue.finish_start();
        Self {
            queue,
            in_flight: None,
        }
    }

    /// Request the next value.
    ///
    /// Resolves to `Ok(Some(value))`, to `Ok(None)` once the stream is over
    /// (and for every call after that), or to an error reported by the
    /// producer. The request is queued immediately, not on first poll.
    pub fn next(&self) -> Next<T, E> {
        Next::new(self.queue.clone())
    }

    /// Stop early. Tears the producer down, rejects outstanding `next()`
    /// futures with [`NextError::Cancelled`] and makes every later `next()`
    /// return `Ok(None)`, the terminal result.
    ///
    /// Returns `true` for the call that did the work and `false` once the
    /// iteration had already been cancelled.
    pub fn cancel(&self) -> bool {
        self.queue.cancel()
    }

    /// Whether the terminal result is fixed.
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.queue.is_finished()
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.queue.is_paused()
    }

    /// Values and errors waiting to be pulled.
    #[inline]
    pub fn buffered_len(&self) -> usize {
        self.queue.buffered_len()
    }
}

impl<T, E> Drop for EventIterator<T, E> {
    fn drop(&mut self) {
        self.queue.cancel();
    }
}

impl<T, E> Unpin for EventIterator<T, E> {}

impl<T, E> Stream for EventIterator<T, E> {
    type Item = Result<T, NextError<E>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let queue = &this.queue;
        let next = this
            .in_flight
            .get_or_insert_with(|| Next::new(queue.clone()));
        let resolution = match Pin::new(next).poll(cx) {
            Poll::Ready(resolution) => resolution,
            Poll::Pending => return Poll::Pending,
        };
        this.in_flight = None;
        Poll::Ready(resolution.transpose())
    }
}

impl<T, E> FusedStream for EventIterator<T, E> {
    fn is_terminated(&self) -> bool {
        self.in_flight.is_none() && self.queue.is_finished()
    }
}

impl<T, E> fmt::Debug for EventIterator<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventIterator")
            .field("buffered", &self.buffered_len())
            .field("paused", &self.is_paused())
            .field("terminated", &self.queue.is_finished())
            .finish()
    }
}

/// Future returned by [`EventIterator::next`].
#[must_use = "futures do nothing unless polled, and a dropped `Next` gives its value back"]
pub struct Next<T, E> {
    queue: Arc<Queue<T, E>>,
    state: NextState<T, E>,
}

enum NextState<T, E> {
    Ready(Resolution<T, E>),
    Waiting(Arc<PullSlot<T, E>>),
    Done,
}

impl<T, E> Next<T, E> {
    fn new(queue: Arc<Queue<T, E>>) -> Self {
        let state = match queue.pull() {
            Pull::Ready(resolution) => NextState::Ready(resolution),
            Pull::Waiting(slot) => NextState::Waiting(slot),
        };
        Self { queue, state }
    }
}

impl<T, E> Unpin for Next<T, E> {}

impl<T, E> Future for Next<T, E> {
    type Output = Resolution<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match mem::replace(&mut this.state, NextState::Done) {
            NextState::Ready(resolution) => Poll::Ready(resolution),
            NextState::Waiting(slot) => {
                // Register first: a resolve racing in from another thread
                // either leaves its outcome here or finds the waker.
                slot.register_waker(cx.waker());
                match slot.take_outcome() {
                    Some(resolution) => Poll::Ready(resolution),
                    None => {
                        this.state = NextState::Waiting(slot);
                        Poll::Pending
                    }
                }
            }
            NextState::Done => panic!("`Next` polled after completion"),
        }
    }
}

impl<T, E> Drop for Next<T, E> {
    fn drop(&mut self) {
        match mem::replace(&mut self.state, NextState::Done) {
            NextState::Ready(resolution) => self.queue.restore(resolution),
            NextState::Waiting(slot) => self.queue.abandon(&slot),
            NextState::Done => {}
        }
    }
}

impl<T, E> fmt::Debug for Next<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            NextState::Ready(_) => "ready",
            NextState::Waiting(_) => "waiting",
            NextState::Done => "done",
        };
        f.debug_struct("Next").field("state", &state).finish()
    }
}
