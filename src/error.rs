//! Error types surfaced to consumers, producers and at construction.

use core::fmt;

/// Failure observed by a call to [`EventIterator::next`](crate::EventIterator::next).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NextError<E> {
    /// The producer reported `E` through [`Handle::fail`](crate::Handle::fail).
    #[error("producer failed: {0}")]
    Producer(E),
    /// The iteration was cancelled while this request was still waiting.
    #[error("iteration was cancelled")]
    Cancelled,
}

impl<E> NextError<E> {
    /// Returns the producer error, if this is one.
    pub fn into_producer(self) -> Option<E> {
        match self {
            NextError::Producer(error) => Some(error),
            NextError::Cancelled => None,
        }
    }
}

/// Invalid [`IteratorConfig`](crate::IteratorConfig), rejected by
/// [`EventSource::new`](crate::EventSource::new).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot define a pause handler without a resume handler")]
    PauseWithoutResume,
    #[error("cannot define a resume handler without a pause handler")]
    ResumeWithoutPause,
    #[error("high water mark must be greater than zero")]
    ZeroHighWaterMark,
    #[error("low water mark {low} exceeds high water mark {high}")]
    LowAboveHigh { low: usize, high: usize },
}

/// Which threshold a backpressure handler is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Watermark {
    /// Buffer grew to the high water mark; the producer should pause.
    High,
    /// Buffer drained to the low water mark; the producer may resume.
    Low,
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Watermark::High => f.write_str("high-water"),
            Watermark::Low => f.write_str("low-water"),
        }
    }
}

/// Handler registration failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("a {0} handler is already registered")]
    AlreadyRegistered(Watermark),
}
