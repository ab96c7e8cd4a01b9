//! Iterator configuration and its validation.

use alloc::sync::Arc;
use core::fmt;

use crate::diagnostic::DiagnosticSink;
use crate::error::ConfigError;

/// Callback fired when a watermark is crossed.
pub type WatermarkHandler = Arc<dyn Fn() + Send + Sync>;

pub const DEFAULT_HIGH_WATER_MARK: usize = 100;
pub const DEFAULT_LOW_WATER_MARK: usize = 1;

/// What a producer failure does to the rest of the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The error is the last thing delivered: the producer is torn down and
    /// the stream ends right after it.
    #[default]
    Terminate,
    /// The error occupies one slot and the stream keeps going. The producer
    /// stays attached until it calls `stop` or the consumer cancels.
    Continue,
}

/// Settings fixed at construction of an [`EventSource`](crate::EventSource).
///
/// ```
/// use ph_event_iterator::IteratorConfig;
///
/// let config = IteratorConfig::default()
///     .with_high_water_mark(16)
///     .with_low_water_mark(4)
///     .with_on_pause(|| {})
///     .with_on_resume(|| {});
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct IteratorConfig {
    pub(crate) high_water_mark: Option<usize>,
    pub(crate) low_water_mark: Option<usize>,
    pub(crate) on_pause: Option<WatermarkHandler>,
    pub(crate) on_resume: Option<WatermarkHandler>,
    pub(crate) failure_policy: FailurePolicy,
    pub(crate) diagnostics: DiagnosticSink,
}

impl IteratorConfig {
    #[must_use]
    pub fn with_high_water_mark(mut self, mark: usize) -> Self {
        self.high_water_mark = Some(mark);
        self
    }

    /// Never signal pause, no matter how large the buffer grows.
    #[must_use]
    pub fn without_high_water_mark(mut self) -> Self {
        self.high_water_mark = None;
        self
    }

    #[must_use]
    pub fn with_low_water_mark(mut self, mark: usize) -> Self {
        self.low_water_mark = Some(mark);
        self
    }

    /// Never signal resume.
    #[must_use]
    pub fn without_low_water_mark(mut self) -> Self {
        self.low_water_mark = None;
        self
    }

    /// Handler fired when the buffer reaches the high water mark.
    /// Requires a matching [`with_on_resume`](Self::with_on_resume).
    #[must_use]
    pub fn with_on_pause(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_pause = Some(Arc::new(handler));
        self
    }

    /// Handler fired when a paused buffer drains to the low water mark.
    #[must_use]
    pub fn with_on_resume(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_resume = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, sink: DiagnosticSink) -> Self {
        self.diagnostics = sink;
        self
    }

    #[inline]
    pub fn high_water_mark(&self) -> Option<usize> {
        self.high_water_mark
    }

    #[inline]
    pub fn low_water_mark(&self) -> Option<usize> {
        self.low_water_mark
    }

    #[inline]
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Check handler pairing and watermark bounds.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first inconsistency found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (&self.on_pause, &self.on_resume) {
            (Some(_), None) => return Err(ConfigError::PauseWithoutResume),
            (None, Some(_)) => return Err(ConfigError::ResumeWithoutPause),
            _ => {}
        }
        if self.high_water_mark == Some(0) {
            return Err(ConfigError::ZeroHighWaterMark);
        }
        if let (Some(low), Some(high)) = (self.low_water_mark, self.high_water_mark) {
            if low > high {
                return Err(ConfigError::LowAboveHigh { low, high });
            }
        }
        Ok(())
    }
}

impl Default for IteratorConfig {
    fn default() -> Self {
        Self {
            high_water_mark: Some(DEFAULT_HIGH_WATER_MARK),
            low_water_mark: Some(DEFAULT_LOW_WATER_MARK),
            on_pause: None,
            on_resume: None,
            failure_policy: FailurePolicy::default(),
            diagnostics: DiagnosticSink::default(),
        }
    }
}

impl fmt::Debug for IteratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IteratorConfig")
            .field("high_water_mark", &self.high_water_mark)
            .field("low_water_mark", &self.low_water_mark)
            .field("on_pause", &self.on_pause.is_some())
            .field("on_resume", &self.on_resume.is_some())
            .field("failure_policy", &self.failure_policy)
            .finish_non_exhaustive()
    }
}
