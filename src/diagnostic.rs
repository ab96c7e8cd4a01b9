//! Non-fatal observations reported by the queue.
//!
//! Nothing here ever changes queue behaviour. The default sink forwards to the
//! `log` facade; pass [`DiagnosticSink::new`] to route them elsewhere.

use alloc::sync::Arc;
use core::fmt;

/// Something worth knowing that is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// The buffer reached the high water mark and no high-water handler is registered.
    HighWaterReached { buffered: usize },
    /// A value was pushed after the queue closed; it was dropped.
    PushAfterClose,
    /// `stop`/`fail` arrived after the queue closed; it was ignored.
    SettleAfterClose,
}

impl Diagnostic {
    /// Level used by the default `log` sink.
    pub fn level(&self) -> log::Level {
        match self {
            Diagnostic::HighWaterReached { .. } => log::Level::Warn,
            Diagnostic::PushAfterClose | Diagnostic::SettleAfterClose => log::Level::Debug,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::HighWaterReached { buffered } => {
                write!(f, "event queue reached {buffered} items")
            }
            Diagnostic::PushAfterClose => f.write_str("push ignored: event queue is closed"),
            Diagnostic::SettleAfterClose => {
                f.write_str("stop/fail ignored: event queue is already closed")
            }
        }
    }
}

/// Destination for [`Diagnostic`]s.
#[derive(Clone)]
pub struct DiagnosticSink {
    emit: Arc<dyn Fn(&Diagnostic) + Send + Sync>,
}

impl DiagnosticSink {
    pub fn new(emit: impl Fn(&Diagnostic) + Send + Sync + 'static) -> Self {
        Self {
            emit: Arc::new(emit),
        }
    }

    /// Forward to `log` under the `ph_event_iterator` target.
    pub fn log() -> Self {
        Self::new(|diagnostic| {
            log::log!(target: "ph_event_iterator", diagnostic.level(), "{diagnostic}");
        })
    }

    /// Discard everything.
    pub fn silent() -> Self {
        Self::new(|_| {})
    }

    #[inline]
    pub(crate) fn emit(&self, diagnostic: &Diagnostic) {
        (self.emit)(diagnostic)
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::log()
    }
}

impl fmt::Debug for DiagnosticSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticSink").finish_non_exhaustive()
    }
}
