//! Producer cleanup callback.

use alloc::boxed::Box;
use core::fmt;

/// Cleanup returned by a producer when it starts.
///
/// The queue runs it at most once: on natural end, on a terminating failure,
/// or when the consumer cancels (or drops) the iterator. Use it to detach
/// listeners or close the underlying stream.
#[must_use]
#[derive(Default)]
pub struct Teardown {
    hook: Option<Box<dyn FnOnce() + Send>>,
}

impl Teardown {
    pub fn new(hook: impl FnOnce() + Send + 'static) -> Self {
        Self {
            hook: Some(Box::new(hook)),
        }
    }

    /// Nothing to release.
    #[inline]
    pub const fn none() -> Self {
        Self { hook: None }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.hook.is_none()
    }

    pub(crate) fn run(self) {
        if let Some(hook) = self.hook {
            hook();
        }
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("armed", &self.hook.is_some())
            .finish()
    }
}
