//! Push-to-pull event iteration for no-std async code.
//!
//! # Highlights
//! - Turns a callback-style producer into an async sequence drained one value at a time.
//! - Order-preserving buffer; `next()` calls made before any value exist are served in call order.
//! - Edge-triggered pause/resume signals at configurable high/low watermarks.
//! - The producer's teardown runs exactly once, on end, failure or cancellation.
//!
//! # Quick start
//! ```
//! use futures::executor::block_on;
//! use ph_event_iterator::{EventSource, Handle, IteratorConfig, Teardown};
//!
//! let source = EventSource::new(
//!     |handle: Handle<u32, std::io::Error>| {
//!         handle.push(1);
//!         handle.push(2);
//!         handle.stop();
//!         Teardown::new(|| { /* detach listeners */ })
//!     },
//!     IteratorConfig::default(),
//! )
//! .unwrap();
//!
//! let iter = source.iter();
//! block_on(async {
//!     assert_eq!(iter.next().await.unwrap(), Some(1));
//!     assert_eq!(iter.next().await.unwrap(), Some(2));
//!     assert_eq!(iter.next().await.unwrap(), None);
//! });
//! ```
//!
//! # No-std
//! The crate is `#![no_std]` and needs `alloc`. Tests require `std`.
//!
//! # Semantics
//! - `push` goes straight to the oldest waiting `next()`, or into the buffer.
//! - `stop`/`fail` called inside the producer's `start` take effect once it
//!   returns; later calls take effect immediately. Values pushed before them
//!   are always delivered first.
//! - `Ok(None)` is the terminal result; once reached, every `next()` returns it.
//! - A producer error reaches exactly one `next()`. With the default
//!   [`FailurePolicy::Terminate`] the stream ends right after it.
//! - `cancel()` (or dropping the iterator) rejects outstanding `next()` futures
//!   with [`NextError::Cancelled`].
//! - Dropping a `next()` future that already holds a value passes the value to
//!   the next outstanding `next()`, or back to the front of the buffer.
#![no_std]

extern crate alloc;

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod handle;
pub mod iterator;
mod queue;
mod sync;
pub mod teardown;

pub use config::{FailurePolicy, IteratorConfig, WatermarkHandler};
pub use diagnostic::{Diagnostic, DiagnosticSink};
pub use error::{ConfigError, HandlerError, NextError, Watermark};
pub use handle::Handle;
pub use iterator::{EventIterator, EventSource, Next, Producer};
pub use queue::Resolution;
pub use teardown::Teardown;

#[cfg(test)]
extern crate std;
