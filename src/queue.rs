//! Queue pairing producer pushes with consumer pulls.
//!
//! # Overview
//! - `buffer` holds records produced but not yet pulled, `backlog` holds pulls
//!   that arrived before any record. At most one of them is non-empty.
//! - `stop`/`fail` issued while the producer's `start` is still running are
//!   recorded as deferred settlements and applied once it returns, after the
//!   teardown is installed. Pushes made during `start` are always buffered
//!   ahead of them. From then on settlements apply immediately.
//! - A record handed to a pull that is dropped unobserved goes to the next
//!   waiting pull, or back to the front of the buffer if nobody waits.
//! - Pause/resume are edge-triggered against the configured watermarks.
//! - The teardown hook is taken out of the state when it fires, so it can run
//!   only once whatever the order of stop, fail and cancel.
//!
//! # Locking
//! State sits behind one short-lived spin lock. Teardown, wakers, watermark
//! handlers and diagnostics are collected into [`Effects`] and run after the
//! lock is released, so any of them may call back into the queue.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::task::Waker;

use spin::Mutex;

use crate::config::{FailurePolicy, IteratorConfig, WatermarkHandler};
use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::error::{HandlerError, NextError, Watermark};
use crate::sync::{AtomicBool, Ordering};
use crate::teardown::Teardown;

/// What a single pull resolves to. `Ok(None)` is the terminal sentinel.
pub type Resolution<T, E> = Result<Option<T>, NextError<E>>;

enum Record<T, E> {
    Item(T),
    Failed(E),
    End,
}

enum Settlement<E> {
    End,
    Fail(E),
}

/// Outcome of a pull at call time.
pub(crate) enum Pull<T, E> {
    Ready(Resolution<T, E>),
    Waiting(Arc<PullSlot<T, E>>),
}

/// A pull waiting in the backlog.
pub(crate) struct PullSlot<T, E> {
    inner: Mutex<SlotInner<T, E>>,
}

struct SlotInner<T, E> {
    outcome: Option<Resolution<T, E>>,
    waker: Option<Waker>,
}

impl<T, E> PullSlot<T, E> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                outcome: None,
                waker: None,
            }),
        }
    }

    /// Store the outcome, handing back the waker to wake once unlocked.
    fn resolve(&self, outcome: Resolution<T, E>) -> Option<Waker> {
        let mut inner = self.inner.lock();
        inner.outcome = Some(outcome);
        inner.waker.take()
    }

    pub(crate) fn register_waker(&self, waker: &Waker) {
        let mut inner = self.inner.lock();
        match inner.waker.as_ref() {
            Some(existing) if existing.will_wake(waker) => {}
            _ => {
                inner.waker.replace(waker.clone());
            }
        }
    }

    pub(crate) fn take_outcome(&self) -> Option<Resolution<T, E>> {
        self.inner.lock().outcome.take()
    }

}

/// Side effects gathered under the lock and run after it is released.
struct Effects {
    teardown: Option<Teardown>,
    wakers: Vec<Waker>,
    handlers: Vec<WatermarkHandler>,
    diagnostics: Vec<Diagnostic>,
}

impl Effects {
    const fn new() -> Self {
        Self {
            teardown: None,
            wakers: Vec::new(),
            handlers: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn wake(&mut self, waker: Option<Waker>) {
        if let Some(waker) = waker {
            self.wakers.push(waker);
        }
    }

    fn run(self, sink: &DiagnosticSink) {
        if let Some(teardown) = self.teardown {
            log::trace!(target: "ph_event_iterator", "running producer teardown");
            teardown.run();
        }
        for waker in self.wakers {
            waker.wake();
        }
        for handler in self.handlers {
            handler();
        }
        for diagnostic in &self.diagnostics {
            sink.emit(diagnostic);
        }
    }
}

struct State<T, E> {
    buffer: VecDeque<Record<T, E>>,
    backlog: VecDeque<Arc<PullSlot<T, E>>>,
    deferred: VecDeque<Settlement<E>>,
    /// The producer's `start` returned; settlements no longer wait.
    started: bool,
    teardown: Option<Teardown>,
    torn_down: bool,
    /// A terminal settlement or cancel was applied; pushes are dropped.
    closed: bool,
    /// The terminal sentinel is fixed; every pull returns it.
    finished: bool,
    on_pause: Option<WatermarkHandler>,
    on_resume: Option<WatermarkHandler>,
}

impl<T, E> State<T, E> {
    fn tear_down(&mut self, effects: &mut Effects) {
        if !self.torn_down {
            self.torn_down = true;
            effects.teardown = self.teardown.take();
        }
    }

    /// Records the consumer still has to drain. The trailing `End` marker is
    /// not one of them.
    fn buffered(&self) -> usize {
        match self.buffer.back() {
            Some(Record::End) => self.buffer.len() - 1,
            _ => self.buffer.len(),
        }
    }

    /// Give an unobserved outcome back: to the oldest waiting pull if there
    /// is one, otherwise to the front of the buffer.
    fn restore(&mut self, effects: &mut Effects, outcome: Resolution<T, E>) {
        if self.finished || matches!(outcome, Ok(None) | Err(NextError::Cancelled)) {
            return;
        }
        if let Some(slot) = self.backlog.pop_front() {
            effects.wake(slot.resolve(outcome));
            return;
        }
        match outcome {
            Ok(Some(value)) => self.buffer.push_front(Record::Item(value)),
            Err(NextError::Producer(error)) => self.buffer.push_front(Record::Failed(error)),
            Ok(None) | Err(NextError::Cancelled) => {}
        }
    }

    fn settle_backlog(&mut self, effects: &mut Effects, outcome: impl Fn() -> Resolution<T, E>) {
        for slot in self.backlog.drain(..) {
            effects.wake(slot.resolve(outcome()));
        }
    }
}

pub(crate) struct Queue<T, E> {
    state: Mutex<State<T, E>>,
    paused: AtomicBool,
    high_water_mark: Option<usize>,
    low_water_mark: Option<usize>,
    failure_policy: FailurePolicy,
    diagnostics: DiagnosticSink,
}

impl<T, E> Queue<T, E> {
    pub(crate) fn new(config: &IteratorConfig) -> Self {
        Self {
            state: Mutex::new(State {
                buffer: VecDeque::new(),
                backlog: VecDeque::new(),
                deferred: VecDeque::new(),
                started: false,
                teardown: None,
                torn_down: false,
                closed: false,
                finished: false,
                on_pause: config.on_pause.clone(),
                on_resume: config.on_resume.clone(),
            }),
            paused: AtomicBool::new(false),
            high_water_mark: config.high_water_mark,
            low_water_mark: config.low_water_mark,
            failure_policy: config.failure_policy,
            diagnostics: config.diagnostics.clone(),
        }
    }

    /// Store the producer's cleanup. Runs it straight away if the queue was
    /// already torn down before the producer returned.
    pub(crate) fn install_teardown(&self, teardown: Teardown) {
        let late = {
            let mut state = self.state.lock();
            if state.torn_down {
                Some(teardown)
            } else {
                state.teardown = Some(teardown);
                None
            }
        };
        if let Some(teardown) = late {
            teardown.run();
        }
    }

    pub(crate) fn push(&self, value: T) {
        let mut effects = Effects::new();
        {
            let mut state = self.state.lock();
            if state.closed {
                effects.diagnostics.push(Diagnostic::PushAfterClose);
            } else if let Some(slot) = state.backlog.pop_front() {
                effects.wake(slot.resolve(Ok(Some(value))));
            } else {
                state.buffer.push_back(Record::Item(value));
                self.check_high_water(&mut state, &mut effects);
            }
        }
        effects.run(&self.diagnostics);
    }

    fn check_high_water(&self, state: &mut State<T, E>, effects: &mut Effects) {
        let Some(high) = self.high_water_mark else {
            return;
        };
        let buffered = state.buffered();
        if buffered < high || self.paused.swap(true, Ordering::AcqRel) {
            return;
        }
        match &state.on_pause {
            Some(handler) => effects.handlers.push(handler.clone()),
            None => effects
                .diagnostics
                .push(Diagnostic::HighWaterReached { buffered }),
        }
    }

    fn check_low_water(&self, state: &mut State<T, E>, effects: &mut Effects) {
        let Some(low) = self.low_water_mark else {
            return;
        };
        if state.buffered() > low || !self.paused.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(handler) = &state.on_resume {
            effects.handlers.push(handler.clone());
        }
    }

    pub(crate) fn stop(&self) {
        self.settle(Settlement::End);
    }

    pub(crate) fn fail(&self, error: E) {
        self.settle(Settlement::Fail(error));
    }

    fn settle(&self, settlement: Settlement<E>) {
        let mut effects = Effects::new();
        {
            let mut state = self.state.lock();
            state.deferred.push_back(settlement);
            if state.started {
                self.drain_deferred(&mut state, &mut effects);
            }
        }
        effects.run(&self.diagnostics);
    }

    /// The producer's `start` returned: apply what it settled, in call order,
    /// and settle immediately from now on.
    pub(crate) fn finish_start(&self) {
        let mut effects = Effects::new();
        {
            let mut state = self.state.lock();
            state.started = true;
            self.drain_deferred(&mut state, &mut effects);
        }
        effects.run(&self.diagnostics);
    }

    fn drain_deferred(&self, state: &mut State<T, E>, effects: &mut Effects) {
        while let Some(settlement) = state.deferred.pop_front() {
            if state.closed {
                effects.diagnostics.push(Diagnostic::SettleAfterClose);
                continue;
            }
            match settlement {
                Settlement::End => {
                    state.tear_down(effects);
                    state.closed = true;
                    if state.backlog.is_empty() {
                        state.buffer.push_back(Record::End);
                    } else {
                        state.settle_backlog(effects, || Ok(None));
                        state.finished = true;
                    }
                }
                Settlement::Fail(error) => match self.failure_policy {
                    FailurePolicy::Terminate => {
                        state.tear_down(effects);
                        state.closed = true;
                        match state.backlog.pop_front() {
                            Some(slot) => {
                                effects.wake(slot.resolve(Err(NextError::Producer(error))));
                                state.settle_backlog(effects, || Ok(None));
                                state.finished = true;
                            }
                            None => {
                                state.buffer.push_back(Record::Failed(error));
                                state.buffer.push_back(Record::End);
                            }
                        }
                    }
                    FailurePolicy::Continue => match state.backlog.pop_front() {
                        Some(slot) => effects.wake(slot.resolve(Err(NextError::Producer(error)))),
                        None => state.buffer.push_back(Record::Failed(error)),
                    },
                },
            }
        }
    }

    /// Consumer side of `next`: take the oldest record or join the backlog.
    pub(crate) fn pull(&self) -> Pull<T, E> {
        let mut effects = Effects::new();
        let pull = {
            let mut state = self.state.lock();
            if state.finished {
                Pull::Ready(Ok(None))
            } else {
                match state.buffer.pop_front() {
                    Some(Record::Item(value)) => {
                        self.check_low_water(&mut state, &mut effects);
                        Pull::Ready(Ok(Some(value)))
                    }
                    Some(Record::Failed(error)) => {
                        self.check_low_water(&mut state, &mut effects);
                        Pull::Ready(Err(NextError::Producer(error)))
                    }
                    Some(Record::End) => {
                        state.finished = true;
                        Pull::Ready(Ok(None))
                    }
                    None => {
                        let slot = Arc::new(PullSlot::new());
                        state.backlog.push_back(slot.clone());
                        Pull::Waiting(slot)
                    }
                }
            }
        };
        effects.run(&self.diagnostics);
        pull
    }

    /// A waiting pull was dropped before it observed its outcome.
    ///
    /// Still queued: leave the backlog. Already handed a value or an error:
    /// pass it on so the next pull gets it.
    pub(crate) fn abandon(&self, slot: &Arc<PullSlot<T, E>>) {
        let mut effects = Effects::new();
        {
            let mut state = self.state.lock();
            let before = state.backlog.len();
            state.backlog.retain(|queued| !Arc::ptr_eq(queued, slot));
            if state.backlog.len() == before
                && let Some(outcome) = slot.take_outcome()
            {
                state.restore(&mut effects, outcome);
            }
        }
        effects.run(&self.diagnostics);
    }

    /// A pull that completed at call time was dropped without being polled.
    pub(crate) fn restore(&self, outcome: Resolution<T, E>) {
        let mut effects = Effects::new();
        self.state.lock().restore(&mut effects, outcome);
        effects.run(&self.diagnostics);
    }

    /// Consumer-initiated early termination. Returns `true` for the call that
    /// actually terminated the queue.
    pub(crate) fn cancel(&self) -> bool {
        let mut effects = Effects::new();
        let cancelled = {
            let mut state = self.state.lock();
            if state.finished && state.torn_down {
                false
            } else {
                state.tear_down(&mut effects);
                state.closed = true;
                state.finished = true;
                state.deferred.clear();
                state.buffer.clear();
                state.settle_backlog(&mut effects, || Err(NextError::Cancelled));
                true
            }
        };
        effects.run(&self.diagnostics);
        cancelled
    }

    pub(crate) fn register(
        &self,
        watermark: Watermark,
        handler: WatermarkHandler,
    ) -> Result<(), HandlerError> {
        let mut state = self.state.lock();
        let slot = match watermark {
            Watermark::High => &mut state.on_pause,
            Watermark::Low => &mut state.on_resume,
        };
        if slot.is_some() {
            return Err(HandlerError::AlreadyRegistered(watermark));
        }
        *slot = Some(handler);
        Ok(())
    }

    #[inline]
    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.state.lock().finished
    }

    pub(crate) fn buffered_len(&self) -> usize {
        self.state.lock().buffered()
    }

    #[cfg(test)]
    fn backlog_len(&self) -> usize {
        self.state.lock().backlog.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::vec;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let bump = {
            let count = count.clone();
            move || {
                count.fetch_add(1, Ordering::SeqCst);
            }
        };
        (count, bump)
    }

    fn queue(config: IteratorConfig) -> Queue<&'static str, &'static str> {
        Queue::new(&config.with_diagnostics(DiagnosticSink::silent()))
    }

    fn ready(pull: Pull<&'static str, &'static str>) -> Resolution<&'static str, &'static str> {
        match pull {
            Pull::Ready(resolution) => resolution,
            Pull::Waiting(_) => panic!("pull should be ready"),
        }
    }

    fn waiting(pull: Pull<&'static str, &'static str>) -> Arc<PullSlot<&'static str, &'static str>> {
        match pull {
            Pull::Waiting(slot) => slot,
            Pull::Ready(_) => panic!("pull should be waiting"),
        }
    }

    #[test]
    fn buffered_items_come_out_in_push_order() {
        let q = queue(IteratorConfig::default());
        q.push("a");
        q.push("b");

        assert_eq!(ready(q.pull()), Ok(Some("a")));
        assert_eq!(ready(q.pull()), Ok(Some("b")));
        assert_eq!(q.buffered_len(), 0);
    }

    #[test]
    fn pushes_pair_with_pulls_in_call_order() {
        let q = queue(IteratorConfig::default());
        let first = waiting(q.pull());
        let second = waiting(q.pull());
        assert_eq!(q.backlog_len(), 2);

        q.push("a");
        q.push("b");

        assert_eq!(first.take_outcome(), Some(Ok(Some("a"))));
        assert_eq!(second.take_outcome(), Some(Ok(Some("b"))));
        assert_eq!(q.buffered_len(), 0);
        assert_eq!(q.backlog_len(), 0);
    }

    #[test]
    fn stop_during_start_waits_for_start_to_return() {
        let q = queue(IteratorConfig::default());
        let (torn, hook) = counter();
        q.install_teardown(Teardown::new(hook));

        q.push("a");
        q.stop();
        q.push("b");
        assert_eq!(torn.load(Ordering::SeqCst), 0);
        assert!(!q.is_closed());

        q.finish_start();
        assert_eq!(torn.load(Ordering::SeqCst), 1);
        assert!(q.is_closed());

        assert_eq!(ready(q.pull()), Ok(Some("a")));
        assert_eq!(ready(q.pull()), Ok(Some("b")));
        assert_eq!(ready(q.pull()), Ok(None));
        assert_eq!(ready(q.pull()), Ok(None));
    }

    #[test]
    fn stop_resolves_every_waiting_pull_with_the_sentinel() {
        let q = queue(IteratorConfig::default());
        let first = waiting(q.pull());
        let second = waiting(q.pull());

        q.stop();
        q.finish_start();

        assert_eq!(first.take_outcome(), Some(Ok(None)));
        assert_eq!(second.take_outcome(), Some(Ok(None)));
        assert!(q.is_finished());
        assert_eq!(ready(q.pull()), Ok(None));
    }

    #[test]
    fn terminating_failure_rejects_oldest_and_ends_the_rest() {
        let q = queue(IteratorConfig::default());
        let (torn, hook) = counter();
        q.install_teardown(Teardown::new(hook));
        let first = waiting(q.pull());
        let second = waiting(q.pull());

        q.fail("boom");
        q.finish_start();

        assert_eq!(first.take_outcome(), Some(Err(NextError::Producer("boom"))));
        assert_eq!(second.take_outcome(), Some(Ok(None)));
        assert_eq!(torn.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn buffered_failure_keeps_its_place() {
        let q = queue(IteratorConfig::default());
        q.push("a");
        q.fail("boom");
        q.finish_start();

        assert_eq!(ready(q.pull()), Ok(Some("a")));
        assert_eq!(ready(q.pull()), Err(NextError::Producer("boom")));
        assert_eq!(ready(q.pull()), Ok(None));
    }

    #[test]
    fn continuing_failure_keeps_the_stream_open() {
        let q = queue(IteratorConfig::default().with_failure_policy(FailurePolicy::Continue));
        let (torn, hook) = counter();
        q.install_teardown(Teardown::new(hook));

        q.fail("hiccup");
        q.finish_start();
        q.push("a");

        assert_eq!(ready(q.pull()), Err(NextError::Producer("hiccup")));
        assert_eq!(ready(q.pull()), Ok(Some("a")));
        assert_eq!(torn.load(Ordering::SeqCst), 0);
        assert!(!q.is_closed());
    }

    #[test]
    fn teardown_runs_once_across_stop_and_cancel() {
        let q = queue(IteratorConfig::default());
        let (torn, hook) = counter();
        q.install_teardown(Teardown::new(hook));

        q.stop();
        q.finish_start();
        assert!(q.cancel());
        assert!(!q.cancel());
        assert_eq!(torn.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_rejects_waiting_pulls_and_drops_the_buffer() {
        let q = queue(IteratorConfig::default());
        let slot = waiting(q.pull());

        assert!(q.cancel());
        assert_eq!(slot.take_outcome(), Some(Err(NextError::Cancelled)));

        q.push("late");
        assert_eq!(q.buffered_len(), 0);
        assert_eq!(ready(q.pull()), Ok(None));
    }

    #[test]
    fn teardown_installed_after_cancel_runs_immediately() {
        let q = queue(IteratorConfig::default());
        q.cancel();
        let (torn, hook) = counter();
        q.install_teardown(Teardown::new(hook));
        assert_eq!(torn.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn high_water_is_edge_triggered() {
        let (paused, on_pause) = counter();
        let (resumed, on_resume) = counter();
        let q = queue(
            IteratorConfig::default()
                .with_high_water_mark(1)
                .with_on_pause(on_pause)
                .with_on_resume(on_resume),
        );

        q.push("a");
        assert!(q.is_paused());
        assert_eq!(paused.load(Ordering::SeqCst), 1);

        q.push("b");
        assert_eq!(paused.load(Ordering::SeqCst), 1);
        assert_eq!(resumed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn low_water_is_edge_triggered() {
        let (paused, on_pause) = counter();
        let (resumed, on_resume) = counter();
        let q = queue(
            IteratorConfig::default()
                .with_high_water_mark(3)
                .with_low_water_mark(1)
                .with_on_pause(on_pause)
                .with_on_resume(on_resume),
        );
        for item in ["a", "b", "c"] {
            q.push(item);
        }
        assert_eq!(paused.load(Ordering::SeqCst), 1);

        let _ = q.pull();
        assert_eq!(resumed.load(Ordering::SeqCst), 0);
        let _ = q.pull();
        assert_eq!(resumed.load(Ordering::SeqCst), 1);
        assert!(!q.is_paused());
        let _ = q.pull();
        assert_eq!(resumed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn high_water_without_handler_reports_diagnostic_once() {
        let seen = Arc::new(std::sync::Mutex::new(vec![]));
        let sink = {
            let seen = seen.clone();
            DiagnosticSink::new(move |d| seen.lock().unwrap().push(*d))
        };
        let q: Queue<u32, ()> = Queue::new(
            &IteratorConfig::default()
                .with_high_water_mark(2)
                .with_diagnostics(sink),
        );

        q.push(1);
        q.push(2);
        q.push(3);

        assert_eq!(
            &seen.lock().unwrap()[..],
            &[Diagnostic::HighWaterReached { buffered: 2 }]
        );
        assert!(q.is_paused());
    }

    #[test]
    fn handlers_register_once_per_watermark() {
        let q = queue(IteratorConfig::default());
        assert_eq!(q.register(Watermark::High, Arc::new(|| {})), Ok(()));
        assert_eq!(q.register(Watermark::Low, Arc::new(|| {})), Ok(()));
        assert_eq!(
            q.register(Watermark::High, Arc::new(|| {})),
            Err(HandlerError::AlreadyRegistered(Watermark::High))
        );
    }

    #[test]
    fn abandoned_slot_leaves_backlog_or_returns_its_value() {
        let q = queue(IteratorConfig::default());
        let slot = waiting(q.pull());
        q.abandon(&slot);
        assert_eq!(q.backlog_len(), 0);

        let slot = waiting(q.pull());
        q.push("a");
        q.abandon(&slot);
        assert_eq!(ready(q.pull()), Ok(Some("a")));
    }

    #[test]
    fn settlements_after_close_are_ignored() {
        let q = queue(IteratorConfig::default());
        q.stop();
        q.fail("late");
        q.finish_start();

        assert_eq!(ready(q.pull()), Ok(None));
        assert_eq!(ready(q.pull()), Ok(None));
    }

    #[test]
    fn stop_after_start_applies_at_once() {
        let q = queue(IteratorConfig::default());
        let (torn, hook) = counter();
        q.install_teardown(Teardown::new(hook));
        q.finish_start();

        q.push("a");
        q.stop();
        assert_eq!(torn.load(Ordering::SeqCst), 1);
        assert!(q.is_closed());

        q.push("late");
        assert_eq!(q.buffered_len(), 1);
        assert_eq!(ready(q.pull()), Ok(Some("a")));
        assert_eq!(ready(q.pull()), Ok(None));
    }

    #[test]
    fn stop_after_start_resolves_pulls_that_were_never_polled() {
        let q = queue(IteratorConfig::default());
        q.finish_start();
        let first = waiting(q.pull());
        let second = waiting(q.pull());

        q.stop();

        assert_eq!(first.take_outcome(), Some(Ok(None)));
        assert_eq!(second.take_outcome(), Some(Ok(None)));
        assert_eq!(q.backlog_len(), 0);
    }

    #[test]
    fn abandoned_value_goes_to_the_next_waiting_pull() {
        let q = queue(IteratorConfig::default());
        q.finish_start();
        let first = waiting(q.pull());
        let second = waiting(q.pull());

        q.push("x");
        q.abandon(&first);
        assert_eq!(q.buffered_len(), 0);
        assert_eq!(q.backlog_len(), 0);

        q.push("y");
        assert_eq!(second.take_outcome(), Some(Ok(Some("x"))));
        assert_eq!(ready(q.pull()), Ok(Some("y")));
    }

    #[test]
    fn restored_ready_value_goes_to_the_next_waiting_pull() {
        let q = queue(IteratorConfig::default());
        q.finish_start();
        q.push("a");
        let taken = ready(q.pull());
        let slot = waiting(q.pull());

        q.restore(taken);

        assert_eq!(slot.take_outcome(), Some(Ok(Some("a"))));
        assert_eq!(q.buffered_len(), 0);
    }

    #[test]
    fn dequeued_failure_can_cross_low_water() {
        let (paused, on_pause) = counter();
        let (resumed, on_resume) = counter();
        let q = queue(
            IteratorConfig::default()
                .with_high_water_mark(2)
                .with_low_water_mark(1)
                .with_on_pause(on_pause)
                .with_on_resume(on_resume)
                .with_failure_policy(FailurePolicy::Continue),
        );
        q.finish_start();

        q.fail("hiccup");
        q.push("a");
        assert_eq!(paused.load(Ordering::SeqCst), 1);

        assert_eq!(ready(q.pull()), Err(NextError::Producer("hiccup")));
        assert_eq!(resumed.load(Ordering::SeqCst), 1);
        assert!(!q.is_paused());
    }

    #[test]
    fn end_marker_does_not_count_as_buffered() {
        let (_, on_pause) = counter();
        let (resumed, on_resume) = counter();
        let q = queue(
            IteratorConfig::default()
                .with_high_water_mark(2)
                .with_low_water_mark(1)
                .with_on_pause(on_pause)
                .with_on_resume(on_resume),
        );
        q.finish_start();
        q.push("a");
        q.push("b");
        q.stop();
        assert_eq!(q.buffered_len(), 2);

        assert_eq!(ready(q.pull()), Ok(Some("a")));
        assert_eq!(q.buffered_len(), 1);
        assert_eq!(resumed.load(Ordering::SeqCst), 1);
    }
}
