//! Scheduler-driven timing combinators
//!
//! Each operator owns the tasks it schedules and cancels them when its
//! subscription is disposed, so no task outlives the subscription.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::disposable::{
    dispose_quietly, BoxDisposable, CompositeDisposable, Disposable, DisposableKey,
};
use crate::error::{StreamError, StreamResult};
use crate::scheduler::{SchedulerRef, TaskHandle};
use crate::sink::{Lifecycle, Sink, SinkRef, Time};

use super::{Source, Stream};

// ================================
// Delay
// ================================

/// Shift every event, and the final `end` or `error`, later by `by`.
///
/// The delay is constant, so the output keeps the input order.
pub fn delay<T: 'static>(stream: Stream<T>, by: Duration) -> Stream<T> {
    Stream::new(Delay { source: stream, by })
}

struct Delay<T> {
    source: Stream<T>,
    by: Duration,
}

impl<T: 'static> Source<T> for Delay<T> {
    fn run(&self, sink: SinkRef<T>, scheduler: &SchedulerRef) -> BoxDisposable {
        let state = Rc::new(DelayState {
            downstream: sink,
            scheduler: Rc::clone(scheduler),
            by: self.by,
            upstream_done: Lifecycle::new(),
            output: Lifecycle::new(),
            pending: CompositeDisposable::new(),
        });
        let upstream = self.source.run(Rc::new(DelaySink(Rc::clone(&state))), scheduler);
        Box::new(DelaySubscription { state, upstream })
    }
}

struct DelayState<T> {
    downstream: SinkRef<T>,
    scheduler: SchedulerRef,
    by: Duration,
    upstream_done: Lifecycle,
    output: Lifecycle,
    pending: CompositeDisposable,
}

impl<T: 'static> DelayState<T> {
    /// Run `deliver` `by` from now, unless the subscription is disposed first.
    fn defer<F>(self: &Rc<Self>, deliver: F)
    where
        F: FnOnce(&DelayState<T>, Time) + 'static,
    {
        if !self.output.is_active() {
            return;
        }
        let key: Rc<Cell<Option<DisposableKey>>> = Rc::new(Cell::new(None));
        let state = Rc::clone(self);
        let own_key = Rc::clone(&key);
        let handle = self.scheduler.schedule_after(
            self.by,
            Box::new(move |now| {
                if let Some(key) = own_key.get() {
                    state.pending.remove(key);
                }
                deliver(&state, now);
            }),
        );
        key.set(self.pending.add(Box::new(handle)));
    }
}

struct DelaySink<T>(Rc<DelayState<T>>);

impl<T: 'static> Sink<T> for DelaySink<T> {
    fn event(&self, time: Time, value: T) {
        if !self.0.upstream_done.is_active() {
            log::trace!("Delay ignoring event at {:?} after upstream terminated", time);
            return;
        }
        self.0.defer(move |state, now| {
            if state.output.is_active() {
                state.downstream.event(now, value);
            }
        });
    }

    fn end(&self, _time: Time) {
        if self.0.upstream_done.end() {
            self.0.defer(|state, now| {
                if state.output.end() {
                    state.downstream.end(now);
                }
            });
        }
    }

    fn error(&self, _time: Time, err: StreamError) {
        if self.0.upstream_done.fail() {
            self.0.defer(move |state, now| {
                if state.output.fail() {
                    state.downstream.error(now, err);
                }
            });
        }
    }
}

struct DelaySubscription<T> {
    state: Rc<DelayState<T>>,
    upstream: BoxDisposable,
}

impl<T> Disposable for DelaySubscription<T> {
    fn dispose(&self) -> StreamResult<()> {
        self.state.output.dispose();
        let upstream = self.upstream.dispose();
        let pending = self.state.pending.dispose();
        upstream.and(pending)
    }
}

// ================================
// Periodic
// ================================

/// Emit `()` as soon as possible and then once every `period`, forever.
///
/// Never ends on its own; dispose the subscription to stop it.
///
/// # Panics
/// Panics if `period` is zero.
pub fn periodic(period: Duration) -> Stream<()> {
    tick(period, ())
}

/// Emit a clone of `value` as soon as possible and then once every `period`.
///
/// # Panics
/// Panics if `period` is zero.
pub fn tick<T: Clone + 'static>(period: Duration, value: T) -> Stream<T> {
    assert!(!period.is_zero(), "tick: period must be greater than zero");
    Stream::from_fn(move |sink: SinkRef<T>, scheduler: &SchedulerRef| -> BoxDisposable {
        let value = value.clone();
        let handle = scheduler.schedule_periodic(
            period,
            Box::new(move |now| sink.event(now, value.clone())),
        );
        Box::new(handle)
    })
}

// ================================
// Throttle
// ================================

/// Leading-edge rate limiter.
///
/// Forwards an event at `t`, then drops every event stamped before
/// `t + period`. The first event at or after `t + period` is forwarded and
/// opens a new window, regardless of how ties are ordered in the scheduler. `end` and `error` pass through immediately; a value dropped
/// inside the last window is never flushed.
///
/// # Panics
/// Panics if `period` is zero.
pub fn throttle<T: 'static>(stream: Stream<T>, period: Duration) -> Stream<T> {
    assert!(!period.is_zero(), "throttle: period must be greater than zero");
    Stream::new(Throttle {
        source: stream,
        period,
    })
}

struct Throttle<T> {
    source: Stream<T>,
    period: Duration,
}

impl<T: 'static> Source<T> for Throttle<T> {
    fn run(&self, sink: SinkRef<T>, scheduler: &SchedulerRef) -> BoxDisposable {
        let state = Rc::new(ThrottleState {
            downstream: sink,
            scheduler: Rc::clone(scheduler),
            period: self.period,
            window: RefCell::new(None),
            window_end: Cell::new(None),
            lifecycle: Lifecycle::new(),
        });
        let upstream = self.source.run(Rc::new(ThrottleSink(Rc::clone(&state))), scheduler);
        Box::new(ThrottleSubscription { state, upstream })
    }
}

struct ThrottleState<T> {
    downstream: SinkRef<T>,
    scheduler: SchedulerRef,
    period: Duration,
    window: RefCell<Option<TaskHandle>>,
    /// Events stamped before this instant are dropped.
    window_end: Cell<Option<Time>>,
    lifecycle: Lifecycle,
}

impl<T> ThrottleState<T> {
    fn take_window(&self) -> Option<TaskHandle> {
        self.window_end.set(None);
        self.window.borrow_mut().take()
    }

    fn close_window(&self) -> StreamResult<()> {
        match self.take_window() {
            Some(handle) => handle.dispose(),
            None => Ok(()),
        }
    }

    fn close_window_quietly(&self) {
        if let Some(handle) = self.take_window() {
            dispose_quietly(&handle, "throttle window");
        }
    }
}

struct ThrottleSink<T>(Rc<ThrottleState<T>>);

impl<T: 'static> Sink<T> for ThrottleSink<T> {
    fn event(&self, time: Time, value: T) {
        let state = &self.0;
        if !state.lifecycle.is_active() {
            return;
        }
        if let Some(end) = state.window_end.get() {
            if time < end {
                log::trace!("Throttle dropping event at {:?}, window open until {:?}", time, end);
                return;
            }
        }
        // The previous window may still hold a clearing task due at this instant.
        state.close_window_quietly();
        // Open the window before forwarding: the downstream may dispose us.
        state.window_end.set(Some(time + state.period));
        let weak: Weak<ThrottleState<T>> = Rc::downgrade(state);
        let handle = state.scheduler.schedule_after(
            state.period,
            Box::new(move |_| {
                if let Some(state) = weak.upgrade() {
                    state.take_window();
                }
            }),
        );
        *state.window.borrow_mut() = Some(handle);
        state.downstream.event(time, value);
    }

    fn end(&self, time: Time) {
        let state = &self.0;
        if state.lifecycle.end() {
            state.close_window_quietly();
            state.downstream.end(time);
        }
    }

    fn error(&self, time: Time, err: StreamError) {
        let state = &self.0;
        if state.lifecycle.fail() {
            state.close_window_quietly();
            state.downstream.error(time, err);
        }
    }
}

struct ThrottleSubscription<T> {
    state: Rc<ThrottleState<T>>,
    upstream: BoxDisposable,
}

impl<T> Disposable for ThrottleSubscription<T> {
    fn dispose(&self) -> StreamResult<()> {
        self.state.lifecycle.dispose();
        let upstream = self.upstream.dispose();
        upstream.and(self.state.close_window())
    }
}

