//! Shared engine behind `merge` and `flat_map`
//!
//! Any number of child subscriptions deliver into one downstream sink. The
//! engine counts live children, forwards `end` once it is sealed (no more
//! children can arrive) and the count is back to zero, and fails fast on the
//! first error by disposing every tracked subscription.

use std::cell::Cell;
use std::rc::Rc;

use crate::disposable::{dispose_quietly, CompositeDisposable, Disposable, DisposableKey, DisposableSlot};
use crate::error::{StreamError, StreamResult};
use crate::scheduler::SchedulerRef;
use crate::sink::{Lifecycle, Sink, SinkRef, Time};
use crate::stream::Stream;

pub(crate) struct FanIn<T> {
    downstream: SinkRef<T>,
    lifecycle: Lifecycle,
    live: Cell<usize>,
    sealed: Cell<bool>,
    subscriptions: CompositeDisposable,
}

impl<T: 'static> FanIn<T> {
    pub(crate) fn new(downstream: SinkRef<T>) -> Rc<Self> {
        Rc::new(Self {
            downstream,
            lifecycle: Lifecycle::new(),
            live: Cell::new(0),
            sealed: Cell::new(false),
            subscriptions: CompositeDisposable::new(),
        })
    }

    pub(crate) fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    /// Reserve a place for a subscription that does not count towards
    /// liveness (flat_map's outer stream).
    pub(crate) fn track(&self) -> Option<(DisposableKey, Rc<DisposableSlot>)> {
        if !self.is_active() {
            return None;
        }
        self.subscriptions.add_slot()
    }

    /// Subscribe `stream` as a counted child.
    pub(crate) fn attach(self: &Rc<Self>, stream: &Stream<T>, scheduler: &SchedulerRef) {
        let Some((key, slot)) = self.track() else {
            return;
        };
        self.live.set(self.live.get() + 1);
        let sink = Rc::new(ChildSink {
            fan: Rc::clone(self),
            key,
            lifecycle: Lifecycle::new(),
        });
        slot.set(stream.run(sink, scheduler));
    }

    /// Dispose one tracked subscription and forget it.
    pub(crate) fn release(&self, key: DisposableKey) {
        if let Some(subscription) = self.subscriptions.remove(key) {
            dispose_quietly(subscription.as_ref(), "finished fan-in source");
        }
    }

    /// No further children will be attached.
    pub(crate) fn seal(&self, time: Time) {
        self.sealed.set(true);
        self.try_end(time);
    }

    pub(crate) fn event(&self, time: Time, value: T) {
        if self.is_active() {
            self.downstream.event(time, value);
        }
    }

    pub(crate) fn fail(&self, time: Time, err: StreamError) {
        if self.lifecycle.fail() {
            self.downstream.error(time, err);
            self.teardown();
        } else {
            log::trace!("Fan-in already terminated, dropping error: {}", err);
        }
    }

    fn child_end(&self, key: DisposableKey, time: Time) {
        self.live.set(self.live.get().saturating_sub(1));
        self.release(key);
        self.try_end(time);
    }

    fn try_end(&self, time: Time) {
        if self.sealed.get() && self.live.get() == 0 && self.lifecycle.end() {
            self.downstream.end(time);
            self.teardown();
        }
    }

    fn teardown(&self) {
        dispose_quietly(&self.subscriptions, "fan-in sources");
    }
}

impl<T> Disposable for FanIn<T> {
    fn dispose(&self) -> StreamResult<()> {
        self.lifecycle.dispose();
        self.subscriptions.dispose()
    }
}

/// Sink handed to each counted child.
struct ChildSink<T> {
    fan: Rc<FanIn<T>>,
    key: DisposableKey,
    lifecycle: Lifecycle,
}

impl<T: 'static> Sink<T> for ChildSink<T> {
    fn event(&self, time: Time, value: T) {
        if self.lifecycle.is_active() {
            self.fan.event(time, value);
        }
    }

    fn end(&self, time: Time) {
        if self.lifecycle.end() {
            self.fan.child_end(self.key, time);
        }
    }

    fn error(&self, time: Time, err: StreamError) {
        if self.lifecycle.fail() {
            self.fan.fail(time, err);
        }
    }
}
