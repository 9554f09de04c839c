//! Endless repetition of a finite stream

use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::disposable::{BoxDisposable, DisposableSlot};
use crate::error::StreamError;
use crate::scheduler::SchedulerRef;
use crate::sink::{Lifecycle, Sink, SinkRef, Time};

use super::{Source, Stream};

/// Re-run `stream` every time it ends, forever.
///
/// Each repetition is a fresh subscription to the same recipe. An error
/// stops the cycle and is forwarded; disposal stops the current repetition.
pub fn cycle<T: 'static>(stream: Stream<T>) -> Stream<T> {
    Stream::new(Cycle { source: stream })
}

struct Cycle<T> {
    source: Stream<T>,
}

impl<T: 'static> Source<T> for Cycle<T> {
    fn run(&self, sink: SinkRef<T>, scheduler: &SchedulerRef) -> BoxDisposable {
        let current = Rc::new(DisposableSlot::new());
        let repeater = Rc::new_cyclic(|this| CycleSink {
            source: self.source.clone(),
            downstream: sink,
            scheduler: Rc::clone(scheduler),
            current: Rc::clone(&current),
            this: this.clone(),
            lifecycle: Lifecycle::new(),
            restarting: Cell::new(false),
            restart_requested: Cell::new(false),
        });
        repeater.restart();
        Box::new(current)
    }
}

struct CycleSink<T> {
    source: Stream<T>,
    downstream: SinkRef<T>,
    scheduler: SchedulerRef,
    current: Rc<DisposableSlot>,
    this: Weak<CycleSink<T>>,
    lifecycle: Lifecycle,
    restarting: Cell<bool>,
    restart_requested: Cell<bool>,
}

impl<T: 'static> CycleSink<T> {
    /// Subscribe to the next repetition. A repetition that ends while it is
    /// still being subscribed requests another round instead of recursing.
    fn restart(&self) {
        if self.restarting.get() {
            self.restart_requested.set(true);
            return;
        }
        self.restarting.set(true);
        loop {
            self.restart_requested.set(false);
            if !self.lifecycle.is_active() || self.current.is_disposed() {
                break;
            }
            let Some(this) = self.this.upgrade() else {
                break;
            };
            let subscription = self.source.run(this, &self.scheduler);
            self.current.set(subscription);
            if !self.restart_requested.get() {
                break;
            }
        }
        self.restarting.set(false);
    }
}

impl<T: 'static> Sink<T> for CycleSink<T> {
    fn event(&self, time: Time, value: T) {
        if self.lifecycle.is_active() {
            self.downstream.event(time, value);
        }
    }

    fn end(&self, _time: Time) {
        if self.lifecycle.is_active() {
            self.restart();
        }
    }

    fn error(&self, time: Time, err: StreamError) {
        if self.lifecycle.fail() {
            self.downstream.error(time, err);
        }
    }
}
