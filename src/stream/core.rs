//! One-to-one decorators the other combinators build on

use std::rc::Rc;

use crate::disposable::{dispose_quietly, BoxDisposable, DisposableSlot};
use crate::error::{StreamError, StreamResult};
use crate::scheduler::SchedulerRef;
use crate::sink::{Lifecycle, Sink, SinkRef, Time};

use super::{Source, Stream};

/// Transform every event value with `f`.
pub fn map<T, U, F>(stream: Stream<T>, f: F) -> Stream<U>
where
    T: 'static,
    U: 'static,
    F: Fn(T) -> U + 'static,
{
    try_map(stream, move |value| Ok(f(value)))
}

/// Transform every event value with a function that may fail.
///
/// The first `Err` is delivered as the stream's error and the upstream
/// subscription is disposed.
pub fn try_map<T, U, F>(stream: Stream<T>, f: F) -> Stream<U>
where
    T: 'static,
    U: 'static,
    F: Fn(T) -> StreamResult<U> + 'static,
{
    Stream::new(TryMap {
        source: stream,
        f: Rc::new(f),
    })
}

struct TryMap<T, U> {
    source: Stream<T>,
    f: Rc<dyn Fn(T) -> StreamResult<U>>,
}

impl<T: 'static, U: 'static> Source<U> for TryMap<T, U> {
    fn run(&self, sink: SinkRef<U>, scheduler: &SchedulerRef) -> BoxDisposable {
        let upstream = Rc::new(DisposableSlot::new());
        let mapper = Rc::new(TryMapSink {
            downstream: sink,
            f: Rc::clone(&self.f),
            lifecycle: Lifecycle::new(),
            upstream: Rc::clone(&upstream),
        });
        upstream.set(self.source.run(mapper, scheduler));
        Box::new(upstream)
    }
}

struct TryMapSink<T, U> {
    downstream: SinkRef<U>,
    f: Rc<dyn Fn(T) -> StreamResult<U>>,
    lifecycle: Lifecycle,
    upstream: Rc<DisposableSlot>,
}

impl<T, U> Sink<T> for TryMapSink<T, U> {
    fn event(&self, time: Time, value: T) {
        if !self.lifecycle.is_active() {
            return;
        }
        match (self.f)(value) {
            Ok(mapped) => self.downstream.event(time, mapped),
            Err(err) => {
                if self.lifecycle.fail() {
                    self.downstream.error(time, err);
                    dispose_quietly(self.upstream.as_ref(), "mapped source");
                }
            }
        }
    }

    fn end(&self, time: Time) {
        if self.lifecycle.end() {
            self.downstream.end(time);
        }
    }

    fn error(&self, time: Time, err: StreamError) {
        if self.lifecycle.fail() {
            self.downstream.error(time, err);
        }
    }
}
