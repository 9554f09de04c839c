//! Dynamic fan-in: flat_map, join and ap

use std::rc::Rc;

use crate::disposable::{BoxDisposable, DisposableKey};
use crate::error::{StreamError, StreamResult};
use crate::scheduler::SchedulerRef;
use crate::sink::{Lifecycle, Sink, SinkRef, Time};

use super::core::map;
use super::fan_in::FanIn;
use super::{Source, Stream};

type Project<T, U> = Rc<dyn Fn(T) -> StreamResult<Stream<U>>>;

/// Map each event to a stream and merge all of them into one output.
///
/// Every outer event immediately subscribes `f(value)`, concurrently with the
/// inner streams already running. The output ends once the outer stream and
/// every inner stream have ended. Any error is forwarded once and tears down
/// the outer and all live inner subscriptions.
pub fn flat_map<T, U, F>(stream: Stream<T>, f: F) -> Stream<U>
where
    T: 'static,
    U: 'static,
    F: Fn(T) -> Stream<U> + 'static,
{
    try_flat_map(stream, move |value| Ok(f(value)))
}

/// Like [`flat_map`], with a projection that may fail.
///
/// An `Err` from `f` is handled exactly like an upstream error.
pub fn try_flat_map<T, U, F>(stream: Stream<T>, f: F) -> Stream<U>
where
    T: 'static,
    U: 'static,
    F: Fn(T) -> StreamResult<Stream<U>> + 'static,
{
    Stream::new(FlatMap {
        outer: stream,
        project: Rc::new(f),
    })
}

/// Flatten a stream of streams, running inner streams concurrently.
pub fn join<T: 'static>(streams: Stream<Stream<T>>) -> Stream<T> {
    flat_map(streams, |inner| inner)
}

/// Apply every function from `functions` to every value of a fresh run of
/// `values`.
pub fn ap<T, U, F>(functions: Stream<F>, values: Stream<T>) -> Stream<U>
where
    T: 'static,
    U: 'static,
    F: Fn(T) -> U + 'static,
{
    flat_map(functions, move |f| map(values.clone(), f))
}

struct FlatMap<T, U> {
    outer: Stream<T>,
    project: Project<T, U>,
}

impl<T: 'static, U: 'static> Source<U> for FlatMap<T, U> {
    fn run(&self, sink: SinkRef<U>, scheduler: &SchedulerRef) -> BoxDisposable {
        let fan = FanIn::new(sink);
        if let Some((key, slot)) = fan.track() {
            let outer = Rc::new(OuterSink {
                fan: Rc::clone(&fan),
                key,
                project: Rc::clone(&self.project),
                scheduler: Rc::clone(scheduler),
                lifecycle: Lifecycle::new(),
            });
            slot.set(self.outer.run(outer, scheduler));
        }
        Box::new(fan)
    }
}

struct OuterSink<T, U> {
    fan: Rc<FanIn<U>>,
    key: DisposableKey,
    project: Project<T, U>,
    scheduler: SchedulerRef,
    lifecycle: Lifecycle,
}

impl<T: 'static, U: 'static> Sink<T> for OuterSink<T, U> {
    fn event(&self, time: Time, value: T) {
        if !self.lifecycle.is_active() || !self.fan.is_active() {
            return;
        }
        match (self.project)(value) {
            Ok(inner) => self.fan.attach(&inner, &self.scheduler),
            Err(err) => {
                self.lifecycle.fail();
                self.fan.fail(time, err);
            }
        }
    }

    fn end(&self, time: Time) {
        if self.lifecycle.end() {
            self.fan.release(self.key);
            self.fan.seal(time);
        }
    }

    fn error(&self, time: Time, err: StreamError) {
        if self.lifecycle.fail() {
            self.fan.fail(time, err);
        }
    }
}
