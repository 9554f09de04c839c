//! Push-based stream recipes and their combinators
//!
//! A [`Stream`] is an immutable description of a producer. Nothing happens
//! until [`Stream::run`] attaches it to a [`Sink`] and a scheduler; every run
//! is an independent subscription released through the returned disposable.
//!
//! Combinators are free functions in the submodules; the methods on
//! [`Stream`] are thin sugar over them.

pub mod constructors;
pub mod core;
pub mod cycle;
pub(crate) mod fan_in;
pub mod flat_map;
pub mod merge;
pub mod rate;
pub mod zip;

use std::rc::Rc;
use std::time::Duration;

use crate::disposable::BoxDisposable;
use crate::error::StreamResult;
use crate::scheduler::SchedulerRef;
use crate::sink::SinkRef;

// Re-export constructors
pub use constructors::{at, emit, empty, fail, from_future, from_iter, never, timeline};

// Re-export combinators
pub use self::core::{map, try_map};
pub use cycle::cycle;
pub use flat_map::{ap, flat_map, join, try_flat_map};
pub use merge::{merge, merge_array};
pub use rate::{delay, periodic, throttle, tick};
pub use zip::{zip, zip_array, zip_with};

/// The producer behind a [`Stream`].
///
/// `run` must not deliver anything to `sink` after the returned disposable
/// has been disposed.
pub trait Source<T> {
    fn run(&self, sink: SinkRef<T>, scheduler: &SchedulerRef) -> BoxDisposable;
}

impl<T, F> Source<T> for F
where
    F: Fn(SinkRef<T>, &SchedulerRef) -> BoxDisposable,
{
    fn run(&self, sink: SinkRef<T>, scheduler: &SchedulerRef) -> BoxDisposable {
        self(sink, scheduler)
    }
}

/// Immutable, re-runnable recipe for a push-based event sequence.
pub struct Stream<T> {
    source: Rc<dyn Source<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Stream {
            source: Rc::clone(&self.source),
        }
    }
}

impl<T: 'static> Stream<T> {
    pub fn new<S>(source: S) -> Self
    where
        S: Source<T> + 'static,
    {
        Stream {
            source: Rc::new(source),
        }
    }

    /// Build a stream from a closure with the signature of [`Source::run`].
    pub fn from_fn<F>(run: F) -> Self
    where
        F: Fn(SinkRef<T>, &SchedulerRef) -> BoxDisposable + 'static,
    {
        Self::new(run)
    }

    /// Start a subscription delivering into `sink`.
    pub fn run(&self, sink: SinkRef<T>, scheduler: &SchedulerRef) -> BoxDisposable {
        self.source.run(sink, scheduler)
    }

    pub fn map<U, F>(self, f: F) -> Stream<U>
    where
        U: 'static,
        F: Fn(T) -> U + 'static,
    {
        map(self, f)
    }

    pub fn try_map<U, F>(self, f: F) -> Stream<U>
    where
        U: 'static,
        F: Fn(T) -> StreamResult<U> + 'static,
    {
        try_map(self, f)
    }

    pub fn merge(self, other: Stream<T>) -> Stream<T> {
        merge(self, other)
    }

    pub fn flat_map<U, F>(self, f: F) -> Stream<U>
    where
        U: 'static,
        F: Fn(T) -> Stream<U> + 'static,
    {
        flat_map(self, f)
    }

    pub fn zip<U: 'static>(self, other: Stream<U>) -> Stream<(T, U)> {
        zip(self, other)
    }

    pub fn delay(self, by: Duration) -> Stream<T> {
        delay(self, by)
    }

    pub fn throttle(self, period: Duration) -> Stream<T> {
        throttle(self, period)
    }

    pub fn cycle(self) -> Stream<T> {
        cycle(self)
    }
}
