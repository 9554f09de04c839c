//! Stream constructors
//!
//! Every constructor here delivers through the scheduler, never from inside
//! `run`, so a subscription can always be disposed before its first event.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use crate::disposable::{self, BoxDisposable, Disposable, DisposableSlot};
use crate::error::{StreamError, StreamResult};
use crate::scheduler::SchedulerRef;
use crate::sink::{SinkRef, Time};

use super::Stream;

/// A stream that ends without emitting anything.
pub fn empty<T: 'static>() -> Stream<T> {
    Stream::from_fn(|sink: SinkRef<T>, scheduler: &SchedulerRef| -> BoxDisposable {
        let handle = scheduler.schedule_after(Duration::ZERO, Box::new(move |now| sink.end(now)));
        Box::new(handle)
    })
}

/// A stream that never emits and never ends.
pub fn never<T: 'static>() -> Stream<T> {
    Stream::from_fn(|_sink: SinkRef<T>, _scheduler: &SchedulerRef| -> BoxDisposable {
        disposable::empty()
    })
}

/// Emit a single element as a stream
pub fn emit<T: Clone + 'static>(value: T) -> Stream<T> {
    from_iter(std::iter::once(value))
}

/// A stream that fails with `err` without emitting anything.
pub fn fail<T: 'static>(err: StreamError) -> Stream<T> {
    Stream::from_fn(move |sink: SinkRef<T>, scheduler: &SchedulerRef| -> BoxDisposable {
        let err = err.clone();
        let handle =
            scheduler.schedule_after(Duration::ZERO, Box::new(move |now| sink.error(now, err)));
        Box::new(handle)
    })
}

/// Create a stream from an iterator.
///
/// All values and the final `end` are delivered in one scheduler step.
/// Disposing the subscription in the middle of that step stops delivery.
pub fn from_iter<I, T>(iter: I) -> Stream<T>
where
    I: IntoIterator<Item = T>,
    T: Clone + 'static,
{
    let values: Rc<[T]> = iter.into_iter().collect();
    Stream::from_fn(move |sink: SinkRef<T>, scheduler: &SchedulerRef| -> BoxDisposable {
        let active = Rc::new(Cell::new(true));
        let values = Rc::clone(&values);
        let running = Rc::clone(&active);
        let handle = scheduler.schedule_after(
            Duration::ZERO,
            Box::new(move |now| {
                for value in values.iter() {
                    if !running.get() {
                        return;
                    }
                    sink.event(now, value.clone());
                }
                if running.get() {
                    sink.end(now);
                }
            }),
        );
        disposable::from_fn(move || {
            active.set(false);
            handle.dispose()
        })
    })
}

/// Emit `value` once, `after` from the start of the subscription, then end.
pub fn at<T: Clone + 'static>(after: Duration, value: T) -> Stream<T> {
    timeline(vec![(after, value)])
}

/// Emit each value at its offset from the start of the subscription.
///
/// Entries are ordered by offset; entries with equal offsets keep their
/// order. The stream ends right after the last value.
pub fn timeline<T: Clone + 'static>(mut entries: Vec<(Duration, T)>) -> Stream<T> {
    entries.sort_by_key(|(offset, _)| *offset);
    let entries: Rc<[(Duration, T)]> = entries.into();
    Stream::from_fn(move |sink: SinkRef<T>, scheduler: &SchedulerRef| -> BoxDisposable {
        let slot = Rc::new(DisposableSlot::new());
        let cursor = Rc::new(TimelineCursor {
            entries: Rc::clone(&entries),
            sink,
            scheduler: Rc::clone(scheduler),
            slot: Rc::clone(&slot),
        });
        cursor.schedule(0, Duration::ZERO);
        Box::new(slot)
    })
}

struct TimelineCursor<T> {
    entries: Rc<[(Duration, T)]>,
    sink: SinkRef<T>,
    scheduler: SchedulerRef,
    slot: Rc<DisposableSlot>,
}

impl<T: Clone + 'static> TimelineCursor<T> {
    /// Schedule delivery of `entries[index..]`, measured from offset `from`.
    fn schedule(self: &Rc<Self>, index: usize, from: Duration) {
        let offset = self.entries.get(index).map_or(from, |(offset, _)| *offset);
        let cursor = Rc::clone(self);
        let handle = self.scheduler.schedule_after(
            offset.saturating_sub(from),
            Box::new(move |now| cursor.deliver(index, now)),
        );
        self.slot.set(Box::new(handle));
    }

    fn deliver(self: &Rc<Self>, index: usize, now: Time) {
        let Some((offset, _)) = self.entries.get(index) else {
            self.sink.end(now);
            return;
        };
        let offset = *offset;
        let mut next = index;
        while let Some((at, value)) = self.entries.get(next) {
            if *at != offset {
                break;
            }
            if self.slot.is_disposed() {
                return;
            }
            self.sink.event(now, value.clone());
            next += 1;
        }
        if self.slot.is_disposed() {
            return;
        }
        if next == self.entries.len() {
            self.sink.end(now);
        } else {
            self.schedule(next, offset);
        }
    }
}

/// Bridge a future into a one-element stream.
///
/// Each subscription awaits a fresh future from `factory` on the current
/// tokio `LocalSet`, then delivers `event` followed by `end` on `Ok`, or
/// `error` on `Err`. Disposing aborts the future.
///
/// # Panics
/// Running the stream outside a `LocalSet` panics.
pub fn from_future<T, Fut, F>(factory: F) -> Stream<T>
where
    T: 'static,
    Fut: Future<Output = StreamResult<T>> + 'static,
    F: Fn() -> Fut + 'static,
{
    Stream::from_fn(move |sink: SinkRef<T>, scheduler: &SchedulerRef| -> BoxDisposable {
        let future = factory();
        let scheduler = Rc::clone(scheduler);
        let active = Rc::new(Cell::new(true));
        let running = Rc::clone(&active);
        let task = tokio::task::spawn_local(async move {
            let result = future.await;
            if !running.get() {
                return;
            }
            let now = scheduler.now();
            match result {
                Ok(value) => {
                    sink.event(now, value);
                    // The sink may have disposed us during `event`.
                    if running.get() {
                        sink.end(now);
                    }
                }
                Err(err) => sink.error(now, err),
            }
        });
        disposable::from_fn(move || {
            active.set(false);
            task.abort();
            Ok(())
        })
    })
}
