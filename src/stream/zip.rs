//! Zip: combine sources position by position
//!
//! Each source gets a FIFO queue. A combined value is emitted whenever every
//! queue holds at least one value, so the output is as long as the shortest
//! input. Sources push without backpressure; the queues absorb the skew.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::disposable::{dispose_quietly, BoxDisposable, CompositeDisposable, Disposable};
use crate::error::{StreamError, StreamResult};
use crate::scheduler::SchedulerRef;
use crate::sink::{Lifecycle, Sink, SinkRef, Time};

use super::constructors::empty;
use super::core::map;
use super::{Source, Stream};

type Combine<T, R> = Rc<dyn Fn(Vec<T>) -> StreamResult<R>>;

/// Pair up the values of two streams: `[(a0, b0), (a1, b1), ...]`.
pub fn zip<A: 'static, B: 'static>(first: Stream<A>, second: Stream<B>) -> Stream<(A, B)> {
    zip_with(first, second, |a, b| (a, b))
}

/// Combine the values of two streams position by position with `f`.
pub fn zip_with<A, B, R, F>(first: Stream<A>, second: Stream<B>, f: F) -> Stream<R>
where
    A: 'static,
    B: 'static,
    R: 'static,
    F: Fn(A, B) -> R + 'static,
{
    let lanes = vec![map(first, Lane::Left), map(second, Lane::Right)];
    zip_array(lanes, move |row| {
        let mut row = row.into_iter();
        match (row.next(), row.next()) {
            (Some(Lane::Left(a)), Some(Lane::Right(b))) => Ok(f(a, b)),
            _ => Err(StreamError::custom("zip lanes delivered out of position")),
        }
    })
}

enum Lane<A, B> {
    Left(A),
    Right(B),
}

/// Combine any number of same-typed streams position by position.
///
/// `combine` receives one value per source, in source order. An `Err` from
/// `combine` fails the stream like an upstream error would. The result ends
/// as soon as any source has ended and all of its values were combined.
pub fn zip_array<T, R, F>(streams: Vec<Stream<T>>, combine: F) -> Stream<R>
where
    T: 'static,
    R: 'static,
    F: Fn(Vec<T>) -> StreamResult<R> + 'static,
{
    if streams.is_empty() {
        return empty();
    }
    Stream::new(Zip {
        sources: streams,
        combine: Rc::new(combine),
    })
}

struct Zip<T, R> {
    sources: Vec<Stream<T>>,
    combine: Combine<T, R>,
}

impl<T: 'static, R: 'static> Source<R> for Zip<T, R> {
    fn run(&self, sink: SinkRef<R>, scheduler: &SchedulerRef) -> BoxDisposable {
        let count = self.sources.len();
        let state = Rc::new(ZipState {
            downstream: sink,
            combine: Rc::clone(&self.combine),
            lifecycle: Lifecycle::new(),
            queues: RefCell::new((0..count).map(|_| VecDeque::new()).collect()),
            ended: RefCell::new(vec![false; count]),
            subscriptions: CompositeDisposable::new(),
        });
        for (index, source) in self.sources.iter().enumerate() {
            if !state.lifecycle.is_active() {
                break;
            }
            let Some((_, slot)) = state.subscriptions.add_slot() else {
                break;
            };
            let lane = Rc::new(ZipSink {
                index,
                state: Rc::clone(&state),
                lifecycle: Lifecycle::new(),
            });
            slot.set(source.run(lane, scheduler));
        }
        Box::new(state)
    }
}

struct ZipState<T, R> {
    downstream: SinkRef<R>,
    combine: Combine<T, R>,
    lifecycle: Lifecycle,
    queues: RefCell<Vec<VecDeque<T>>>,
    ended: RefCell<Vec<bool>>,
    subscriptions: CompositeDisposable,
}

impl<T, R> ZipState<T, R> {
    fn push(&self, index: usize, time: Time, value: T) {
        if !self.lifecycle.is_active() {
            return;
        }
        self.queues.borrow_mut()[index].push_back(value);

        while let Some(row) = self.take_row() {
            match (self.combine)(row) {
                Ok(combined) => self.downstream.event(time, combined),
                Err(err) => {
                    self.fail(time, err);
                    return;
                }
            }
            // The downstream may have disposed us synchronously.
            if !self.lifecycle.is_active() {
                return;
            }
        }
        self.end_if_exhausted(time);
    }

    /// Pop one value from every queue if none of them is empty.
    fn take_row(&self) -> Option<Vec<T>> {
        let mut queues = self.queues.borrow_mut();
        if queues.iter().any(VecDeque::is_empty) {
            return None;
        }
        queues.iter_mut().map(VecDeque::pop_front).collect()
    }

    fn source_end(&self, index: usize, time: Time) {
        self.ended.borrow_mut()[index] = true;
        self.end_if_exhausted(time);
    }

    fn end_if_exhausted(&self, time: Time) {
        let exhausted = {
            let queues = self.queues.borrow();
            let ended = self.ended.borrow();
            ended
                .iter()
                .zip(queues.iter())
                .any(|(ended, queue)| *ended && queue.is_empty())
        };
        if exhausted && self.lifecycle.end() {
            self.downstream.end(time);
            self.teardown();
        }
    }

    fn fail(&self, time: Time, err: StreamError) {
        if self.lifecycle.fail() {
            self.downstream.error(time, err);
            self.teardown();
        }
    }

    fn teardown(&self) {
        self.queues.borrow_mut().iter_mut().for_each(VecDeque::clear);
        dispose_quietly(&self.subscriptions, "zip sources");
    }
}

impl<T, R> Disposable for ZipState<T, R> {
    fn dispose(&self) -> StreamResult<()> {
        self.lifecycle.dispose();
        self.queues.borrow_mut().iter_mut().for_each(VecDeque::clear);
        self.subscriptions.dispose()
    }
}

struct ZipSink<T, R> {
    index: usize,
    state: Rc<ZipState<T, R>>,
    lifecycle: Lifecycle,
}

impl<T, R> Sink<T> for ZipSink<T, R> {
    fn event(&self, time: Time, value: T) {
        if self.lifecycle.is_active() {
            self.state.push(self.index, time, value);
        }
    }

    fn end(&self, time: Time) {
        if self.lifecycle.end() {
            self.state.source_end(self.index, time);
        }
    }

    fn error(&self, time: Time, err: StreamError) {
        if self.lifecycle.fail() {
            self.state.fail(time, err);
        }
    }
}
