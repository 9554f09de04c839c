use std::rc::Rc;
use std::time::Duration;

use crate::stream::{self, Stream};

/// A Pipe represents a stream transformation from one type to another.
/// It's a function from Stream[I] to Stream[O].
pub struct Pipe<I, O> {
    f: Rc<dyn Fn(Stream<I>) -> Stream<O>>,
}

impl<I, O> Clone for Pipe<I, O> {
    fn clone(&self) -> Self {
        Pipe {
            f: Rc::clone(&self.f),
        }
    }
}

impl<I, O> Pipe<I, O> {
    /// Create a new pipe from a function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Stream<I>) -> Stream<O> + 'static,
    {
        Pipe { f: Rc::new(f) }
    }

    /// Apply this pipe to a stream
    pub fn apply(&self, input: Stream<I>) -> Stream<O> {
        (self.f)(input)
    }
}

/// Create a pipe that applies the given function to each element
pub fn map<I, O, F>(f: F) -> Pipe<I, O>
where
    I: 'static,
    O: 'static,
    F: Fn(I) -> O + 'static,
{
    let f = Rc::new(f);
    Pipe::new(move |input: Stream<I>| {
        let f = Rc::clone(&f);
        stream::map(input, move |i| f(i))
    })
}

/// Create a pipe that shifts every element later by `by`
pub fn delay<I: 'static>(by: Duration) -> Pipe<I, I> {
    Pipe::new(move |input| stream::delay(input, by))
}

/// Create a pipe that keeps at most one element per `period`
///
/// # Panics
/// Panics if `period` is zero.
pub fn throttle<I: 'static>(period: Duration) -> Pipe<I, I> {
    assert!(!period.is_zero(), "throttle: period must be greater than zero");
    Pipe::new(move |input| stream::throttle(input, period))
}

/// Compose two pipes together
pub fn compose<I, M, O>(p1: Pipe<I, M>, p2: Pipe<M, O>) -> Pipe<I, O>
where
    I: 'static,
    M: 'static,
    O: 'static,
{
    Pipe::new(move |input| p2.apply(p1.apply(input)))
}

/// Identity pipe that doesn't transform the stream
pub fn identity<I: 'static>() -> Pipe<I, I> {
    Pipe::new(|input| input)
}

/// Extension trait for pipes
pub trait PipeExt<I, O> {
    /// Compose this pipe with another pipe
    fn compose<P>(self, other: Pipe<O, P>) -> Pipe<I, P>
    where
        P: 'static;
}

impl<I, O> PipeExt<I, O> for Pipe<I, O>
where
    I: 'static,
    O: 'static,
{
    fn compose<P>(self, other: Pipe<O, P>) -> Pipe<I, P>
    where
        P: 'static,
    {
        compose(self, other)
    }
}

impl<T: 'static> Stream<T> {
    /// Run this stream through `pipe`.
    pub fn through<O>(self, pipe: &Pipe<T, O>) -> Stream<O> {
        pipe.apply(self)
    }
}
