//! Merge: concurrent fan-in over a fixed set of sources

use crate::disposable::BoxDisposable;
use crate::scheduler::SchedulerRef;
use crate::sink::SinkRef;

use super::constructors::empty;
use super::fan_in::FanIn;
use super::{Source, Stream};

/// Merge two streams into one.
///
/// Events are forwarded as they arrive; the result ends once both inputs
/// have ended and fails on the first error from either.
pub fn merge<T: 'static>(first: Stream<T>, second: Stream<T>) -> Stream<T> {
    merge_array(vec![first, second])
}

/// Merge any number of streams into one.
///
/// All sources are subscribed at once against a shared downstream. The
/// merged stream ends only after every source has ended. The first error
/// from any source is forwarded once and every other source is disposed.
pub fn merge_array<T: 'static>(mut streams: Vec<Stream<T>>) -> Stream<T> {
    match streams.len() {
        0 => empty(),
        1 => streams.remove(0),
        _ => Stream::new(Merge { sources: streams }),
    }
}

struct Merge<T> {
    sources: Vec<Stream<T>>,
}

impl<T: 'static> Source<T> for Merge<T> {
    fn run(&self, sink: SinkRef<T>, scheduler: &SchedulerRef) -> BoxDisposable {
        let fan = FanIn::new(sink);
        for source in &self.sources {
            if !fan.is_active() {
                break;
            }
            fan.attach(source, scheduler);
        }
        fan.seal(scheduler.now());
        Box::new(fan)
    }
}
