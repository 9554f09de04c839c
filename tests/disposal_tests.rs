mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{ms, virtual_scheduler, Recorder};
use rs2_push::*;
use tokio_test::assert_ok;

/// Disposes its own subscription as soon as the first value arrives.
struct DisposeOnFirst {
    subscription: Rc<DisposableSlot>,
    seen: RefCell<Vec<i32>>,
}

impl Sink<i32> for DisposeOnFirst {
    fn event(&self, _time: Time, value: i32) {
        self.seen.borrow_mut().push(value);
        assert_ok!(self.subscription.dispose());
    }

    fn end(&self, time: Time) {
        panic!("end delivered at {:?} after dispose", time);
    }

    fn error(&self, time: Time, err: StreamError) {
        panic!("error delivered at {:?} after dispose: {}", time, err);
    }
}

fn run_until_first(stream: Stream<i32>) -> (Rc<VirtualScheduler>, Rc<DisposeOnFirst>) {
    let (clock, scheduler) = virtual_scheduler();
    let subscription = Rc::new(DisposableSlot::new());
    let sink = Rc::new(DisposeOnFirst {
        subscription: Rc::clone(&subscription),
        seen: RefCell::new(Vec::new()),
    });
    subscription.set(stream.run(sink.clone(), &scheduler));
    assert_ok!(clock.advance_by(ms(1_000)));
    (clock, sink)
}

#[test]
fn test_dispose_from_inside_event_stops_from_iter() {
    let (clock, sink) = run_until_first(from_iter(vec![1, 2, 3]));
    assert_eq!(*sink.seen.borrow(), vec![1]);
    assert_eq!(clock.pending_tasks(), 0);
}

#[test]
fn test_dispose_from_inside_event_stops_merge() {
    let (clock, sink) = run_until_first(merge(from_iter(vec![1, 2]), tick(ms(5), 9)));
    assert_eq!(*sink.seen.borrow(), vec![1]);
    assert_eq!(clock.pending_tasks(), 0);
}

#[test]
fn test_dispose_from_inside_event_stops_flat_map() {
    let stream = from_iter(vec![1, 2]).flat_map(|x| tick(ms(3), x));
    let (clock, sink) = run_until_first(stream);
    assert_eq!(*sink.seen.borrow(), vec![1]);
    assert_eq!(clock.pending_tasks(), 0);
}

#[test]
fn test_dispose_from_inside_event_stops_zip() {
    let stream = zip_with(tick(ms(2), 1), from_iter(vec![10, 20, 30]), |a, b| a + b);
    let (clock, sink) = run_until_first(stream);
    assert_eq!(*sink.seen.borrow(), vec![11]);
    assert_eq!(clock.pending_tasks(), 0);
}

#[test]
fn test_dispose_from_inside_event_stops_timeline_batch() {
    let stream = timeline(vec![(ms(4), 1), (ms(4), 2), (ms(8), 3)]);
    let (clock, sink) = run_until_first(stream);
    assert_eq!(*sink.seen.borrow(), vec![1]);
    assert_eq!(clock.pending_tasks(), 0);
}

#[test]
fn test_dispose_after_natural_end_is_harmless() {
    let (clock, scheduler) = virtual_scheduler();
    let recorder = Recorder::new();
    let subscription = merge(emit(1), emit(2)).delay(ms(3)).run(recorder.clone(), &scheduler);

    assert_ok!(clock.run_until_idle());
    assert!(recorder.is_ended());

    assert_ok!(subscription.dispose());
    assert_ok!(subscription.dispose());
    assert_eq!(recorder.len(), 3);
}

#[test]
fn test_dispose_before_first_event_delivers_nothing() {
    let (clock, scheduler) = virtual_scheduler();
    let recorder = Recorder::new();
    let stream = merge(from_iter(vec![1, 2]), at(ms(5), 3))
        .flat_map(|x| emit(x).delay(ms(1)))
        .throttle(ms(2));
    let subscription = stream.run(recorder.clone(), &scheduler);

    assert_ok!(subscription.dispose());

    assert_eq!(clock.pending_tasks(), 0);
    assert_ok!(clock.run_until_idle());
    assert_eq!(recorder.len(), 0);
}

// ================================
// Subscription
// ================================

#[test]
fn test_subscription_releases_upstream_after_end() {
    let (clock, scheduler) = virtual_scheduler();
    let recorder = Recorder::new();
    let subscription = from_iter(vec!['a', 'b']).subscribe(recorder.clone(), &scheduler);

    assert_eq!(subscription.state(), SinkState::Active);
    assert_ok!(clock.run_until_idle());

    assert_eq!(recorder.values(), vec!['a', 'b']);
    assert!(subscription.is_closed());
    assert_eq!(subscription.state(), SinkState::Ended);
    assert_ok!(subscription.dispose());
    assert_eq!(subscription.state(), SinkState::Ended);
}

#[test]
fn test_subscription_dispose_is_idempotent() {
    let (clock, scheduler) = virtual_scheduler();
    let recorder = Recorder::new();
    let subscription = periodic(ms(10)).subscribe(recorder.clone(), &scheduler);

    assert_ok!(clock.advance_by(ms(10)));
    assert_ok!(subscription.dispose());
    assert_ok!(subscription.dispose());

    assert_eq!(subscription.state(), SinkState::Disposed);
    assert_eq!(clock.pending_tasks(), 0);
    assert_ok!(clock.advance_by(ms(100)));
    assert_eq!(recorder.len(), 2);
}

#[test]
fn test_subscription_ids_are_unique() {
    let (_clock, scheduler) = virtual_scheduler();
    let stream = never::<()>();
    let first = stream.subscribe(Recorder::<()>::new(), &scheduler);
    let second = stream.subscribe(Recorder::<()>::new(), &scheduler);
    assert_ne!(first.id(), second.id());
}

#[test]
fn test_subscription_filters_out_of_protocol_calls() {
    let (clock, scheduler) = virtual_scheduler();
    let unruly = Stream::from_fn(|sink: SinkRef<i32>, scheduler: &SchedulerRef| -> BoxDisposable {
        Box::new(scheduler.schedule_after(
            ms(0),
            Box::new(move |now| {
                sink.event(now, 1);
                sink.end(now);
                sink.event(now, 2);
                sink.error(now, StreamError::custom("too late"));
                sink.end(now);
            }),
        ))
    });
    let recorder = Recorder::new();
    let subscription = unruly.subscribe(recorder.clone(), &scheduler);

    assert_ok!(clock.run_until_idle());

    assert_eq!(recorder.values(), vec![1]);
    assert!(recorder.is_ended());
    assert_eq!(subscription.state(), SinkState::Ended);
}

#[test]
fn test_subscription_reports_error_state() {
    let (clock, scheduler) = virtual_scheduler();
    let recorder = Recorder::<u8>::new();
    let subscription = fail::<u8>(StreamError::custom("x")).subscribe(recorder.clone(), &scheduler);

    assert_ok!(clock.run_until_idle());

    assert_eq!(subscription.state(), SinkState::Errored);
    assert_eq!(recorder.error(), Some(StreamError::custom("x")));
}

#[test]
fn test_dispose_guard_disposes_on_drop() {
    let (clock, scheduler) = virtual_scheduler();
    let recorder = Recorder::new();
    {
        let _guard = DisposeGuard::new(periodic(ms(5)).run(recorder.clone(), &scheduler));
        assert_ok!(clock.advance_by(ms(5)));
    }
    assert_eq!(clock.pending_tasks(), 0);
    assert_eq!(recorder.len(), 2);
}
