mod common;

use common::{ms, virtual_scheduler, Recorder};
use rs2_push::*;
use tokio_test::assert_ok;

#[test]
fn test_merge_interleaves_by_time() {
    let (clock, scheduler) = virtual_scheduler();
    let stream = merge(
        timeline(vec![(ms(0), 1), (ms(20), 3)]),
        timeline(vec![(ms(10), 2), (ms(30), 4)]),
    );
    let recorder = Recorder::new();
    let _subscription = stream.run(recorder.clone(), &scheduler);

    assert_ok!(clock.advance_by(ms(100)));

    assert_eq!(
        recorder.timed_values(),
        vec![(ms(0), 1), (ms(10), 2), (ms(20), 3), (ms(30), 4)]
    );
    assert_eq!(recorder.end_time(), Some(ms(30)));
}

#[test]
fn test_merge_waits_for_every_source_to_end() {
    let (clock, scheduler) = virtual_scheduler();
    let stream = emit(1).merge(never());
    let recorder = Recorder::new();
    let _subscription = stream.run(recorder.clone(), &scheduler);

    assert_ok!(clock.advance_by(ms(1_000)));

    assert_eq!(recorder.values(), vec![1]);
    assert!(!recorder.is_terminated());
}

#[test]
fn test_merge_fails_fast_and_disposes_other_sources() {
    let (clock, scheduler) = virtual_scheduler();
    let stream = merge(
        timeline(vec![(ms(10), 1), (ms(30), 2)]),
        delay(fail(StreamError::custom("boom")), ms(20)),
    );
    let recorder = Recorder::new();
    let _subscription = stream.run(recorder.clone(), &scheduler);

    assert_ok!(clock.advance_by(ms(100)));

    assert_eq!(recorder.values(), vec![1]);
    assert_eq!(recorder.error(), Some(StreamError::custom("boom")));
    assert_eq!(clock.pending_tasks(), 0, "no source should keep a timer alive");
}

#[test]
fn test_merge_array_of_three_sources() {
    let (clock, scheduler) = virtual_scheduler();
    let stream = merge_array(vec![
        at(ms(5), "a"),
        at(ms(15), "c"),
        at(ms(10), "b"),
    ]);
    let recorder = Recorder::new();
    let _subscription = stream.run(recorder.clone(), &scheduler);

    assert_ok!(clock.advance_by(ms(20)));

    assert_eq!(recorder.values(), vec!["a", "b", "c"]);
    assert_eq!(recorder.end_time(), Some(ms(15)));
}

#[test]
fn test_merge_array_without_sources_ends_immediately() {
    let (clock, scheduler) = virtual_scheduler();
    let recorder = Recorder::<i32>::new();
    let _subscription = merge_array::<i32>(Vec::new()).run(recorder.clone(), &scheduler);

    assert_ok!(clock.advance_by(ms(0)));

    assert_eq!(recorder.end_time(), Some(ms(0)));
    assert!(recorder.values().is_empty());
}

#[test]
fn test_merge_dispose_stops_all_sources() {
    let (clock, scheduler) = virtual_scheduler();
    let stream = merge(tick(ms(10), 'x'), tick(ms(15), 'y'));
    let recorder = Recorder::new();
    let subscription = stream.run(recorder.clone(), &scheduler);

    assert_ok!(clock.advance_by(ms(30)));
    // x at 0, 10, 20, 30 and y at 0, 15, 30
    assert_eq!(recorder.len(), 7);

    assert_ok!(subscription.dispose());
    assert_eq!(clock.pending_tasks(), 0);

    assert_ok!(clock.advance_by(ms(100)));
    assert_eq!(recorder.len(), 7);
}

#[test]
fn test_merge_can_be_run_twice_independently() {
    let (clock, scheduler) = virtual_scheduler();
    let stream = merge(from_iter(vec![1, 2]), from_iter(vec![3]));
    let first = Recorder::new();
    let second = Recorder::new();
    let _a = stream.run(first.clone(), &scheduler);
    let _b = stream.run(second.clone(), &scheduler);

    assert_ok!(clock.run_until_idle());

    assert_eq!(first.values(), vec![1, 2, 3]);
    assert_eq!(second.values(), vec![1, 2, 3]);
    assert!(first.is_ended() && second.is_ended());
}
