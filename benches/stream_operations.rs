use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{thread_rng, Rng};
use rs2_push::*;
use std::rc::Rc;
use std::time::Duration;

/// Sink that only counts what it receives.
struct CountingSink {
    events: std::cell::Cell<usize>,
}

impl<T> Sink<T> for CountingSink {
    fn event(&self, _time: Time, value: T) {
        black_box(value);
        self.events.set(self.events.get() + 1);
    }

    fn end(&self, _time: Time) {}

    fn error(&self, _time: Time, _err: StreamError) {}
}

fn drain<T: 'static>(stream: &Stream<T>) -> usize {
    let clock = Rc::new(VirtualScheduler::new());
    let scheduler: SchedulerRef = clock.clone();
    let sink = Rc::new(CountingSink {
        events: std::cell::Cell::new(0),
    });
    let _subscription = stream.run(sink.clone(), &scheduler);
    clock.run_until_idle().unwrap();
    sink.events.get()
}

fn bench_basic_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("basic_operations");

    for size in [1_000, 10_000, 100_000].iter() {
        group.bench_with_input(BenchmarkId::new("from_iter_map", size), size, |b, &size| {
            let stream = from_iter(0..size).map(|x| black_box(x * 2));
            b.iter(|| black_box(drain(&stream)));
        });

        group.bench_with_input(BenchmarkId::new("merge_array_8", size), size, |b, &size| {
            let sources = (0..8).map(|_| from_iter(0..size / 8)).collect();
            let stream = merge_array(sources);
            b.iter(|| black_box(drain(&stream)));
        });

        group.bench_with_input(BenchmarkId::new("zip", size), size, |b, &size| {
            let stream = zip(from_iter(0..size), from_iter(0..size));
            b.iter(|| black_box(drain(&stream)));
        });
    }

    group.finish();
}

fn bench_flat_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_map");

    for fan_out in [10, 100, 1_000].iter() {
        group.bench_with_input(BenchmarkId::new("inner_from_iter", fan_out), fan_out, |b, &fan_out| {
            let stream = from_iter(0..fan_out).flat_map(|x| from_iter(vec![x; 10]));
            b.iter(|| black_box(drain(&stream)));
        });
    }

    group.finish();
}

fn bench_timed_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("timed_operations");
    let mut rng = thread_rng();
    let entries: Vec<(Duration, u32)> = (0..10_000)
        .map(|i| (Duration::from_micros(rng.gen_range(0..1_000_000)), i))
        .collect();

    group.bench_function("timeline_10k", |b| {
        let stream = timeline(entries.clone());
        b.iter(|| black_box(drain(&stream)));
    });

    group.bench_function("timeline_delay_10k", |b| {
        let stream = timeline(entries.clone()).delay(Duration::from_millis(5));
        b.iter(|| black_box(drain(&stream)));
    });

    group.bench_function("timeline_throttle_10k", |b| {
        let stream = timeline(entries.clone()).throttle(Duration::from_millis(1));
        b.iter(|| black_box(drain(&stream)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_basic_operations,
    bench_flat_map,
    bench_timed_operations
);
criterion_main!(benches);
