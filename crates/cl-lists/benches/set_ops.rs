use std::thread;

use cl_core::{ConcurrentSet, Key};
use cl_lists::{CoarseGrainedSet, LazySet, LockFreeSet};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;

const MAX_KEY: Key = 100;

fn prefilled<S: ConcurrentSet + Default>() -> S {
    let set = S::default();
    for key in (1..=MAX_KEY).step_by(2) {
        set.insert(key);
    }
    set
}

fn bench_single_threaded_search<S: ConcurrentSet + Default>(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_threaded_search");
    let set: S = prefilled();

    group.bench_function(S::NAME, |b| {
        let mut rng = rand::thread_rng();
        b.iter(|| set.search(black_box(rng.gen_range(1..=MAX_KEY))));
    });

    group.finish();
}

fn bench_insert_delete_pair<S: ConcurrentSet + Default>(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_delete_pair");
    let set: S = prefilled();

    group.bench_function(S::NAME, |b| {
        let mut rng = rand::thread_rng();
        b.iter(|| {
            // Even keys are absent from the prefilled set.
            let key = rng.gen_range(1..=MAX_KEY / 2) * 2;
            set.insert(black_box(key));
            set.delete(black_box(key));
        });
    });

    group.finish();
}

/// Mixed 90/9/1 search/insert/delete load across `threads` threads.
fn bench_concurrent_mixed<S: ConcurrentSet + Default>(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_read_dominated");

    for threads in [2, 4, 8].iter() {
        group.bench_with_input(BenchmarkId::new(S::NAME, threads), threads, |b, &threads| {
            let set: S = prefilled();
            b.iter(|| {
                thread::scope(|s| {
                    for _ in 0..threads {
                        let set = &set;
                        s.spawn(move || {
                            let mut rng = rand::thread_rng();
                            for _ in 0..1_000 {
                                let key = rng.gen_range(1..=MAX_KEY);
                                match rng.gen_range(0..100) {
                                    0..=89 => {
                                        set.search(key);
                                    }
                                    90..=98 => {
                                        set.insert(key);
                                    }
                                    _ => {
                                        set.delete(key);
                                    }
                                }
                            }
                        });
                    }
                });
            });
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    bench_single_threaded_search::<CoarseGrainedSet>(c);
    bench_single_threaded_search::<LazySet>(c);
    bench_single_threaded_search::<LockFreeSet>(c);
}

fn bench_update(c: &mut Criterion) {
    bench_insert_delete_pair::<CoarseGrainedSet>(c);
    bench_insert_delete_pair::<LazySet>(c);
    bench_insert_delete_pair::<LockFreeSet>(c);
}

fn bench_concurrent(c: &mut Criterion) {
    bench_concurrent_mixed::<CoarseGrainedSet>(c);
    bench_concurrent_mixed::<LazySet>(c);
    bench_concurrent_mixed::<LockFreeSet>(c);
}

criterion_group!(benches, bench_search, bench_update, bench_concurrent);
criterion_main!(benches);
