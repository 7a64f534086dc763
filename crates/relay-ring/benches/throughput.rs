use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use relay_ring::Ring;
use std::sync::Arc;
use std::thread;

const MSGS_PER_PRODUCER: u64 = 1_000_000;

fn bench_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    group.throughput(Throughput::Elements(MSGS_PER_PRODUCER));

    group.bench_function("single_producer_consumer", |b| {
        b.iter(|| {
            let ring = Arc::new(Ring::<u64>::with_capacity(32 * 1024));

            let producer = {
                let ring = Arc::clone(&ring);
                thread::spawn(move || {
                    let mut sent = 0u64;
                    while sent < MSGS_PER_PRODUCER {
                        if ring.push(sent) {
                            sent += 1;
                        } else {
                            std::hint::spin_loop();
                        }
                    }
                })
            };

            let mut received = 0u64;
            while received < MSGS_PER_PRODUCER {
                match ring.pop() {
                    Some(v) => {
                        black_box(v);
                        received += 1;
                    }
                    None => std::hint::spin_loop(),
                }
            }

            producer.join().unwrap();
        });
    });

    group.finish();
}

fn bench_mpsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpsc");

    for num_producers in [2usize, 4, 8] {
        let total = MSGS_PER_PRODUCER * num_producers as u64;
        group.throughput(Throughput::Elements(total));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{num_producers}P_1C")),
            &num_producers,
            |b, &n| {
                b.iter(|| {
                    let ring = Arc::new(Ring::<u64>::with_capacity(32 * 1024));

                    let producers: Vec<_> = (0..n)
                        .map(|_| {
                            let ring = Arc::clone(&ring);
                            thread::spawn(move || {
                                let mut sent = 0u64;
                                while sent < MSGS_PER_PRODUCER {
                                    if ring.push(sent) {
                                        sent += 1;
                                    } else {
                                        std::hint::spin_loop();
                                    }
                                }
                            })
                        })
                        .collect();

                    let mut received = 0u64;
                    while received < total {
                        match ring.pop() {
                            Some(v) => {
                                black_box(v);
                                received += 1;
                            }
                            None => std::hint::spin_loop(),
                        }
                    }

                    for p in producers {
                        p.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_spsc, bench_mpsc);
criterion_main!(benches);
