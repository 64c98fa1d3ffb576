use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rewards_ledger::{Engine, Request};
use tokio::runtime::Runtime;
use tokio_stream::iter;

/// Generates request sequences for benchmarking.
///
/// Pattern per user (repeating):
/// 1. Draw
/// 2. Draw
/// 3. Exchange a prize (every 3rd request)
///
/// The prize costs less than two draws, so exchanges never fail on points.
pub struct RequestGenerator {
    last_user: u32,
    requests_per_user: u32,
    current_user: u32,
    current_step: u32,
}

impl RequestGenerator {
    pub fn new(num_users: u32, requests_per_user: u32) -> Self {
        Self {
            last_user: num_users,
            requests_per_user,
            current_user: 1,
            current_step: 0,
        }
    }

    /// Requests for a single user.
    pub fn for_user(user: u32, requests: u32) -> Self {
        Self {
            last_user: user,
            requests_per_user: requests,
            current_user: user,
            current_step: 0,
        }
    }
}

impl Iterator for RequestGenerator {
    type Item = Request;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_user > self.last_user {
            return None;
        }

        let user = format!("user-{}", self.current_user);
        let request = match self.current_step % 3 {
            2 => Request::ExchangePrize {
                user,
                prize: "mug".to_string(),
            },
            _ => Request::Draw { user },
        };

        self.current_step += 1;

        if self.current_step >= self.requests_per_user {
            self.current_step = 0;
            self.current_user += 1;
        }

        Some(request)
    }
}

async fn seeded_engine(codes: u32) -> Engine {
    let engine = Engine::in_memory();
    engine.add_prize("mug", 1_500).await.unwrap();
    engine
        .load_codes((0..codes).map(|i| format!("CODE-{i}")))
        .await;
    engine
}

fn bench_draws(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("draws");

    for count in [1_000u32, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                rt.block_on(async {
                    let engine = Engine::in_memory();
                    for i in 0..count {
                        let user = format!("user-{}", i % 100);
                        let _ = black_box(engine.draw(&user).await);
                    }
                    engine
                })
            });
        });
    }

    group.finish();
}

fn bench_mixed_requests(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("mixed");

    for (users, per_user) in [(100, 30), (1_000, 3)] {
        let label = format!("{users}u_{per_user}r");
        group.bench_with_input(
            BenchmarkId::from_parameter(&label),
            &(users, per_user),
            |b, &(users, per_user)| {
                b.iter(|| {
                    rt.block_on(async {
                        let engine = seeded_engine(users).await;
                        let stats = engine.run(iter(RequestGenerator::new(users, per_user))).await;
                        black_box(stats)
                    })
                });
            },
        );
    }

    group.finish();
}

fn bench_concurrent_users(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("concurrent");
    group.sample_size(20);

    // one task per user, all competing for the same code pool
    group.bench_function("100_users_parallel", |b| {
        b.iter(|| {
            rt.block_on(async {
                let engine = seeded_engine(100).await;
                let handles: Vec<_> = (1..=100)
                    .map(|user| {
                        let engine = engine.clone();
                        tokio::spawn(async move {
                            for request in RequestGenerator::for_user(user, 30) {
                                let _ = black_box(engine.apply(request).await);
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.await.unwrap();
                }
                engine
            })
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_draws,
    bench_mixed_requests,
    bench_concurrent_users
);
criterion_main!(benches);
