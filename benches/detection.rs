//! Benchmarks for change detection and notification fan-out.

use agentwatch::changes::{
    ChangeBatch, ChangeDetector, Channel, EntityCategory, NotificationBus, SystemClock,
};
use agentwatch::store::{Row, SqliteExecutor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;

const EVENT_ROWS: usize = 5_000;

fn seeded_store(rt: &Runtime) -> Arc<SqliteExecutor> {
    rt.block_on(async {
        let db = SqliteExecutor::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE events (id INTEGER PRIMARY KEY, session_id TEXT, kind TEXT, payload TEXT);",
        )
        .await
        .unwrap();
        db.execute_batch(&format!(
            "WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < {EVENT_ROWS})
             INSERT INTO events (id, session_id, kind, payload)
             SELECT n, 's' || (n % 17), 'step', '{{\"tokens\":' || n || '}}' FROM seq;"
        ))
        .await
        .unwrap();
        Arc::new(db)
    })
}

fn bench_identifier_detection(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = seeded_store(&rt);
    let mut group = c.benchmark_group("identifier_detection");

    for batch_size in [10, 100, 1_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| {
                b.iter(|| {
                    let mut detector =
                        ChangeDetector::new(store.clone(), Arc::new(SystemClock), batch_size);
                    let batch = rt.block_on(detector.detect(EntityCategory::Events));
                    black_box(batch.len())
                })
            },
        );
    }

    group.finish();
}

fn bench_publish_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_fan_out");
    let batch = ChangeBatch {
        category: EntityCategory::Events,
        rows: (0..100)
            .map(|id| {
                let mut row = Row::new();
                row.insert("id".to_string(), id.into());
                row
            })
            .collect(),
        observed_at: chrono::Utc::now(),
    };

    for subscribers in [1, 10, 100] {
        let bus = NotificationBus::new();
        for i in 0..subscribers {
            let channel = if i % 2 == 0 {
                Channel::Category(EntityCategory::Events)
            } else {
                Channel::All
            };
            bus.subscribe(channel, |batch| {
                black_box(batch.len());
            });
        }
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| b.iter(|| black_box(bus.publish(&batch))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_identifier_detection, bench_publish_fan_out);
criterion_main!(benches);
