//! Throughput benchmarks for the store, the frame parser and command
//! dispatch.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use respkv::commands::CommandHandler;
use respkv::protocol::{FrameParser, RespValue};
use respkv::storage::{Expiry, StorageEngine};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set_string(key, Bytes::from("small_value"), Expiry::Never);
            i += 1;
        });
    });

    group.bench_function("set_with_px", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("ttl:{}", i));
            let expiry = Expiry::after(Instant::now(), Duration::from_secs(3600));
            engine.set_string(key, Bytes::from("value"), expiry);
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        engine.set_string(key, value, Expiry::Never);
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(engine.get_string(key.as_bytes()).ok());
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(engine.get_string(key.as_bytes()).ok());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark list pushes and range reads
fn bench_lists(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("lists");
    group.throughput(Throughput::Elements(1));

    group.bench_function("rpush_single_list", |b| {
        let key = Bytes::from("queue");
        b.iter(|| {
            black_box(engine.rpush(key.clone(), vec![Bytes::from("item")]).ok());
        });
    });

    let values: Vec<Bytes> = (0..1_000).map(|i| Bytes::from(format!("v{}", i))).collect();
    engine
        .rpush(Bytes::from("range"), values)
        .expect("fresh key holds no value");

    group.bench_function("lrange_100", |b| {
        b.iter(|| {
            black_box(engine.lrange(b"range", 100, 199).ok());
        });
    });

    group.bench_function("lrange_all", |b| {
        b.iter(|| {
            black_box(engine.lrange(b"range", 0, -1).ok());
        });
    });

    group.finish();
}

/// Benchmark decoding and executing command frames
fn bench_pipeline(c: &mut Criterion) {
    let parser = FrameParser::new();
    let handler = CommandHandler::new(Arc::new(StorageEngine::new()));

    let set = RespValue::command(["SET", "name", "Ariz"]).serialize();
    let get = RespValue::command(["GET", "name"]).serialize();

    let mut group = c.benchmark_group("pipeline");

    group.throughput(Throughput::Bytes(set.len() as u64));
    group.bench_function("parse_set", |b| {
        b.iter(|| black_box(parser.parse(black_box(&set)).ok()));
    });

    group.throughput(Throughput::Elements(1));
    group.bench_function("parse_and_execute_get", |b| {
        handler.execute(&[Bytes::from("SET"), Bytes::from("name"), Bytes::from("Ariz")]);
        b.iter(|| {
            if let Ok(Some((args, _))) = parser.parse(&get) {
                black_box(handler.execute(&args));
            }
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let engine = Arc::new(StorageEngine::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let engine = Arc::clone(&engine);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = Bytes::from(format!("key:{}:{}", t, i));
                            engine.set_string(key.clone(), Bytes::from("value"), Expiry::Never);
                            let _ = engine.get_string(&key);
                            let _ = engine.rpush(Bytes::from("shared"), vec![key]);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(engine.len());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_lists,
    bench_pipeline,
    bench_concurrent,
);

criterion_main!(benches);
