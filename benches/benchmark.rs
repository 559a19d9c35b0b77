use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;
use uuid::Uuid;
use webcapture::{parse_capture_query, CaptureRequest, Config, WireReply, WireRequest, WorkOrder};

// Fast settings for all benchmarks
fn configure_fast_group(group: &mut criterion::BenchmarkGroup<criterion::measurement::WallTime>) {
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_millis(500));
    group.sample_size(20);
}

fn benchmark_config(c: &mut Criterion) {
    let mut group = c.benchmark_group("config");
    configure_fast_group(&mut group);

    group.bench_function("creation", |b| {
        b.iter(|| {
            let config = Config::default();
            black_box(config);
        });
    });

    group.bench_function("chrome_args", |b| {
        let config = Config::default();
        b.iter(|| {
            let args = config.chrome_args();
            black_box(args);
        });
    });

    group.finish();
}

fn benchmark_capture_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("capture_request");
    configure_fast_group(&mut group);

    group.bench_function("creation", |b| {
        b.iter(|| {
            let request = CaptureRequest::new("https://example.com")
                .with_dimensions(800, 400)
                .with_transparent_background(false);
            black_box(request);
        });
    });

    group.finish();
}

fn benchmark_query_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_parsing");
    configure_fast_group(&mut group);

    let queries = vec![
        "url=https%3A%2F%2Fexample.com",
        "url=https%3A%2F%2Fexample.com&width=800&height=400&transparent=false",
        "url=https%3A%2F%2Fexample.com&hide=.ad&hide=%23banner&transparent=true",
    ];

    group.bench_function("parse", |b| {
        b.iter(|| {
            for query in &queries {
                let request = parse_capture_query(query);
                black_box(request);
            }
        });
    });

    group.finish();
}

fn benchmark_wire_envelopes(c: &mut Criterion) {
    let mut group = c.benchmark_group("wire_envelopes");
    configure_fast_group(&mut group);

    let request = WireRequest {
        id: Uuid::new_v4(),
        order: WorkOrder::CaptureWebsite(
            CaptureRequest::new("https://example.com").with_dimensions(800, 400),
        ),
    };
    let request_json = serde_json::to_string(&request).unwrap();
    let reply = WireReply::ok(Uuid::new_v4(), vec![0u8; 4096]);

    group.bench_function("serialize_request", |b| {
        b.iter(|| {
            let json = serde_json::to_string(&request).unwrap();
            black_box(json);
        });
    });

    group.bench_function("deserialize_request", |b| {
        b.iter(|| {
            let back: WireRequest = serde_json::from_str(&request_json).unwrap();
            black_box(back);
        });
    });

    group.bench_function("serialize_reply", |b| {
        b.iter(|| {
            let json = serde_json::to_string(&reply).unwrap();
            black_box(json);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_config,
    benchmark_capture_request,
    benchmark_query_parsing,
    benchmark_wire_envelopes
);
criterion_main!(benches);
