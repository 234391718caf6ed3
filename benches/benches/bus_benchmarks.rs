use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use scopebus::{json, RedefinitionPolicy, Registry, Scope, TopicCodec};

fn bench_encode_topic(c: &mut Criterion) {
    let codec = TopicCodec::new(0xdead_beef);
    let scope = Scope::instance("chat", 42);
    c.bench_function("encode_topic", |b| {
        b.iter(|| black_box(codec.encode(&scope, black_box("message"))))
    });
}

fn bench_trigger_0_listeners(c: &mut Criterion) {
    let registry = Registry::with_parts(TopicCodec::new(1), RedefinitionPolicy::Reject);
    let handle = registry.global("bench");
    c.bench_function("trigger_0_listeners", |b| {
        b.iter(|| {
            handle.trigger("tick", &[]).unwrap();
        })
    });
}

fn bench_trigger_10_listeners(c: &mut Criterion) {
    let registry = Registry::with_parts(TopicCodec::new(1), RedefinitionPolicy::Reject);
    let handle = registry.global("bench");
    for _ in 0..10 {
        handle.on("tick", |_, args| {
            black_box(args.len());
            Ok(())
        });
    }
    let args = [json!(1), json!("two")];
    c.bench_function("trigger_10_listeners", |b| {
        b.iter(|| {
            handle.trigger("tick", black_box(&args)).unwrap();
        })
    });
}

fn bench_bulk_trigger_100_instances(c: &mut Criterion) {
    let registry = Registry::with_parts(TopicCodec::new(1), RedefinitionPolicy::Reject);
    registry
        .define("node", |node, _| {
            node.on("ping", |_, _| Ok(()));
            Ok(())
        })
        .unwrap();
    for _ in 0..100 {
        registry.instantiate("node", &[]).unwrap();
    }
    let all = registry.find_all("node");
    c.bench_function("bulk_trigger_100_instances", |b| {
        b.iter(|| {
            all.trigger("ping", &[]).unwrap();
        })
    });
}

fn bench_instantiate_destroy(c: &mut Criterion) {
    let registry = Registry::with_parts(TopicCodec::new(1), RedefinitionPolicy::Reject);
    registry
        .define("tmp", |h, _| {
            h.on("a", |_, _| Ok(())).on("b", |_, _| Ok(()));
            Ok(())
        })
        .unwrap();
    c.bench_function("instantiate_destroy", |b| {
        b.iter(|| {
            registry.instantiate("tmp", &[]).unwrap().destroy();
        })
    });
}

criterion_group!(
    benches,
    bench_encode_topic,
    bench_trigger_0_listeners,
    bench_trigger_10_listeners,
    bench_bulk_trigger_100_instances,
    bench_instantiate_destroy,
);
criterion_main!(benches);
