use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use molva::{Payload, PubSub};

fn bench_subscribe(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bus = {
        let _guard = rt.enter();
        PubSub::new()
    };
    c.bench_function("bus_subscribe", |b| {
        b.iter(|| {
            let id = bus.subscribe("chan", |_| Ok(())).unwrap();
            black_box(id)
        })
    });
}

fn bench_publish_no_subscribers(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bus = {
        let _guard = rt.enter();
        PubSub::new()
    };
    c.bench_function("bus_publish_0_subs", |b| {
        b.iter(|| bus.publish("chan", black_box(Payload::new())).unwrap())
    });
    rt.block_on(bus.drain(None));
}

fn bench_publish_drain_one_subscriber(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bus = {
        let _guard = rt.enter();
        PubSub::new()
    };
    bus.subscribe_with("chan", Some("*"), |_| Ok(())).unwrap();
    c.bench_function("bus_publish_drain_1_sub", |b| {
        b.iter(|| {
            bus.publish("chan", black_box(Payload::new())).unwrap();
            rt.block_on(bus.drain(None));
        })
    });
}

fn bench_publish_drain_ten_subscribers(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bus = {
        let _guard = rt.enter();
        PubSub::new()
    };
    for _ in 0..10 {
        bus.subscribe_with("chan", Some("*"), |_| Ok(())).unwrap();
    }
    c.bench_function("bus_publish_drain_10_subs", |b| {
        b.iter(|| {
            bus.publish("chan", black_box(Payload::new())).unwrap();
            rt.block_on(bus.drain(None));
        })
    });
}

criterion_group!(
    benches,
    bench_subscribe,
    bench_publish_no_subscribers,
    bench_publish_drain_one_subscriber,
    bench_publish_drain_ten_subscribers,
);
criterion_main!(benches);
