use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use conwaymore_client::protocol::{decode_into, Cell, CellBuffer, Snapshot};
use conwaymore_client::reactive::{Computed, Effect, Signal};

fn signal_to_effect(c: &mut Criterion) {
    let signal = Signal::new(0u64);
    let _effect = {
        let signal = signal.clone();
        Effect::new(move || {
            black_box(signal.get());
        })
    };

    let mut next = 0u64;
    c.bench_function("signal set -> effect", |b| {
        b.iter(|| {
            next += 1;
            signal.set(next);
        })
    });
}

fn computed_chain(c: &mut Criterion) {
    let source = Signal::new(0u64);
    let mut chain = vec![{
        let source = source.clone();
        Computed::new(move || source.get() + 1)
    }];
    for _ in 0..15 {
        let prev = chain[chain.len() - 1].clone();
        chain.push(Computed::new(move || prev.get() + 1));
    }
    let _sink = {
        let last = chain[chain.len() - 1].clone();
        Effect::new(move || {
            black_box(last.get());
        })
    };

    let mut next = 0u64;
    c.bench_function("computed chain depth 16", |b| {
        b.iter(|| {
            next += 1;
            source.set(next);
        })
    });
}

fn wide_fan_out(c: &mut Criterion) {
    let signal = Signal::new(0u64);
    let effects: Vec<Effect> = (0..256)
        .map(|_| {
            let signal = signal.clone();
            Effect::new(move || {
                black_box(signal.get());
            })
        })
        .collect();

    let mut next = 0u64;
    c.bench_function("signal set -> 256 effects", |b| {
        b.iter(|| {
            next += 1;
            signal.set(next);
        })
    });
    drop(effects);
}

fn snapshot_decode(c: &mut Criterion) {
    let world_size = 512u16;
    let cells: Vec<Cell> = (0..50_000u32)
        .map(|i| Cell::new((i % 512) as u16, (i / 512) as u16, i))
        .collect();
    let frame = Snapshot {
        playing: true,
        speed: 16,
        cells,
    }
    .encode()
    .unwrap();

    c.bench_function("decode 50k-cell snapshot", |b| {
        b.iter_batched_ref(
            || CellBuffer::with_world_size(world_size),
            |buffer| decode_into(black_box(&frame), buffer).unwrap(),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, signal_to_effect, computed_chain, wide_fan_out, snapshot_decode);
criterion_main!(benches);
