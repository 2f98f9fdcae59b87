use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rand::Rng;
use thir::{
    bytes::RawBlock,
    interp::GeoInterpolator,
    words::Strategy,
    DecodeConfig, Parity, Satellite, TapeDecoder,
};

const WORDS: usize = 3000;

fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen()).collect()
}

// Assemble a block's worth of words from random data.
fn bench_assemble(c: &mut Criterion) {
    let six_bit = RawBlock::tagged(random_bytes(WORDS * 6), Parity::Even);
    let packed = RawBlock::untagged(random_bytes(WORDS / 2 * 9));

    let mut group = c.benchmark_group("words");
    group.throughput(Throughput::Elements(WORDS as u64));
    group.bench_function("six_bit", |b| {
        b.iter(|| Strategy::SixBit.assemble(six_bit.all(), WORDS));
    });
    group.bench_function("packed", |b| {
        b.iter(|| Strategy::Packed.assemble(packed.all(), WORDS));
    });
    group.finish();
}

// Interpolate a full width swath from 13 anchors.
fn bench_interpolate(c: &mut Criterion) {
    let nadirs: Vec<Option<f64>> = (0..13).map(|i| Some(-60.0 + 10.0 * f64::from(i))).collect();
    let lats: Vec<Option<f64>> = (0..13).map(|i| Some(80.0 + 2.0 * f64::from(i))).collect();
    let lons: Vec<Option<f64>> = (0..13).map(|i| Some(350.0 + 1.5 * f64::from(i))).collect();
    let interp = GeoInterpolator::default();

    let mut group = c.benchmark_group("interp");
    group.throughput(Throughput::Elements(500));
    group.bench_function("swath", |b| {
        b.iter(|| interp.interpolate(&nadirs, &lats, &lons, 500));
    });
    group.finish();
}

fn packed(words: &[u64]) -> Vec<u8> {
    words
        .chunks(2)
        .flat_map(|pair| {
            let bits = (u128::from(pair[0]) << 36) | u128::from(pair.get(1).copied().unwrap_or(0));
            (0..9).rev().map(move |i| (bits >> (8 * i)) as u8)
        })
        .collect()
}

fn frame(tape: &mut Vec<u8>, data: &[u8]) {
    let len = data.len() as u32;
    tape.extend(len.to_le_bytes());
    tape.extend(data);
    tape.extend(len.to_le_bytes());
}

// Decode an orbit document followed by scan records of random data.
fn bench_decode(c: &mut Criterion) {
    let mut tape = Vec::new();
    frame(
        &mut tape,
        &packed(&[67, 0, 110, 0, 38, 37, 110, 1, 20, 0, 288 * 512, 4, 159, 7, 400, 2, 13]),
    );
    for _ in 0..100 {
        frame(&mut tape, &random_bytes(4800));
    }
    let decoder = TapeDecoder::new(Satellite::Nimbus5, 1973, DecodeConfig::default());

    let mut group = c.benchmark_group("decoder");
    group.throughput(Throughput::Bytes(tape.len() as u64));
    group.bench_function("decode", |b| {
        b.iter(|| decoder.decode(&tape[..]).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_assemble, bench_interpolate, bench_decode);
criterion_main!(benches);
